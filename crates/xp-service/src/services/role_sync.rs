//! Reward-role synchronization
//!
//! Reconciles the reward roles members actually hold with what their
//! level entitles them to, either for one user (with a per-user cooldown)
//! or guild-wide. Only roles configured as rewards are ever added or
//! removed; a member's unrelated roles are untouched.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use xp_core::{GatewayResult, Snowflake, XpRoleReward};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::reward::desired_reward_roles;

/// Progress callback invoked periodically during a guild-wide resync
pub type SyncProgress<'p> = &'p (dyn Fn(usize, usize) + Send + Sync);

/// How often the guild-wide resync reports progress (users)
const PROGRESS_EVERY: usize = 10;

/// Result of a guild-wide resync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuildSyncReport {
    pub total: usize,
    pub synced: usize,
    pub failed: usize,
    pub roles_added: usize,
    pub roles_removed: usize,
}

/// Reward-role reconciliation service
pub struct XpRoleSyncService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> XpRoleSyncService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Resync one member's reward roles. Rate-limited per user.
    #[instrument(skip(self))]
    pub async fn resync_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<(usize, usize)> {
        let cooldown = Duration::from_secs(self.ctx.config().role_sync_user_cooldown_secs);
        let key = (guild_id, user_id);
        if let Some(last) = self.ctx.role_sync_cooldowns().get(&key) {
            if last.elapsed() < cooldown {
                return Err(ServiceError::conflict("role sync on cooldown for this user"));
            }
        }
        self.ctx.role_sync_cooldowns().insert(key, Instant::now());

        let settings = self.ctx.cache().settings(guild_id).await?;
        let rewards = self.ctx.reward_repo().role_rewards(guild_id).await?;
        let level = match self.ctx.user_xp_repo().find(guild_id, user_id).await? {
            Some(record) => record.level(settings.curve_type),
            None => 0,
        };

        sync_member_roles(
            self.ctx,
            guild_id,
            user_id,
            level,
            &rewards,
            settings.exclusive_role_rewards,
        )
        .await
        .map_err(|e| ServiceError::internal(format!("role sync failed: {e}")))
    }

    /// Resync every member with XP in the guild. Rejects a second
    /// concurrent invocation.
    #[instrument(skip(self, progress))]
    pub async fn resync_guild(
        &self,
        guild_id: Snowflake,
        progress: Option<SyncProgress<'_>>,
    ) -> ServiceResult<GuildSyncReport> {
        if self
            .ctx
            .role_sync_active()
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ServiceError::SyncInProgress);
        }

        let result = self.resync_guild_inner(guild_id, progress).await;
        self.ctx.role_sync_active().store(false, Ordering::Release);
        result
    }

    async fn resync_guild_inner(
        &self,
        guild_id: Snowflake,
        progress: Option<SyncProgress<'_>>,
    ) -> ServiceResult<GuildSyncReport> {
        let settings = self.ctx.cache().settings(guild_id).await?;
        let rewards = self.ctx.reward_repo().role_rewards(guild_id).await?;
        let records = self.ctx.user_xp_repo().find_with_xp(guild_id).await?;

        let mut report = GuildSyncReport {
            total: records.len(),
            ..GuildSyncReport::default()
        };

        for (index, record) in records.iter().enumerate() {
            let level = record.level(settings.curve_type);
            match sync_member_roles(
                self.ctx,
                guild_id,
                record.user_id,
                level,
                &rewards,
                settings.exclusive_role_rewards,
            )
            .await
            {
                Ok((added, removed)) => {
                    report.synced += 1;
                    report.roles_added += added;
                    report.roles_removed += removed;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(guild_id = %guild_id, user_id = %record.user_id, error = %e, "member role sync failed");
                }
            }

            if let Some(progress) = progress {
                if (index + 1) % PROGRESS_EVERY == 0 || index + 1 == records.len() {
                    progress(index + 1, records.len());
                }
            }
        }

        info!(
            guild_id = %guild_id,
            total = report.total,
            synced = report.synced,
            failed = report.failed,
            roles_added = report.roles_added,
            roles_removed = report.roles_removed,
            "guild role sync complete"
        );
        Ok(report)
    }
}

/// Diff one member's held reward roles against the entitled set and apply
/// the minimal add/remove operations. Returns (added, removed).
async fn sync_member_roles(
    ctx: &ServiceContext,
    guild_id: Snowflake,
    user_id: Snowflake,
    level: i64,
    rewards: &[XpRoleReward],
    exclusive: bool,
) -> GatewayResult<(usize, usize)> {
    if !ctx.gateway().member_exists(guild_id, user_id).await? {
        return Ok((0, 0));
    }

    let desired = desired_reward_roles(rewards, level, exclusive);
    let held = ctx.gateway().member_roles(guild_id, user_id).await?;

    let mut added = 0;
    for role_id in &desired {
        if !held.contains(role_id) {
            ctx.gateway().add_role(guild_id, user_id, *role_id).await?;
            added += 1;
        }
    }

    let mut removed = 0;
    for role_id in held {
        let is_reward = rewards.iter().any(|r| r.role_id == role_id);
        if is_reward && !desired.contains(&role_id) {
            ctx.gateway().remove_role(guild_id, user_id, role_id).await?;
            removed += 1;
        }
    }

    Ok((added, removed))
}
