//! Level reward manager
//!
//! Consumes `LevelChange` events. Three concerns, each isolated so a
//! failure in one never blocks the others: level-up notifications, role
//! rewards (exclusive or additive policy), and currency rewards (credited
//! on the way up, debited symmetrically on the way down).

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use xp_core::entities::{currency_between_levels, highest_qualifying_role};
use xp_core::{GuildXpSettings, LevelChange, NotificationType, Snowflake, XpRoleReward};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Handles the side effects of a level transition
pub struct XpRewardManager<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> XpRewardManager<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Apply every reward concern for one level change
    #[instrument(skip(self, change), fields(
        guild_id = %change.guild_id,
        user_id = %change.user_id,
        old_level = change.old_level,
        new_level = change.new_level,
    ))]
    pub async fn handle(&self, change: &LevelChange) -> ServiceResult<()> {
        let settings = self.ctx.cache().settings(change.guild_id).await?;

        if change.is_level_up() {
            self.notify(change, &settings).await;
        }
        self.apply_role_rewards(change, &settings).await;
        self.apply_currency_rewards(change).await;

        Ok(())
    }

    // === Notifications ===

    async fn notify(&self, change: &LevelChange, settings: &GuildXpSettings) {
        if change.notification_type == NotificationType::Disabled {
            return;
        }

        let template = match self
            .ctx
            .settings_repo()
            .level_up_message(change.guild_id, change.new_level)
            .await
        {
            Ok(Some(override_msg)) => override_msg.message,
            Ok(None) => settings.level_up_template().to_string(),
            Err(e) => {
                warn!(error = %e, "level-up message lookup failed, using guild template");
                settings.level_up_template().to_string()
            }
        };

        let content = self.render_template(&template, change).await;

        let delivery = match change.notification_type {
            NotificationType::Dm => {
                self.ctx
                    .gateway()
                    .send_direct_message(change.user_id, &content)
                    .await
            }
            NotificationType::Channel => {
                // Fall back to the guild channel when the triggering gain
                // had no channel (manual or voice)
                match change.channel_id.or(settings.notification_channel_id) {
                    Some(channel) => {
                        self.ctx
                            .gateway()
                            .send_channel_message(channel, &content)
                            .await
                    }
                    None => return,
                }
            }
            NotificationType::Guild => match settings.notification_channel_id {
                Some(channel) => {
                    self.ctx
                        .gateway()
                        .send_channel_message(channel, &content)
                        .await
                }
                None => return,
            },
            NotificationType::Disabled => return,
        };

        if let Err(e) = delivery {
            warn!(error = %e, "level-up notification delivery failed");
        }
    }

    async fn render_template(&self, template: &str, change: &LevelChange) -> String {
        let mut content = template.replace("{user}", &format!("<@{}>", change.user_id));
        content = content.replace("{level}", &change.new_level.to_string());

        if content.contains("{username}") {
            let username = self
                .ctx
                .gateway()
                .member_display_name(change.guild_id, change.user_id)
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| change.user_id.to_string());
            content = content.replace("{username}", &username);
        }
        if content.contains("{guild}") {
            let guild_name = self
                .ctx
                .gateway()
                .guild_name(change.guild_id)
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| "this server".to_string());
            content = content.replace("{guild}", &guild_name);
        }
        content
    }

    // === Role rewards ===

    async fn apply_role_rewards(&self, change: &LevelChange, settings: &GuildXpSettings) {
        let rewards = match self.ctx.reward_repo().role_rewards(change.guild_id).await {
            Ok(rewards) => rewards,
            Err(e) => {
                warn!(error = %e, "role reward lookup failed");
                return;
            }
        };
        if rewards.is_empty() {
            return;
        }

        let held = match self
            .ctx
            .gateway()
            .member_roles(change.guild_id, change.user_id)
            .await
        {
            Ok(held) => held,
            Err(e) => {
                warn!(error = %e, "member role lookup failed, role rewards skipped");
                return;
            }
        };

        let desired = desired_reward_roles(
            &rewards,
            change.new_level,
            settings.exclusive_role_rewards,
        );
        let reward_ids: HashSet<Snowflake> = rewards.iter().map(|r| r.role_id).collect();
        let held_set: HashSet<Snowflake> = held.into_iter().collect();

        for role_id in &desired {
            if held_set.contains(role_id) {
                continue;
            }
            if let Err(e) = self
                .ctx
                .gateway()
                .add_role(change.guild_id, change.user_id, *role_id)
                .await
            {
                warn!(role_id = %role_id, error = %e, "reward role grant failed");
            } else {
                debug!(role_id = %role_id, "reward role granted");
            }
        }

        // Only roles this guild hands out as rewards are ever removed
        for role_id in held_set {
            if !reward_ids.contains(&role_id) || desired.contains(&role_id) {
                continue;
            }
            if let Err(e) = self
                .ctx
                .gateway()
                .remove_role(change.guild_id, change.user_id, role_id)
                .await
            {
                warn!(role_id = %role_id, error = %e, "reward role removal failed");
            } else {
                debug!(role_id = %role_id, "reward role removed");
            }
        }
    }

    // === Currency rewards ===

    async fn apply_currency_rewards(&self, change: &LevelChange) {
        let rewards = match self
            .ctx
            .reward_repo()
            .currency_rewards(change.guild_id)
            .await
        {
            Ok(rewards) => rewards,
            Err(e) => {
                warn!(error = %e, "currency reward lookup failed");
                return;
            }
        };

        let amount = currency_between_levels(&rewards, change.old_level, change.new_level);
        if amount == 0 {
            return;
        }

        let result = if change.is_level_up() {
            self.ctx
                .ledger()
                .credit(change.guild_id, change.user_id, amount, "level reward")
                .await
        } else {
            self.ctx
                .ledger()
                .debit(
                    change.guild_id,
                    change.user_id,
                    amount,
                    "level reward reversal",
                )
                .await
        };

        if let Err(e) = result {
            warn!(amount, error = %e, "currency reward ledger operation failed");
        }
    }
}

/// The reward-role set a user at `level` should hold under the guild
/// policy: the single highest qualifying role when exclusive, every
/// qualifying role otherwise.
pub(crate) fn desired_reward_roles(
    rewards: &[XpRoleReward],
    level: i64,
    exclusive: bool,
) -> Vec<Snowflake> {
    if exclusive {
        highest_qualifying_role(rewards, level)
            .map(|r| vec![r.role_id])
            .unwrap_or_default()
    } else {
        rewards
            .iter()
            .filter(|r| r.level <= level)
            .map(|r| r.role_id)
            .collect()
    }
}
