//! Public XP API
//!
//! The facade the bot's command handlers call. Validates caller input,
//! reads through the cache manager, and routes writes to storage with
//! the matching cache refresh or invalidation.

use tracing::{info, instrument, warn};

use xp_core::entities::{
    XpBoostEvent, XpChannelMultiplier, XpCurrencyReward, XpExcludedItem, XpLevelUpMessage,
    XpRoleMultiplier, XpRoleReward,
};
use xp_core::traits::ProfileCardData;
use xp_core::{
    level_progress, xp_to_next_level, CurveType, ExcludedItemKind, GuildUserXp, GuildXpSettings,
    LevelChange, NotificationType, Snowflake, XpCompetition, XpCompetitionEntry, XpGainItem,
    XpGainSource,
};

use validator::Validate;

use crate::dto::{
    CreateBoostRequest, CreateCompetitionRequest, LeaderboardEntry, LeaderboardPage,
    LeaderboardQuery, UpdateXpSettingsRequest, UserXpStats,
};

use super::competition::XpCompetitionManager;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::reward::XpRewardManager;

/// Public XP service facade
pub struct XpService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> XpService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    // === Settings ===

    /// Guild settings, created with defaults on first access
    pub async fn settings(&self, guild_id: Snowflake) -> ServiceResult<GuildXpSettings> {
        self.ctx.cache().settings(guild_id).await
    }

    /// Apply a partial settings update
    #[instrument(skip(self, request))]
    pub async fn update_settings(
        &self,
        guild_id: Snowflake,
        request: &UpdateXpSettingsRequest,
    ) -> ServiceResult<GuildXpSettings> {
        request.validate()?;

        let mut settings = self.ctx.cache().settings(guild_id).await?;
        let old_curve = settings.curve_type;

        if let Some(v) = request.xp_per_message {
            settings.xp_per_message = v;
        }
        if let Some(v) = request.message_cooldown_secs {
            settings.message_cooldown_secs = v;
        }
        if let Some(v) = request.voice_xp_per_minute {
            settings.voice_xp_per_minute = v;
        }
        if let Some(v) = request.voice_timeout_minutes {
            settings.voice_timeout_minutes = v;
        }
        if let Some(v) = request.multiplier {
            settings.multiplier = v;
        }
        if let Some(v) = request.curve_type {
            settings.curve_type = v;
        }
        if let Some(v) = request.decay_enabled {
            settings.decay_enabled = v;
        }
        if let Some(v) = request.decay_percent {
            settings.decay_percent = v;
        }
        if let Some(v) = request.decay_inactive_days {
            settings.decay_inactive_days = v;
        }
        if let Some(v) = request.first_message_bonus {
            settings.first_message_bonus = v;
        }
        if let Some(v) = request.exclusive_role_rewards {
            settings.exclusive_role_rewards = v;
        }
        if let Some(ref v) = request.level_up_message {
            settings.level_up_message = if v.is_empty() { None } else { Some(v.clone()) };
        }
        if let Some(v) = request.notification_channel_id {
            settings.notification_channel_id = v;
        }

        settings.clamp();
        settings.touch();
        self.ctx.cache().update_settings(&settings).await?;

        // Levels are derived, so a curve change only needs caches dropped
        if settings.curve_type != old_curve {
            self.ctx.cache().invalidate_leaderboard(guild_id).await;
            self.ctx.cache().invalidate_multipliers(guild_id).await;
            info!(guild_id = %guild_id, curve = %settings.curve_type, "level curve changed");
        }

        Ok(settings)
    }

    /// Switch the level curve directly
    pub async fn set_curve(
        &self,
        guild_id: Snowflake,
        curve: CurveType,
    ) -> ServiceResult<GuildXpSettings> {
        let request = UpdateXpSettingsRequest {
            curve_type: Some(curve),
            ..UpdateXpSettingsRequest::default()
        };
        self.update_settings(guild_id, &request).await
    }

    // === User stats and leaderboard ===

    /// A user's resolved stats (level, rank, progress)
    #[instrument(skip(self))]
    pub async fn user_stats(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<UserXpStats> {
        let settings = self.ctx.cache().settings(guild_id).await?;
        let record = self.ctx.cache().user_xp(guild_id, user_id).await?;

        let (total_xp, notification_type, rank) = match record {
            Some(ref record) => (
                record.total_xp,
                record.notification_type,
                self.ctx.user_xp_repo().rank_of(guild_id, user_id).await?,
            ),
            None => (0, NotificationType::default(), None),
        };

        let curve = settings.curve_type;
        let level = xp_core::level_for_xp(total_xp, curve);
        let (xp_into_level, level_span) = level_progress(total_xp, curve);

        Ok(UserXpStats {
            guild_id,
            user_id,
            total_xp,
            level,
            rank,
            xp_into_level,
            level_span,
            xp_to_next_level: xp_to_next_level(total_xp, curve),
            notification_type,
        })
    }

    /// One leaderboard page ordered by total XP descending
    #[instrument(skip(self, query))]
    pub async fn leaderboard(
        &self,
        guild_id: Snowflake,
        query: &LeaderboardQuery,
    ) -> ServiceResult<LeaderboardPage> {
        query.validate()?;

        let settings = self.ctx.cache().settings(guild_id).await?;
        let total = self.ctx.user_xp_repo().count(guild_id).await?;
        let records = self
            .ctx
            .user_xp_repo()
            .top_by_xp(guild_id, query.limit, query.offset)
            .await?;

        let entries = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| LeaderboardEntry {
                rank: query.offset + index as i64 + 1,
                user_id: record.user_id,
                total_xp: record.total_xp,
                level: record.level(settings.curve_type),
            })
            .collect();

        Ok(LeaderboardPage {
            guild_id,
            total,
            offset: query.offset,
            entries,
        })
    }

    // === Manual XP adjustments ===

    /// Enqueue a manual XP grant; lands with the next flush
    pub async fn add_xp(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        amount: i64,
    ) -> ServiceResult<()> {
        if amount <= 0 {
            return Err(ServiceError::validation("XP amount must be positive"));
        }
        self.ctx.queue().enqueue(XpGainItem::new(
            guild_id,
            user_id,
            None,
            amount,
            XpGainSource::Manual,
        ));
        Ok(())
    }

    /// Set a user's total XP directly, bypassing the queue. Level
    /// transitions fire reward handling immediately.
    #[instrument(skip(self))]
    pub async fn set_xp(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        total: i64,
    ) -> ServiceResult<GuildUserXp> {
        if total < 0 {
            return Err(ServiceError::validation("XP total cannot be negative"));
        }

        let settings = self.ctx.cache().settings(guild_id).await?;
        let mut record = self
            .ctx
            .user_xp_repo()
            .find(guild_id, user_id)
            .await?
            .unwrap_or_else(|| GuildUserXp::new(guild_id, user_id));

        let old_level = record.level(settings.curve_type);
        record.set_total(total);
        let new_level = record.level(settings.curve_type);
        if new_level > old_level {
            record.mark_level_up();
        }

        self.ctx.user_xp_repo().upsert(&record).await?;
        self.ctx.cache().refresh_user_xp(&record).await;

        if new_level != old_level {
            let change = LevelChange {
                guild_id,
                user_id,
                old_level,
                new_level,
                channel_id: None,
                notification_type: record.notification_type,
            };
            if let Err(e) = XpRewardManager::new(self.ctx).handle(&change).await {
                warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "level change handling failed");
            }
        }

        Ok(record)
    }

    /// Reset a user to zero XP and clear their cooldown
    pub async fn reset_xp(&self, guild_id: Snowflake, user_id: Snowflake) -> ServiceResult<GuildUserXp> {
        let record = self.set_xp(guild_id, user_id, 0).await?;
        self.ctx.cache().clear_cooldown(guild_id, user_id).await;
        Ok(record)
    }

    /// Set where a user's level-up notifications go
    pub async fn set_notification_preference(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        preference: NotificationType,
    ) -> ServiceResult<GuildUserXp> {
        let mut record = self
            .ctx
            .user_xp_repo()
            .find(guild_id, user_id)
            .await?
            .unwrap_or_else(|| GuildUserXp::new(guild_id, user_id));
        record.notification_type = preference;
        self.ctx.user_xp_repo().upsert(&record).await?;
        self.ctx.cache().refresh_user_xp(&record).await;
        Ok(record)
    }

    // === Reward configuration ===

    pub async fn role_rewards(&self, guild_id: Snowflake) -> ServiceResult<Vec<XpRoleReward>> {
        Ok(self.ctx.reward_repo().role_rewards(guild_id).await?)
    }

    pub async fn set_role_reward(
        &self,
        guild_id: Snowflake,
        level: i64,
        role_id: Snowflake,
    ) -> ServiceResult<()> {
        if level < 1 {
            return Err(ServiceError::validation("reward level must be at least 1"));
        }
        let reward = XpRoleReward {
            guild_id,
            level,
            role_id,
        };
        Ok(self.ctx.reward_repo().upsert_role_reward(&reward).await?)
    }

    pub async fn delete_role_reward(&self, guild_id: Snowflake, level: i64) -> ServiceResult<()> {
        Ok(self.ctx.reward_repo().delete_role_reward(guild_id, level).await?)
    }

    pub async fn currency_rewards(
        &self,
        guild_id: Snowflake,
    ) -> ServiceResult<Vec<XpCurrencyReward>> {
        Ok(self.ctx.reward_repo().currency_rewards(guild_id).await?)
    }

    pub async fn set_currency_reward(
        &self,
        guild_id: Snowflake,
        level: i64,
        amount: i64,
    ) -> ServiceResult<()> {
        if level < 1 {
            return Err(ServiceError::validation("reward level must be at least 1"));
        }
        if amount <= 0 {
            return Err(ServiceError::validation("reward amount must be positive"));
        }
        let reward = XpCurrencyReward {
            guild_id,
            level,
            amount,
        };
        Ok(self.ctx.reward_repo().upsert_currency_reward(&reward).await?)
    }

    pub async fn delete_currency_reward(
        &self,
        guild_id: Snowflake,
        level: i64,
    ) -> ServiceResult<()> {
        Ok(self
            .ctx
            .reward_repo()
            .delete_currency_reward(guild_id, level)
            .await?)
    }

    // === Multipliers ===

    pub async fn set_channel_multiplier(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
        multiplier: f64,
    ) -> ServiceResult<()> {
        validate_multiplier(multiplier)?;
        let entry = XpChannelMultiplier {
            guild_id,
            channel_id,
            multiplier,
        };
        self.ctx.modifier_repo().set_channel_multiplier(&entry).await?;
        self.ctx.cache().invalidate_multipliers(guild_id).await;
        Ok(())
    }

    pub async fn remove_channel_multiplier(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> ServiceResult<()> {
        self.ctx
            .modifier_repo()
            .delete_channel_multiplier(guild_id, channel_id)
            .await?;
        self.ctx.cache().invalidate_multipliers(guild_id).await;
        Ok(())
    }

    pub async fn set_role_multiplier(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
        multiplier: f64,
    ) -> ServiceResult<()> {
        validate_multiplier(multiplier)?;
        let entry = XpRoleMultiplier {
            guild_id,
            role_id,
            multiplier,
        };
        self.ctx.modifier_repo().set_role_multiplier(&entry).await?;
        self.ctx.cache().invalidate_multipliers(guild_id).await;
        Ok(())
    }

    pub async fn remove_role_multiplier(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
    ) -> ServiceResult<()> {
        self.ctx
            .modifier_repo()
            .delete_role_multiplier(guild_id, role_id)
            .await?;
        self.ctx.cache().invalidate_multipliers(guild_id).await;
        Ok(())
    }

    // === Boost events ===

    pub async fn boosts(&self, guild_id: Snowflake) -> ServiceResult<Vec<XpBoostEvent>> {
        Ok(self.ctx.modifier_repo().boosts(guild_id).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn create_boost(
        &self,
        guild_id: Snowflake,
        request: &CreateBoostRequest,
    ) -> ServiceResult<XpBoostEvent> {
        request.validate()?;
        if request.ends_at <= request.starts_at {
            return Err(ServiceError::validation("boost must end after it starts"));
        }

        let boost = XpBoostEvent {
            id: self.ctx.snowflake_generator().generate(),
            guild_id,
            multiplier: request.multiplier,
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            channel_ids: request.channel_ids.clone(),
            role_ids: request.role_ids.clone(),
        };
        self.ctx.modifier_repo().create_boost(&boost).await?;
        self.ctx.cache().invalidate_multipliers(guild_id).await;
        info!(guild_id = %guild_id, boost_id = %boost.id, "boost event created");
        Ok(boost)
    }

    pub async fn cancel_boost(&self, guild_id: Snowflake, boost_id: Snowflake) -> ServiceResult<()> {
        self.ctx.modifier_repo().delete_boost(boost_id).await?;
        self.ctx.cache().invalidate_multipliers(guild_id).await;
        Ok(())
    }

    // === Exclusions ===

    pub async fn exclusions(&self, guild_id: Snowflake) -> ServiceResult<Vec<XpExcludedItem>> {
        Ok(self.ctx.modifier_repo().exclusions(guild_id).await?)
    }

    pub async fn add_exclusion(
        &self,
        guild_id: Snowflake,
        kind: ExcludedItemKind,
        item_id: Snowflake,
    ) -> ServiceResult<()> {
        let item = XpExcludedItem {
            guild_id,
            kind,
            item_id,
        };
        self.ctx.modifier_repo().add_exclusion(&item).await?;
        self.ctx.cache().invalidate_exclusions(guild_id).await;
        Ok(())
    }

    pub async fn remove_exclusion(
        &self,
        guild_id: Snowflake,
        kind: ExcludedItemKind,
        item_id: Snowflake,
    ) -> ServiceResult<()> {
        let item = XpExcludedItem {
            guild_id,
            kind,
            item_id,
        };
        self.ctx.modifier_repo().remove_exclusion(&item).await?;
        self.ctx.cache().invalidate_exclusions(guild_id).await;
        Ok(())
    }

    // === Level-up message overrides ===

    pub async fn level_up_message(
        &self,
        guild_id: Snowflake,
        level: i64,
    ) -> ServiceResult<Option<XpLevelUpMessage>> {
        Ok(self.ctx.settings_repo().level_up_message(guild_id, level).await?)
    }

    pub async fn set_level_up_message(
        &self,
        guild_id: Snowflake,
        level: i64,
        message: String,
    ) -> ServiceResult<()> {
        if level < 1 {
            return Err(ServiceError::validation("level must be at least 1"));
        }
        if message.is_empty() || message.len() > 500 {
            return Err(ServiceError::validation(
                "message must be 1-500 characters",
            ));
        }
        let record = XpLevelUpMessage {
            guild_id,
            level,
            message,
        };
        Ok(self.ctx.settings_repo().set_level_up_message(&record).await?)
    }

    pub async fn delete_level_up_message(
        &self,
        guild_id: Snowflake,
        level: i64,
    ) -> ServiceResult<()> {
        Ok(self
            .ctx
            .settings_repo()
            .delete_level_up_message(guild_id, level)
            .await?)
    }

    // === Competitions ===

    pub async fn create_competition(
        &self,
        guild_id: Snowflake,
        request: &CreateCompetitionRequest,
    ) -> ServiceResult<XpCompetition> {
        request.validate()?;
        XpCompetitionManager::new(self.ctx)
            .create(
                guild_id,
                request.kind,
                request.target_level,
                request.starts_at,
                request.ends_at,
                request.announcement_channel_id,
            )
            .await
    }

    pub async fn start_competition(&self, competition_id: Snowflake) -> ServiceResult<XpCompetition> {
        XpCompetitionManager::new(self.ctx).start(competition_id).await
    }

    pub async fn finalize_competition(
        &self,
        competition_id: Snowflake,
    ) -> ServiceResult<Vec<XpCompetitionEntry>> {
        XpCompetitionManager::new(self.ctx)
            .finalize(competition_id)
            .await
    }

    // === Profile card ===

    /// Resolve a user's stats and render a profile card
    #[instrument(skip(self))]
    pub async fn profile_card(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Vec<u8>> {
        let stats = self.user_stats(guild_id, user_id).await?;
        let username = self
            .ctx
            .gateway()
            .member_display_name(guild_id, user_id)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| user_id.to_string());

        let data = ProfileCardData {
            guild_id,
            user_id,
            username,
            level: stats.level,
            total_xp: stats.total_xp,
            rank: stats.rank.unwrap_or(0),
            xp_into_level: stats.xp_into_level,
            level_span: stats.level_span,
        };

        self.ctx
            .renderer()
            .render_profile_card(&data)
            .await
            .map_err(|e| ServiceError::internal(format!("card rendering failed: {e}")))
    }
}

fn validate_multiplier(multiplier: f64) -> ServiceResult<()> {
    if !(0.0..=10.0).contains(&multiplier) {
        return Err(ServiceError::validation("multiplier must be 0-10"));
    }
    Ok(())
}
