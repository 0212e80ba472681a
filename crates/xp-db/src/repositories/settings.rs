//! PostgreSQL implementation of XpSettingsRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use xp_core::entities::{GuildXpSettings, XpLevelUpMessage};
use xp_core::traits::{RepoResult, XpSettingsRepository};
use xp_core::value_objects::Snowflake;

use crate::models::{GuildXpSettingsModel, XpLevelUpMessageModel};

use super::error::map_db_error;

/// PostgreSQL implementation of XpSettingsRepository
#[derive(Clone)]
pub struct PgXpSettingsRepository {
    pool: PgPool,
}

impl PgXpSettingsRepository {
    /// Create a new PgXpSettingsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SETTINGS_COLUMNS: &str = "guild_id, xp_per_message, message_cooldown_secs, \
    voice_xp_per_minute, voice_timeout_minutes, multiplier, curve_type, \
    decay_enabled, decay_percent, decay_inactive_days, first_message_bonus, \
    exclusive_role_rewards, level_up_message, notification_channel_id, \
    created_at, updated_at";

#[async_trait]
impl XpSettingsRepository for PgXpSettingsRepository {
    #[instrument(skip(self))]
    async fn find(&self, guild_id: Snowflake) -> RepoResult<Option<GuildXpSettings>> {
        let result = sqlx::query_as::<_, GuildXpSettingsModel>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM guild_xp_settings WHERE guild_id = $1"
        ))
        .bind(guild_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(GuildXpSettings::from))
    }

    #[instrument(skip(self, settings), fields(guild_id = %settings.guild_id))]
    async fn upsert(&self, settings: &GuildXpSettings) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO guild_xp_settings (
                guild_id, xp_per_message, message_cooldown_secs,
                voice_xp_per_minute, voice_timeout_minutes, multiplier,
                curve_type, decay_enabled, decay_percent, decay_inactive_days,
                first_message_bonus, exclusive_role_rewards, level_up_message,
                notification_channel_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (guild_id) DO UPDATE SET
                xp_per_message = EXCLUDED.xp_per_message,
                message_cooldown_secs = EXCLUDED.message_cooldown_secs,
                voice_xp_per_minute = EXCLUDED.voice_xp_per_minute,
                voice_timeout_minutes = EXCLUDED.voice_timeout_minutes,
                multiplier = EXCLUDED.multiplier,
                curve_type = EXCLUDED.curve_type,
                decay_enabled = EXCLUDED.decay_enabled,
                decay_percent = EXCLUDED.decay_percent,
                decay_inactive_days = EXCLUDED.decay_inactive_days,
                first_message_bonus = EXCLUDED.first_message_bonus,
                exclusive_role_rewards = EXCLUDED.exclusive_role_rewards,
                level_up_message = EXCLUDED.level_up_message,
                notification_channel_id = EXCLUDED.notification_channel_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(settings.guild_id.into_inner())
        .bind(settings.xp_per_message)
        .bind(settings.message_cooldown_secs)
        .bind(settings.voice_xp_per_minute)
        .bind(settings.voice_timeout_minutes)
        .bind(settings.multiplier)
        .bind(settings.curve_type.to_string())
        .bind(settings.decay_enabled)
        .bind(settings.decay_percent)
        .bind(settings.decay_inactive_days)
        .bind(settings.first_message_bonus)
        .bind(settings.exclusive_role_rewards)
        .bind(settings.level_up_message.as_deref())
        .bind(settings.notification_channel_id.map(Snowflake::into_inner))
        .bind(settings.created_at)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn guilds_with_decay(&self) -> RepoResult<Vec<GuildXpSettings>> {
        let results = sqlx::query_as::<_, GuildXpSettingsModel>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM guild_xp_settings WHERE decay_enabled = TRUE"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(GuildXpSettings::from).collect())
    }

    #[instrument(skip(self))]
    async fn level_up_message(
        &self,
        guild_id: Snowflake,
        level: i64,
    ) -> RepoResult<Option<XpLevelUpMessage>> {
        let result = sqlx::query_as::<_, XpLevelUpMessageModel>(
            r#"
            SELECT guild_id, level, message
            FROM xp_level_up_messages
            WHERE guild_id = $1 AND level = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(level)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(XpLevelUpMessage::from))
    }

    #[instrument(skip(self, message), fields(guild_id = %message.guild_id, level = message.level))]
    async fn set_level_up_message(&self, message: &XpLevelUpMessage) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO xp_level_up_messages (guild_id, level, message)
            VALUES ($1, $2, $3)
            ON CONFLICT (guild_id, level) DO UPDATE SET message = EXCLUDED.message
            "#,
        )
        .bind(message.guild_id.into_inner())
        .bind(message.level)
        .bind(&message.message)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_level_up_message(&self, guild_id: Snowflake, level: i64) -> RepoResult<()> {
        sqlx::query("DELETE FROM xp_level_up_messages WHERE guild_id = $1 AND level = $2")
            .bind(guild_id.into_inner())
            .bind(level)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }
}
