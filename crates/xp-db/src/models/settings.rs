//! Guild settings database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use xp_core::entities::{GuildXpSettings, XpLevelUpMessage};
use xp_core::leveling::CurveType;
use xp_core::value_objects::Snowflake;

/// Database model for the guild_xp_settings table
#[derive(Debug, Clone, FromRow)]
pub struct GuildXpSettingsModel {
    pub guild_id: i64,
    pub xp_per_message: i64,
    pub message_cooldown_secs: i64,
    pub voice_xp_per_minute: i64,
    pub voice_timeout_minutes: i64,
    pub multiplier: f64,
    pub curve_type: String,
    pub decay_enabled: bool,
    pub decay_percent: f64,
    pub decay_inactive_days: i64,
    pub first_message_bonus: i64,
    pub exclusive_role_rewards: bool,
    pub level_up_message: Option<String>,
    pub notification_channel_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GuildXpSettingsModel> for GuildXpSettings {
    fn from(model: GuildXpSettingsModel) -> Self {
        Self {
            guild_id: Snowflake::new(model.guild_id),
            xp_per_message: model.xp_per_message,
            message_cooldown_secs: model.message_cooldown_secs,
            voice_xp_per_minute: model.voice_xp_per_minute,
            voice_timeout_minutes: model.voice_timeout_minutes,
            multiplier: model.multiplier,
            curve_type: model.curve_type.parse().unwrap_or(CurveType::Standard),
            decay_enabled: model.decay_enabled,
            decay_percent: model.decay_percent,
            decay_inactive_days: model.decay_inactive_days,
            first_message_bonus: model.first_message_bonus,
            exclusive_role_rewards: model.exclusive_role_rewards,
            level_up_message: model.level_up_message,
            notification_channel_id: model.notification_channel_id.map(Snowflake::new),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Database model for the xp_level_up_messages table
#[derive(Debug, Clone, FromRow)]
pub struct XpLevelUpMessageModel {
    pub guild_id: i64,
    pub level: i64,
    pub message: String,
}

impl From<XpLevelUpMessageModel> for XpLevelUpMessage {
    fn from(model: XpLevelUpMessageModel) -> Self {
        Self {
            guild_id: Snowflake::new(model.guild_id),
            level: model.level,
            message: model.message,
        }
    }
}
