//! Per-user XP database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use xp_core::entities::{GuildUserXp, NotificationType};
use xp_core::value_objects::Snowflake;

/// Database model for the guild_user_xp table
#[derive(Debug, Clone, FromRow)]
pub struct GuildUserXpModel {
    pub guild_id: i64,
    pub user_id: i64,
    pub total_xp: i64,
    pub bonus_xp: i64,
    pub last_activity: DateTime<Utc>,
    pub last_level_up: DateTime<Utc>,
    pub notification_type: String,
}

impl From<GuildUserXpModel> for GuildUserXp {
    fn from(model: GuildUserXpModel) -> Self {
        Self {
            guild_id: Snowflake::new(model.guild_id),
            user_id: Snowflake::new(model.user_id),
            total_xp: model.total_xp,
            bonus_xp: model.bonus_xp,
            last_activity: model.last_activity,
            last_level_up: model.last_level_up,
            notification_type: model
                .notification_type
                .parse()
                .unwrap_or(NotificationType::Guild),
        }
    }
}
