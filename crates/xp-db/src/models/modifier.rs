//! XP modifier database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use xp_core::entities::{
    ExcludedItemKind, XpBoostEvent, XpChannelMultiplier, XpExcludedItem, XpRoleMultiplier,
};
use xp_core::value_objects::Snowflake;

/// Database model for the xp_channel_multipliers table
#[derive(Debug, Clone, FromRow)]
pub struct XpChannelMultiplierModel {
    pub guild_id: i64,
    pub channel_id: i64,
    pub multiplier: f64,
}

impl From<XpChannelMultiplierModel> for XpChannelMultiplier {
    fn from(model: XpChannelMultiplierModel) -> Self {
        Self {
            guild_id: Snowflake::new(model.guild_id),
            channel_id: Snowflake::new(model.channel_id),
            multiplier: model.multiplier,
        }
    }
}

/// Database model for the xp_role_multipliers table
#[derive(Debug, Clone, FromRow)]
pub struct XpRoleMultiplierModel {
    pub guild_id: i64,
    pub role_id: i64,
    pub multiplier: f64,
}

impl From<XpRoleMultiplierModel> for XpRoleMultiplier {
    fn from(model: XpRoleMultiplierModel) -> Self {
        Self {
            guild_id: Snowflake::new(model.guild_id),
            role_id: Snowflake::new(model.role_id),
            multiplier: model.multiplier,
        }
    }
}

/// Database model for the xp_boost_events table.
///
/// Channel and role restrictions are BIGINT[] columns; empty array means
/// unrestricted.
#[derive(Debug, Clone, FromRow)]
pub struct XpBoostEventModel {
    pub id: i64,
    pub guild_id: i64,
    pub multiplier: f64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub channel_ids: Vec<i64>,
    pub role_ids: Vec<i64>,
}

impl From<XpBoostEventModel> for XpBoostEvent {
    fn from(model: XpBoostEventModel) -> Self {
        Self {
            id: Snowflake::new(model.id),
            guild_id: Snowflake::new(model.guild_id),
            multiplier: model.multiplier,
            starts_at: model.starts_at,
            ends_at: model.ends_at,
            channel_ids: model.channel_ids.into_iter().map(Snowflake::new).collect(),
            role_ids: model.role_ids.into_iter().map(Snowflake::new).collect(),
        }
    }
}

/// Database model for the xp_excluded_items table
#[derive(Debug, Clone, FromRow)]
pub struct XpExcludedItemModel {
    pub guild_id: i64,
    pub kind: String,
    pub item_id: i64,
}

impl From<XpExcludedItemModel> for XpExcludedItem {
    fn from(model: XpExcludedItemModel) -> Self {
        Self {
            guild_id: Snowflake::new(model.guild_id),
            kind: model.kind.parse().unwrap_or(ExcludedItemKind::User),
            item_id: Snowflake::new(model.item_id),
        }
    }
}
