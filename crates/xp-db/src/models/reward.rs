//! Level reward database models

use sqlx::FromRow;

use xp_core::entities::{XpCurrencyReward, XpRoleReward};
use xp_core::value_objects::Snowflake;

/// Database model for the xp_role_rewards table
#[derive(Debug, Clone, FromRow)]
pub struct XpRoleRewardModel {
    pub guild_id: i64,
    pub level: i64,
    pub role_id: i64,
}

impl From<XpRoleRewardModel> for XpRoleReward {
    fn from(model: XpRoleRewardModel) -> Self {
        Self {
            guild_id: Snowflake::new(model.guild_id),
            level: model.level,
            role_id: Snowflake::new(model.role_id),
        }
    }
}

/// Database model for the xp_currency_rewards table
#[derive(Debug, Clone, FromRow)]
pub struct XpCurrencyRewardModel {
    pub guild_id: i64,
    pub level: i64,
    pub amount: i64,
}

impl From<XpCurrencyRewardModel> for XpCurrencyReward {
    fn from(model: XpCurrencyRewardModel) -> Self {
        Self {
            guild_id: Snowflake::new(model.guild_id),
            level: model.level,
            amount: model.amount,
        }
    }
}
