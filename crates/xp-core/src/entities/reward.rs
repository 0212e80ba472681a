//! Level reward entities - (guild, level) -> role or currency

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Role granted when a user reaches `level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpRoleReward {
    pub guild_id: Snowflake,
    pub level: i64,
    pub role_id: Snowflake,
}

/// Currency credited when a user reaches `level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpCurrencyReward {
    pub guild_id: Snowflake,
    pub level: i64,
    pub amount: i64,
}

/// Sum of currency reward tiers crossed moving from `old_level` (exclusive)
/// up to `new_level` (inclusive). Used for grants on the way up and the
/// symmetric revocation on the way down.
pub fn currency_between_levels(
    rewards: &[XpCurrencyReward],
    old_level: i64,
    new_level: i64,
) -> i64 {
    let (lo, hi) = if old_level <= new_level {
        (old_level, new_level)
    } else {
        (new_level, old_level)
    };
    rewards
        .iter()
        .filter(|r| r.level > lo && r.level <= hi)
        .map(|r| r.amount)
        .sum()
}

/// The single highest reward role whose threshold the level qualifies for
pub fn highest_qualifying_role(rewards: &[XpRoleReward], level: i64) -> Option<XpRoleReward> {
    rewards
        .iter()
        .filter(|r| r.level <= level)
        .max_by_key(|r| r.level)
        .copied()
}
