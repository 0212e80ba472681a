//! Response DTOs for the public XP API

use serde::Serialize;

use xp_core::{NotificationType, Snowflake};

/// One user's resolved XP stats
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserXpStats {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub total_xp: i64,
    pub level: i64,
    /// 1-based leaderboard rank; None when the user has no record
    pub rank: Option<i64>,
    /// XP accumulated within the current level
    pub xp_into_level: i64,
    /// Total XP span of the current level
    pub level_span: i64,
    pub xp_to_next_level: i64,
    pub notification_type: NotificationType,
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Snowflake,
    pub total_xp: i64,
    pub level: i64,
}

/// A page of the guild leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardPage {
    pub guild_id: Snowflake,
    /// Total tracked users in the guild
    pub total: i64,
    pub offset: i64,
    pub entries: Vec<LeaderboardEntry>,
}
