//! Per-user XP record entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::leveling::{level_for_xp, CurveType};
use crate::value_objects::Snowflake;

/// Where a user's level-up notifications go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Follow the guild's notification channel setting
    #[default]
    Guild,
    /// Announce in the channel the level-up happened in
    Channel,
    /// Direct message
    Dm,
    /// No notifications
    Disabled,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guild => write!(f, "guild"),
            Self::Channel => write!(f, "channel"),
            Self::Dm => write!(f, "dm"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "guild" => Ok(Self::Guild),
            "channel" => Ok(Self::Channel),
            "dm" => Ok(Self::Dm),
            "disabled" | "none" => Ok(Self::Disabled),
            _ => Err(format!("Invalid notification type: {s}")),
        }
    }
}

/// One (guild, user) XP record
///
/// `total_xp` never goes below zero; decay and resets clamp. Level is
/// derived from `(total_xp, curve)` and never stored, so a curve change
/// reinterprets all levels without a data migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildUserXp {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    /// Accumulated XP; monotonic except resets and decay
    pub total_xp: i64,
    /// Reward-granted XP adjustment; may be negative after revocation
    pub bonus_xp: i64,
    pub last_activity: DateTime<Utc>,
    pub last_level_up: DateTime<Utc>,
    pub notification_type: NotificationType,
}

impl GuildUserXp {
    /// Create a fresh record (first XP gain)
    pub fn new(guild_id: Snowflake, user_id: Snowflake) -> Self {
        let now = Utc::now();
        Self {
            guild_id,
            user_id,
            total_xp: 0,
            bonus_xp: 0,
            last_activity: now,
            last_level_up: now,
            notification_type: NotificationType::default(),
        }
    }

    /// Derive the level under the given curve
    #[inline]
    pub fn level(&self, curve: CurveType) -> i64 {
        level_for_xp(self.total_xp, curve)
    }

    /// Apply an XP delta, clamping the total at zero, and touch activity
    pub fn apply_gain(&mut self, amount: i64) {
        self.total_xp = (self.total_xp + amount).max(0);
        self.last_activity = Utc::now();
    }

    /// Remove a fraction of total XP (decay pass), never below zero.
    ///
    /// The removed amount rounds up so a nonzero percent always makes
    /// progress on small totals. Returns the amount removed.
    pub fn apply_decay(&mut self, percent: f64) -> i64 {
        let percent = percent.clamp(0.0, 1.0);
        let removed = (((self.total_xp as f64) * percent).ceil() as i64).min(self.total_xp);
        self.total_xp = (self.total_xp - removed).max(0);
        removed
    }

    /// Set the total directly (admin set/reset), clamped at zero
    pub fn set_total(&mut self, total: i64) {
        self.total_xp = total.max(0);
    }

    /// Record that a level-up fired for this user
    pub fn mark_level_up(&mut self) {
        self.last_level_up = Utc::now();
    }
}
