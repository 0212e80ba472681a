//! Request DTOs for the public XP API
//!
//! All request DTOs implement `Deserialize` and `Validate`; the service
//! rejects invalid input before anything touches storage. Numeric ranges
//! mirror the clamps on `GuildXpSettings`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use xp_core::{CompetitionKind, CurveType, Snowflake};

/// Partial guild settings update; only present fields change
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateXpSettingsRequest {
    #[validate(range(min = 0, max = 1000, message = "XP per message must be 0-1000"))]
    pub xp_per_message: Option<i64>,

    #[validate(range(min = 0, message = "Cooldown cannot be negative"))]
    pub message_cooldown_secs: Option<i64>,

    #[validate(range(min = 0, max = 1000, message = "Voice XP per minute must be 0-1000"))]
    pub voice_xp_per_minute: Option<i64>,

    #[validate(range(min = 1, max = 1440, message = "Voice timeout must be 1-1440 minutes"))]
    pub voice_timeout_minutes: Option<i64>,

    #[validate(range(min = 0.0, max = 10.0, message = "Multiplier must be 0-10"))]
    pub multiplier: Option<f64>,

    pub curve_type: Option<CurveType>,

    pub decay_enabled: Option<bool>,

    #[validate(range(min = 0.0, max = 1.0, message = "Decay percent must be 0-1"))]
    pub decay_percent: Option<f64>,

    #[validate(range(min = 1, message = "Decay inactivity must be at least 1 day"))]
    pub decay_inactive_days: Option<i64>,

    #[validate(range(min = 0, max = 10000, message = "First message bonus must be 0-10000"))]
    pub first_message_bonus: Option<i64>,

    pub exclusive_role_rewards: Option<bool>,

    /// An empty string clears the template back to the default
    #[validate(length(max = 500, message = "Level-up message must be at most 500 characters"))]
    pub level_up_message: Option<String>,

    pub notification_channel_id: Option<Option<Snowflake>>,
}

/// Leaderboard page query
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LeaderboardQuery {
    #[validate(range(min = 1, max = 100, message = "Limit must be 1-100"))]
    pub limit: i64,

    #[validate(range(min = 0, message = "Offset cannot be negative"))]
    pub offset: i64,
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

/// Create a time-boxed boost event
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBoostRequest {
    #[validate(range(min = 0.0, max = 10.0, message = "Boost multiplier must be 0-10"))]
    pub multiplier: f64,

    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,

    /// Empty means every channel
    #[serde(default)]
    pub channel_ids: Vec<Snowflake>,

    /// Empty means every role
    #[serde(default)]
    pub role_ids: Vec<Snowflake>,
}

/// Create a competition
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCompetitionRequest {
    pub kind: CompetitionKind,

    #[validate(range(min = 1, message = "Target level must be at least 1"))]
    pub target_level: Option<i64>,

    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub announcement_channel_id: Option<Snowflake>,
}
