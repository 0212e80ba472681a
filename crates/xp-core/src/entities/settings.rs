//! Guild XP settings entity - one record per guild

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::leveling::CurveType;
use crate::value_objects::Snowflake;

/// Per-guild XP configuration
///
/// Created lazily with defaults on first read; mutated only through admin
/// commands, which clamp values before they reach storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildXpSettings {
    pub guild_id: Snowflake,
    /// XP awarded per eligible message
    pub xp_per_message: i64,
    /// Seconds a user must wait between message XP awards
    pub message_cooldown_secs: i64,
    /// XP awarded per eligible minute in voice
    pub voice_xp_per_minute: i64,
    /// Cap on a single voice session's credited minutes
    pub voice_timeout_minutes: i64,
    /// Guild-wide multiplier applied to every gain
    pub multiplier: f64,
    /// Level curve used to derive levels from total XP
    pub curve_type: CurveType,
    /// Whether inactive users lose XP over time
    pub decay_enabled: bool,
    /// Fraction of total XP removed per decay pass (0.0..=1.0)
    pub decay_percent: f64,
    /// Days without activity before decay applies
    pub decay_inactive_days: i64,
    /// One-time bonus for a user's first tracked message, 0 to disable
    pub first_message_bonus: i64,
    /// Exclusive role rewards: only the highest qualifying reward role is held
    pub exclusive_role_rewards: bool,
    /// Level-up announcement template; `{user}`, `{username}`, `{level}`,
    /// `{guild}` placeholders
    pub level_up_message: Option<String>,
    /// Channel level-up announcements are routed to when set
    pub notification_channel_id: Option<Snowflake>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuildXpSettings {
    /// Default level-up template used when the guild has not set one
    pub const DEFAULT_LEVEL_UP_MESSAGE: &'static str =
        "{user} reached level {level}!";

    /// Create default settings for a guild
    pub fn defaults(guild_id: Snowflake) -> Self {
        let now = Utc::now();
        Self {
            guild_id,
            xp_per_message: 3,
            message_cooldown_secs: 60,
            voice_xp_per_minute: 2,
            voice_timeout_minutes: 120,
            multiplier: 1.0,
            curve_type: CurveType::Standard,
            decay_enabled: false,
            decay_percent: 0.05,
            decay_inactive_days: 30,
            first_message_bonus: 0,
            exclusive_role_rewards: false,
            level_up_message: None,
            notification_channel_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The level-up template in effect for this guild
    pub fn level_up_template(&self) -> &str {
        self.level_up_message
            .as_deref()
            .unwrap_or(Self::DEFAULT_LEVEL_UP_MESSAGE)
    }

    /// Clamp all tunables into their valid ranges.
    ///
    /// Invalid values never reach storage; updates run through this before
    /// persisting.
    pub fn clamp(&mut self) {
        self.xp_per_message = self.xp_per_message.clamp(0, 1000);
        self.message_cooldown_secs = self.message_cooldown_secs.max(0);
        self.voice_xp_per_minute = self.voice_xp_per_minute.clamp(0, 1000);
        self.voice_timeout_minutes = self.voice_timeout_minutes.clamp(1, 24 * 60);
        self.multiplier = self.multiplier.clamp(0.0, 10.0);
        self.decay_percent = self.decay_percent.clamp(0.0, 1.0);
        self.decay_inactive_days = self.decay_inactive_days.max(1);
        self.first_message_bonus = self.first_message_bonus.clamp(0, 10_000);
    }

    /// Mark the record as modified
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Optional per-level override of the guild level-up template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpLevelUpMessage {
    pub guild_id: Snowflake,
    pub level: i64,
    pub message: String,
}
