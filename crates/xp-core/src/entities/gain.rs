//! Ephemeral XP gain item - lives only in the in-memory queue
//!
//! Gain items are produced by the message/voice event handlers and
//! consumed by the background processor, which persists only the summed
//! per-(guild, user) delta. Individual items are never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Origin of an XP gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XpGainSource {
    Message,
    Voice,
    Manual,
    FirstMessage,
}

impl std::fmt::Display for XpGainSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::Voice => write!(f, "voice"),
            Self::Manual => write!(f, "manual"),
            Self::FirstMessage => write!(f, "first_message"),
        }
    }
}

/// One queued XP delta for a (guild, user)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpGainItem {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    /// Channel the gain originated in; None for manual adjustments
    pub channel_id: Option<Snowflake>,
    pub amount: i64,
    pub source: XpGainSource,
    pub timestamp: DateTime<Utc>,
}

impl XpGainItem {
    pub fn new(
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Option<Snowflake>,
        amount: i64,
        source: XpGainSource,
    ) -> Self {
        Self {
            guild_id,
            user_id,
            channel_id,
            amount,
            source,
            timestamp: Utc::now(),
        }
    }

    /// Grouping key for per-entity batching
    #[inline]
    pub fn entity_key(&self) -> (Snowflake, Snowflake) {
        (self.guild_id, self.user_id)
    }
}
