//! Voice presence entities - gateway voice state and tracked sessions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// A user's voice state as reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    pub channel_id: Option<Snowflake>,
    pub self_mute: bool,
    pub self_deaf: bool,
    pub server_mute: bool,
    pub server_deaf: bool,
}

impl VoiceState {
    /// Participating = audible and listening: not muted or deafened in any form
    #[inline]
    pub fn is_participating(&self) -> bool {
        !(self.self_mute || self.self_deaf || self.server_mute || self.server_deaf)
    }
}

/// In-memory voice session tracked per (guild, user)
///
/// Accrues eligible duration while the user participates in a channel with
/// at least one other participating non-bot member. Flushed into an XP
/// gain when the user leaves or the tracker shuts down.
#[derive(Debug, Clone)]
pub struct VoiceSession {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub joined_at: DateTime<Utc>,
    /// Eligible time banked from completed eligibility periods
    pub accumulated: Duration,
    /// Start of the current eligibility period, when eligible
    pub eligible_since: Option<DateTime<Utc>>,
}

impl VoiceSession {
    pub fn new(guild_id: Snowflake, user_id: Snowflake, channel_id: Snowflake) -> Self {
        Self {
            guild_id,
            user_id,
            channel_id,
            joined_at: Utc::now(),
            accumulated: Duration::zero(),
            eligible_since: None,
        }
    }

    #[inline]
    pub fn is_eligible(&self) -> bool {
        self.eligible_since.is_some()
    }

    /// Enter the eligible state; no-op when already eligible
    pub fn mark_eligible(&mut self, now: DateTime<Utc>) {
        if self.eligible_since.is_none() {
            self.eligible_since = Some(now);
        }
    }

    /// Leave the eligible state, banking the elapsed eligible time
    pub fn mark_ineligible(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.eligible_since.take() {
            self.accumulated += (now - since).max(Duration::zero());
        }
    }

    /// Total eligible duration as of `now`, including the open period
    pub fn eligible_duration(&self, now: DateTime<Utc>) -> Duration {
        match self.eligible_since {
            Some(since) => self.accumulated + (now - since).max(Duration::zero()),
            None => self.accumulated,
        }
    }

    /// Session age regardless of eligibility
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.joined_at).max(Duration::zero())
    }
}
