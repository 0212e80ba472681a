//! XP modifier entities - multipliers, boost events, exclusions
//!
//! All of these are guild-scoped, read-mostly, and cache-friendly. The
//! effective multiplier for a gain is:
//! guild multiplier x channel multiplier x max(role multipliers) x
//! product of active, applicable boost events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Per-channel XP multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpChannelMultiplier {
    pub guild_id: Snowflake,
    pub channel_id: Snowflake,
    pub multiplier: f64,
}

/// Per-role XP multiplier; a user holding several takes the maximum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpRoleMultiplier {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
    pub multiplier: f64,
}

/// Time-boxed XP boost event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpBoostEvent {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub multiplier: f64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Empty means the boost applies in every channel
    pub channel_ids: Vec<Snowflake>,
    /// Empty means the boost applies to every role
    pub role_ids: Vec<Snowflake>,
}

impl XpBoostEvent {
    /// Whether the boost window covers `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }

    /// Whether the boost applies to a gain in `channel_id` by a user
    /// holding `user_roles`. An empty restriction list never restricts.
    pub fn applies_to(&self, channel_id: Option<Snowflake>, user_roles: &[Snowflake]) -> bool {
        let channel_ok = self.channel_ids.is_empty()
            || channel_id.is_some_and(|c| self.channel_ids.contains(&c));
        let role_ok =
            self.role_ids.is_empty() || user_roles.iter().any(|r| self.role_ids.contains(r));
        channel_ok && role_ok
    }
}

/// What an exclusion entry targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcludedItemKind {
    Channel,
    Role,
    User,
}

impl std::fmt::Display for ExcludedItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel => write!(f, "channel"),
            Self::Role => write!(f, "role"),
            Self::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for ExcludedItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "channel" => Ok(Self::Channel),
            "role" => Ok(Self::Role),
            "user" => Ok(Self::User),
            _ => Err(format!("Invalid excluded item kind: {s}")),
        }
    }
}

/// A channel, role, or user excluded from XP gain in a guild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpExcludedItem {
    pub guild_id: Snowflake,
    pub kind: ExcludedItemKind,
    pub item_id: Snowflake,
}

impl XpExcludedItem {
    /// Whether this entry excludes a gain in `channel_id` by `user_id`
    /// holding `user_roles`
    pub fn matches(
        &self,
        channel_id: Option<Snowflake>,
        user_id: Snowflake,
        user_roles: &[Snowflake],
    ) -> bool {
        match self.kind {
            ExcludedItemKind::Channel => channel_id == Some(self.item_id),
            ExcludedItemKind::User => user_id == self.item_id,
            ExcludedItemKind::Role => user_roles.contains(&self.item_id),
        }
    }
}
