//! Time-boxed XP competition entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// How a competition ranks its entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionKind {
    /// Largest XP delta since the start snapshot wins
    MostGained,
    /// First to reach the target level wins; ranked by achievement time
    ReachLevel,
    /// Largest absolute total XP at finalization wins
    HighestTotal,
}

impl std::fmt::Display for CompetitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MostGained => write!(f, "most_gained"),
            Self::ReachLevel => write!(f, "reach_level"),
            Self::HighestTotal => write!(f, "highest_total"),
        }
    }
}

impl std::str::FromStr for CompetitionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "most_gained" => Ok(Self::MostGained),
            "reach_level" => Ok(Self::ReachLevel),
            "highest_total" => Ok(Self::HighestTotal),
            _ => Err(format!("Invalid competition kind: {s}")),
        }
    }
}

/// A scheduled or running competition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpCompetition {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub kind: CompetitionKind,
    /// Target level; required for ReachLevel, ignored otherwise
    pub target_level: Option<i64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Set once the start snapshot has been taken
    pub started: bool,
    pub finalized: bool,
    pub announcement_channel_id: Option<Snowflake>,
}

impl XpCompetition {
    /// Live = started, not finalized, end time not yet reached
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.started && !self.finalized && now < self.ends_at
    }
}

/// One participant's entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpCompetitionEntry {
    pub competition_id: Snowflake,
    pub user_id: Snowflake,
    /// Total XP at the start snapshot
    pub starting_xp: i64,
    /// Latest observed total XP
    pub current_xp: i64,
    /// When the target level was reached (ReachLevel only); written once
    pub achieved_at: Option<DateTime<Utc>>,
    /// Final placement, assigned at finalization (1-based)
    pub placement: Option<i32>,
}

impl XpCompetitionEntry {
    pub fn new(competition_id: Snowflake, user_id: Snowflake, starting_xp: i64) -> Self {
        Self {
            competition_id,
            user_id,
            starting_xp,
            current_xp: starting_xp,
            achieved_at: None,
            placement: None,
        }
    }

    /// XP gained since the start snapshot
    #[inline]
    pub fn gained(&self) -> i64 {
        self.current_xp - self.starting_xp
    }
}

/// Reward handed out for a placement at finalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpCompetitionReward {
    pub competition_id: Snowflake,
    /// 1-based placement this reward is for
    pub placement: i32,
    pub role_id: Option<Snowflake>,
    pub xp: i64,
    pub currency: i64,
}
