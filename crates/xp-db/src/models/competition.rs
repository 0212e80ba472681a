//! Competition database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use xp_core::entities::{
    CompetitionKind, XpCompetition, XpCompetitionEntry, XpCompetitionReward,
};
use xp_core::value_objects::Snowflake;

/// Database model for the xp_competitions table
#[derive(Debug, Clone, FromRow)]
pub struct XpCompetitionModel {
    pub id: i64,
    pub guild_id: i64,
    pub kind: String,
    pub target_level: Option<i64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub started: bool,
    pub finalized: bool,
    pub announcement_channel_id: Option<i64>,
}

impl From<XpCompetitionModel> for XpCompetition {
    fn from(model: XpCompetitionModel) -> Self {
        Self {
            id: Snowflake::new(model.id),
            guild_id: Snowflake::new(model.guild_id),
            kind: model.kind.parse().unwrap_or(CompetitionKind::MostGained),
            target_level: model.target_level,
            starts_at: model.starts_at,
            ends_at: model.ends_at,
            started: model.started,
            finalized: model.finalized,
            announcement_channel_id: model.announcement_channel_id.map(Snowflake::new),
        }
    }
}

/// Database model for the xp_competition_entries table
#[derive(Debug, Clone, FromRow)]
pub struct XpCompetitionEntryModel {
    pub competition_id: i64,
    pub user_id: i64,
    pub starting_xp: i64,
    pub current_xp: i64,
    pub achieved_at: Option<DateTime<Utc>>,
    pub placement: Option<i32>,
}

impl From<XpCompetitionEntryModel> for XpCompetitionEntry {
    fn from(model: XpCompetitionEntryModel) -> Self {
        Self {
            competition_id: Snowflake::new(model.competition_id),
            user_id: Snowflake::new(model.user_id),
            starting_xp: model.starting_xp,
            current_xp: model.current_xp,
            achieved_at: model.achieved_at,
            placement: model.placement,
        }
    }
}

/// Database model for the xp_competition_rewards table
#[derive(Debug, Clone, FromRow)]
pub struct XpCompetitionRewardModel {
    pub competition_id: i64,
    pub placement: i32,
    pub role_id: Option<i64>,
    pub xp: i64,
    pub currency: i64,
}

impl From<XpCompetitionRewardModel> for XpCompetitionReward {
    fn from(model: XpCompetitionRewardModel) -> Self {
        Self {
            competition_id: Snowflake::new(model.competition_id),
            placement: model.placement,
            role_id: model.role_id.map(Snowflake::new),
            xp: model.xp,
            currency: model.currency,
        }
    }
}
