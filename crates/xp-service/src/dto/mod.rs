//! Data transfer objects for the public XP API

pub mod requests;
pub mod responses;

pub use requests::{
    CreateBoostRequest, CreateCompetitionRequest, LeaderboardQuery, UpdateXpSettingsRequest,
};
pub use responses::{LeaderboardEntry, LeaderboardPage, UserXpStats};
