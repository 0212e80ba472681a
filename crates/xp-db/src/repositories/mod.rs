//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in xp-core.
//! Each repository handles database operations for a specific domain area.

mod competition;
mod error;
mod modifier;
mod reward;
mod settings;
mod user_xp;

pub use competition::PgCompetitionRepository;
pub use modifier::PgModifierRepository;
pub use reward::PgRewardRepository;
pub use settings::PgXpSettingsRepository;
pub use user_xp::PgUserXpRepository;
