//! Database models - SQLx-compatible structs for PostgreSQL tables
//!
//! Each model derives `FromRow` and converts into its domain entity via
//! `From`. Enum-valued columns are stored as text and parsed on the way
//! out; rows are only ever written through the entities' `Display` forms,
//! so a parse failure means a hand-edited row and falls back to the
//! entity default.

mod competition;
mod modifier;
mod reward;
mod settings;
mod user_xp;

pub use competition::{XpCompetitionEntryModel, XpCompetitionModel, XpCompetitionRewardModel};
pub use modifier::{
    XpBoostEventModel, XpChannelMultiplierModel, XpExcludedItemModel, XpRoleMultiplierModel,
};
pub use reward::{XpCurrencyRewardModel, XpRoleRewardModel};
pub use settings::{GuildXpSettingsModel, XpLevelUpMessageModel};
pub use user_xp::GuildUserXpModel;
