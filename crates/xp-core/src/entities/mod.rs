//! Domain entities - XP settings, user records, modifiers, competitions

mod competition;
mod gain;
mod modifier;
mod reward;
mod settings;
mod user_xp;
mod voice;

pub use competition::{
    CompetitionKind, XpCompetition, XpCompetitionEntry, XpCompetitionReward,
};
pub use gain::{XpGainItem, XpGainSource};
pub use modifier::{
    ExcludedItemKind, XpBoostEvent, XpChannelMultiplier, XpExcludedItem, XpRoleMultiplier,
};
pub use reward::{currency_between_levels, highest_qualifying_role, XpCurrencyReward, XpRoleReward};
pub use settings::{GuildXpSettings, XpLevelUpMessage};
pub use user_xp::{GuildUserXp, NotificationType};
pub use voice::{VoiceSession, VoiceState};
