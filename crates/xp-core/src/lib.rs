//! # xp-core
//!
//! Domain layer for the XP subsystem: entities, value objects, the curve
//! calculator, domain events, and the trait ports consumed by the service
//! layer. This crate has zero dependencies on infrastructure (database,
//! Redis, gateway client, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod leveling;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    CompetitionKind, ExcludedItemKind, GuildUserXp, GuildXpSettings, NotificationType,
    VoiceSession, VoiceState, XpBoostEvent, XpChannelMultiplier, XpCompetition,
    XpCompetitionEntry, XpCompetitionReward, XpCurrencyReward, XpExcludedItem, XpGainItem,
    XpGainSource, XpLevelUpMessage, XpRoleMultiplier, XpRoleReward,
};
pub use error::DomainError;
pub use events::LevelChange;
pub use leveling::{level_for_xp, level_progress, xp_for_level, xp_to_next_level, CurveType};
pub use traits::{
    CacheError, CacheResult, CardRenderer, CompetitionRepository, CurrencyLedger, GatewayClient,
    GatewayError, GatewayResult, LedgerError, LedgerResult, ModifierRepository, ProfileCardData,
    RemoteCache, RendererError, RepoResult, RewardRepository, UserXpRepository,
    VoiceChannelMember, XpSettingsRepository,
};
pub use value_objects::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
