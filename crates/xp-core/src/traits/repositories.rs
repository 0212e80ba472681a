//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs; the infrastructure layer
//! provides the implementation. Conditional updates signal lost races as
//! `DomainError::Conflict` so callers can distinguish contention from
//! other failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    GuildUserXp, GuildXpSettings, XpBoostEvent, XpChannelMultiplier, XpCompetition,
    XpCompetitionEntry, XpCompetitionReward, XpCurrencyReward, XpExcludedItem, XpLevelUpMessage,
    XpRoleMultiplier, XpRoleReward,
};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Guild Settings Repository
// ============================================================================

#[async_trait]
pub trait XpSettingsRepository: Send + Sync {
    /// Find settings for a guild
    async fn find(&self, guild_id: Snowflake) -> RepoResult<Option<GuildXpSettings>>;

    /// Insert or replace a guild's settings
    async fn upsert(&self, settings: &GuildXpSettings) -> RepoResult<()>;

    /// All guilds with XP decay enabled (for the decay pass)
    async fn guilds_with_decay(&self) -> RepoResult<Vec<GuildXpSettings>>;

    /// Per-level level-up message override, if set
    async fn level_up_message(
        &self,
        guild_id: Snowflake,
        level: i64,
    ) -> RepoResult<Option<XpLevelUpMessage>>;

    /// Insert or replace a per-level message override
    async fn set_level_up_message(&self, message: &XpLevelUpMessage) -> RepoResult<()>;

    /// Remove a per-level message override
    async fn delete_level_up_message(&self, guild_id: Snowflake, level: i64) -> RepoResult<()>;
}

// ============================================================================
// User XP Repository
// ============================================================================

#[async_trait]
pub trait UserXpRepository: Send + Sync {
    /// Find a (guild, user) XP record
    async fn find(&self, guild_id: Snowflake, user_id: Snowflake)
        -> RepoResult<Option<GuildUserXp>>;

    /// Insert a fresh record; conflicts on duplicate key
    async fn create(&self, record: &GuildUserXp) -> RepoResult<()>;

    /// Conditionally update: only applies while the stored total still
    /// equals `expected_total`. A lost race returns
    /// `DomainError::Conflict`.
    async fn update_conditional(
        &self,
        record: &GuildUserXp,
        expected_total: i64,
    ) -> RepoResult<()>;

    /// Unconditional insert-or-replace (admin set/reset, decay)
    async fn upsert(&self, record: &GuildUserXp) -> RepoResult<()>;

    /// Leaderboard page ordered by total XP descending
    async fn top_by_xp(
        &self,
        guild_id: Snowflake,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<GuildUserXp>>;

    /// 1-based rank of a user within the guild, None when unranked
    async fn rank_of(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<i64>>;

    /// Number of tracked users in the guild
    async fn count(&self, guild_id: Snowflake) -> RepoResult<i64>;

    /// Users whose last activity is older than `cutoff` (decay candidates)
    async fn find_inactive_since(
        &self,
        guild_id: Snowflake,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<Vec<GuildUserXp>>;

    /// Users active since `cutoff` (competition start snapshot)
    async fn find_active_since(
        &self,
        guild_id: Snowflake,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<Vec<GuildUserXp>>;

    /// Every record with XP > 0 (role sync)
    async fn find_with_xp(&self, guild_id: Snowflake) -> RepoResult<Vec<GuildUserXp>>;
}

// ============================================================================
// Reward Repository
// ============================================================================

#[async_trait]
pub trait RewardRepository: Send + Sync {
    /// All role rewards for a guild, ordered by level
    async fn role_rewards(&self, guild_id: Snowflake) -> RepoResult<Vec<XpRoleReward>>;

    /// Insert or replace the role reward at a level
    async fn upsert_role_reward(&self, reward: &XpRoleReward) -> RepoResult<()>;

    /// Remove the role reward at a level
    async fn delete_role_reward(&self, guild_id: Snowflake, level: i64) -> RepoResult<()>;

    /// All currency rewards for a guild, ordered by level
    async fn currency_rewards(&self, guild_id: Snowflake) -> RepoResult<Vec<XpCurrencyReward>>;

    /// Insert or replace the currency reward at a level
    async fn upsert_currency_reward(&self, reward: &XpCurrencyReward) -> RepoResult<()>;

    /// Remove the currency reward at a level
    async fn delete_currency_reward(&self, guild_id: Snowflake, level: i64) -> RepoResult<()>;
}

// ============================================================================
// Modifier Repository (multipliers, boosts, exclusions)
// ============================================================================

#[async_trait]
pub trait ModifierRepository: Send + Sync {
    /// All channel multipliers for a guild
    async fn channel_multipliers(
        &self,
        guild_id: Snowflake,
    ) -> RepoResult<Vec<XpChannelMultiplier>>;

    /// Insert or replace a channel multiplier
    async fn set_channel_multiplier(&self, multiplier: &XpChannelMultiplier) -> RepoResult<()>;

    /// Remove a channel multiplier
    async fn delete_channel_multiplier(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> RepoResult<()>;

    /// All role multipliers for a guild
    async fn role_multipliers(&self, guild_id: Snowflake) -> RepoResult<Vec<XpRoleMultiplier>>;

    /// Insert or replace a role multiplier
    async fn set_role_multiplier(&self, multiplier: &XpRoleMultiplier) -> RepoResult<()>;

    /// Remove a role multiplier
    async fn delete_role_multiplier(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
    ) -> RepoResult<()>;

    /// Boost events whose window has not ended yet
    async fn boosts(&self, guild_id: Snowflake) -> RepoResult<Vec<XpBoostEvent>>;

    /// Create a boost event
    async fn create_boost(&self, boost: &XpBoostEvent) -> RepoResult<()>;

    /// Cancel (delete) a boost event
    async fn delete_boost(&self, id: Snowflake) -> RepoResult<()>;

    /// All exclusion entries for a guild
    async fn exclusions(&self, guild_id: Snowflake) -> RepoResult<Vec<XpExcludedItem>>;

    /// Add an exclusion entry (idempotent)
    async fn add_exclusion(&self, item: &XpExcludedItem) -> RepoResult<()>;

    /// Remove an exclusion entry
    async fn remove_exclusion(&self, item: &XpExcludedItem) -> RepoResult<()>;
}

// ============================================================================
// Competition Repository
// ============================================================================

#[async_trait]
pub trait CompetitionRepository: Send + Sync {
    /// Create a competition
    async fn create(&self, competition: &XpCompetition) -> RepoResult<()>;

    /// Find a competition by id
    async fn find(&self, id: Snowflake) -> RepoResult<Option<XpCompetition>>;

    /// Competitions in a guild that are started and not finalized
    async fn active_by_guild(&self, guild_id: Snowflake) -> RepoResult<Vec<XpCompetition>>;

    /// Update a competition's lifecycle flags
    async fn update(&self, competition: &XpCompetition) -> RepoResult<()>;

    /// All entries for a competition
    async fn entries(&self, competition_id: Snowflake) -> RepoResult<Vec<XpCompetitionEntry>>;

    /// One user's entry, if present
    async fn entry(
        &self,
        competition_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<XpCompetitionEntry>>;

    /// Insert or replace an entry
    async fn upsert_entry(&self, entry: &XpCompetitionEntry) -> RepoResult<()>;

    /// Whether any entry already carries an achievement timestamp
    /// (first-to-reach announcement guard)
    async fn any_achieved(&self, competition_id: Snowflake) -> RepoResult<bool>;

    /// Placement rewards configured for a competition
    async fn rewards(&self, competition_id: Snowflake) -> RepoResult<Vec<XpCompetitionReward>>;

    /// Replace the placement rewards for a competition
    async fn set_rewards(
        &self,
        competition_id: Snowflake,
        rewards: &[XpCompetitionReward],
    ) -> RepoResult<()>;
}
