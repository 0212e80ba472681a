//! Redis key schema for the XP subsystem
//!
//! Every key format lives here so the cleanup scan patterns and the
//! writers can never drift apart.

use xp_core::Snowflake;

/// Key prefix for guild XP settings
pub const SETTINGS_PREFIX: &str = "xp:settings:";
/// Key prefix for per-user XP records
pub const USER_XP_PREFIX: &str = "xp:user:";
/// Key prefix for resolved effective multipliers
pub const MULTIPLIER_PREFIX: &str = "xp:mult:";
/// Key prefix for message cooldown markers
pub const COOLDOWN_PREFIX: &str = "xp:cooldown:";
/// Key prefix for guild exclusion lists
pub const EXCLUSIONS_PREFIX: &str = "xp:excl:";
/// Key prefix for guild reward tables
pub const REWARDS_PREFIX: &str = "xp:rewards:";

/// Guild settings key
pub fn settings(guild_id: Snowflake) -> String {
    format!("{SETTINGS_PREFIX}{guild_id}")
}

/// Per-user XP record key
pub fn user_xp(guild_id: Snowflake, user_id: Snowflake) -> String {
    format!("{USER_XP_PREFIX}{guild_id}:{user_id}")
}

/// Resolved effective multiplier for (guild, user, channel)
pub fn multiplier(guild_id: Snowflake, user_id: Snowflake, channel_id: Option<Snowflake>) -> String {
    match channel_id {
        Some(channel) => format!("{MULTIPLIER_PREFIX}{guild_id}:{user_id}:{channel}"),
        None => format!("{MULTIPLIER_PREFIX}{guild_id}:{user_id}:-"),
    }
}

/// Message cooldown marker for (guild, user)
pub fn cooldown(guild_id: Snowflake, user_id: Snowflake) -> String {
    format!("{COOLDOWN_PREFIX}{guild_id}:{user_id}")
}

/// Guild exclusion list key
pub fn exclusions(guild_id: Snowflake) -> String {
    format!("{EXCLUSIONS_PREFIX}{guild_id}")
}

/// Guild reward tables key
pub fn rewards(guild_id: Snowflake) -> String {
    format!("{REWARDS_PREFIX}{guild_id}")
}

/// Scan pattern matching every key of a guild under one prefix.
///
/// The trailing colon keeps the pattern from also matching guilds whose
/// decimal id extends this one (guild 12 vs guild 123). Only valid for
/// prefixes whose keys carry a segment after the guild id.
pub fn guild_pattern(prefix: &str, guild_id: Snowflake) -> String {
    format!("{prefix}{guild_id}:*")
}

/// Scan pattern matching every key under one prefix
pub fn all_pattern(prefix: &str) -> String {
    format!("{prefix}*")
}

/// Extract the guild id segment from a key produced by this module.
///
/// Keys are `<prefix><guild_id>` or `<prefix><guild_id>:<rest>`.
pub fn guild_id_of(key: &str, prefix: &str) -> Option<Snowflake> {
    let tail = key.strip_prefix(prefix)?;
    let id = tail.split(':').next()?;
    id.parse().ok()
}
