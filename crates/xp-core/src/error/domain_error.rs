//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("XP record not found for guild {guild_id} user {user_id}")]
    UserXpNotFound {
        guild_id: Snowflake,
        user_id: Snowflake,
    },

    #[error("XP settings not found for guild {0}")]
    SettingsNotFound(Snowflake),

    #[error("Competition not found: {0}")]
    CompetitionNotFound(Snowflake),

    #[error("Boost event not found: {0}")]
    BoostNotFound(Snowflake),

    // =========================================================================
    // Contention
    // =========================================================================
    /// Transient storage contention (serialization failure, deadlock, lock
    /// timeout, or a lost optimistic update). The caller may retry; the
    /// background processor retries with backoff and then drops the update.
    #[error("Storage conflict: {0}")]
    Conflict(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl DomainError {
    /// Whether a retry may succeed
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
