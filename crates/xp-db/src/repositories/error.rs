//! Error handling utilities for repositories

use xp_core::error::DomainError;
use sqlx::Error as SqlxError;

/// SQLSTATE codes that indicate transient contention worth retrying:
/// serialization failure, deadlock detected, lock not available.
const RETRYABLE_SQLSTATES: [&str; 3] = ["40001", "40P01", "55P03"];

/// Convert a SQLx error to a DomainError.
///
/// Contention SQLSTATEs map to `DomainError::Conflict` so the background
/// processor's retry loop can tell them apart from hard failures.
pub fn map_db_error(e: SqlxError) -> DomainError {
    if let Some(db_err) = e.as_database_error() {
        if let Some(code) = db_err.code() {
            if RETRYABLE_SQLSTATES.contains(&code.as_ref()) {
                return DomainError::Conflict(db_err.to_string());
            }
        }
    }
    DomainError::DatabaseError(e.to_string())
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    map_db_error(e)
}
