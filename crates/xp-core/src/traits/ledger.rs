//! Currency ledger port
//!
//! Balance mutations for currency rewards. Debit is the reversal path for
//! revoked rewards; implementations may clamp at zero or allow negative
//! balances, the reward manager does not care.

use async_trait::async_trait;

use crate::value_objects::Snowflake;

/// Ledger operation errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Currency ledger capability
#[async_trait]
pub trait CurrencyLedger: Send + Sync {
    /// Credit a user's balance and append a transaction record
    async fn credit(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        amount: i64,
        reason: &str,
    ) -> LedgerResult<()>;

    /// Debit a user's balance and append a transaction record
    async fn debit(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        amount: i64,
        reason: &str,
    ) -> LedgerResult<()>;
}
