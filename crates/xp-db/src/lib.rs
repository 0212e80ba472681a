//! # xp-db
//!
//! Database layer implementing the repository traits with PostgreSQL via
//! SQLx.
//!
//! ## Overview
//!
//! This crate provides PostgreSQL implementations for all repository
//! traits defined in `xp-core`. It handles:
//!
//! - Connection pool management
//! - Database models with SQLx `FromRow` derives and entity conversions
//! - Repository implementations, including the conditional update used to
//!   detect lost write races
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xp_db::pool::{create_pool, DatabaseConfig};
//! use xp_db::repositories::PgUserXpRepository;
//! use xp_core::traits::UserXpRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env();
//!     let pool = create_pool(&config).await?;
//!     let xp_repo = PgUserXpRepository::new(pool);
//!
//!     // Use the repository...
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, create_pool_from_env, DatabaseConfig, PgPool};
pub use repositories::{
    PgCompetitionRepository, PgModifierRepository, PgRewardRepository, PgUserXpRepository,
    PgXpSettingsRepository,
};
