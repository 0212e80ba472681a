//! Business logic services
//!
//! This module contains all service layer implementations that handle
//! business logic, validation, and orchestration of domain operations.

pub mod cache;
pub mod competition;
pub mod context;
pub mod error;
pub mod message;
pub mod processor;
pub mod queue;
pub mod reward;
pub mod role_sync;
pub mod voice;
pub mod xp;

// Re-export all services for convenience
pub use cache::XpCacheManager;
pub use competition::XpCompetitionManager;
pub use context::ServiceContext;
pub use error::{ServiceError, ServiceResult};
pub use message::XpMessageService;
pub use processor::XpBackgroundProcessor;
pub use queue::XpQueue;
pub use reward::XpRewardManager;
pub use role_sync::XpRoleSyncService;
pub use voice::XpVoiceTracker;
pub use xp::XpService;
