//! # xp-service
//!
//! Application layer for the XP subsystem: the cache manager, gain queue
//! and background processor, voice tracker, reward and competition
//! managers, role sync, and the public `XpService` facade consumed by the
//! bot's command and event handlers.

pub mod dto;
pub mod services;

pub use services::{
    ServiceContext, ServiceError, ServiceResult, XpBackgroundProcessor, XpCacheManager,
    XpCompetitionManager, XpMessageService, XpQueue, XpRewardManager, XpRoleSyncService,
    XpService, XpVoiceTracker,
};
