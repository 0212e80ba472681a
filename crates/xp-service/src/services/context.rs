//! Service context - dependency container for services
//!
//! Holds the repository ports, cache tiers, gateway/ledger/renderer
//! capabilities, and shared in-process state (gain queue, role-sync
//! guard). Everything is behind a trait object so tests wire in-memory
//! implementations through the same constructor production uses.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use xp_cache::SharedRedisPool;
use xp_common::XpConfig;
use xp_core::traits::{
    CardRenderer, CompetitionRepository, CurrencyLedger, GatewayClient, ModifierRepository,
    RemoteCache, RewardRepository, UserXpRepository, XpSettingsRepository,
};
use xp_core::{Snowflake, SnowflakeGenerator};
use xp_db::PgPool;

use super::cache::XpCacheManager;
use super::queue::XpQueue;

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    settings_repo: Arc<dyn XpSettingsRepository>,
    user_xp_repo: Arc<dyn UserXpRepository>,
    reward_repo: Arc<dyn RewardRepository>,
    modifier_repo: Arc<dyn ModifierRepository>,
    competition_repo: Arc<dyn CompetitionRepository>,

    // External capabilities
    gateway: Arc<dyn GatewayClient>,
    ledger: Arc<dyn CurrencyLedger>,
    renderer: Arc<dyn CardRenderer>,

    // Cache + queue
    cache: Arc<XpCacheManager>,
    queue: Arc<XpQueue>,

    // Shared in-process state
    snowflake_generator: Arc<SnowflakeGenerator>,
    role_sync_active: Arc<AtomicBool>,
    role_sync_cooldowns: Arc<DashMap<(Snowflake, Snowflake), Instant>>,

    config: XpConfig,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings_repo: Arc<dyn XpSettingsRepository>,
        user_xp_repo: Arc<dyn UserXpRepository>,
        reward_repo: Arc<dyn RewardRepository>,
        modifier_repo: Arc<dyn ModifierRepository>,
        competition_repo: Arc<dyn CompetitionRepository>,
        remote_cache: Arc<dyn RemoteCache>,
        gateway: Arc<dyn GatewayClient>,
        ledger: Arc<dyn CurrencyLedger>,
        renderer: Arc<dyn CardRenderer>,
        snowflake_generator: Arc<SnowflakeGenerator>,
        config: XpConfig,
    ) -> Self {
        let cache = Arc::new(XpCacheManager::new(
            remote_cache,
            Arc::clone(&settings_repo),
            Arc::clone(&user_xp_repo),
            Arc::clone(&modifier_repo),
            config.clone(),
        ));

        Self {
            settings_repo,
            user_xp_repo,
            reward_repo,
            modifier_repo,
            competition_repo,
            gateway,
            ledger,
            renderer,
            cache,
            queue: Arc::new(XpQueue::new()),
            snowflake_generator,
            role_sync_active: Arc::new(AtomicBool::new(false)),
            role_sync_cooldowns: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Wire the production stack: PostgreSQL repositories over `pool` and
    /// the Redis pool as the remote cache tier.
    pub fn from_infrastructure(
        pool: PgPool,
        redis_pool: SharedRedisPool,
        gateway: Arc<dyn GatewayClient>,
        ledger: Arc<dyn CurrencyLedger>,
        renderer: Arc<dyn CardRenderer>,
        snowflake_generator: Arc<SnowflakeGenerator>,
        config: XpConfig,
    ) -> Self {
        Self::new(
            Arc::new(xp_db::PgXpSettingsRepository::new(pool.clone())),
            Arc::new(xp_db::PgUserXpRepository::new(pool.clone())),
            Arc::new(xp_db::PgRewardRepository::new(pool.clone())),
            Arc::new(xp_db::PgModifierRepository::new(pool.clone())),
            Arc::new(xp_db::PgCompetitionRepository::new(pool)),
            redis_pool as Arc<dyn RemoteCache>,
            gateway,
            ledger,
            renderer,
            snowflake_generator,
            config,
        )
    }

    // === Repositories ===

    pub fn settings_repo(&self) -> &dyn XpSettingsRepository {
        self.settings_repo.as_ref()
    }

    pub fn user_xp_repo(&self) -> &dyn UserXpRepository {
        self.user_xp_repo.as_ref()
    }

    pub fn reward_repo(&self) -> &dyn RewardRepository {
        self.reward_repo.as_ref()
    }

    pub fn modifier_repo(&self) -> &dyn ModifierRepository {
        self.modifier_repo.as_ref()
    }

    pub fn competition_repo(&self) -> &dyn CompetitionRepository {
        self.competition_repo.as_ref()
    }

    // === External capabilities ===

    pub fn gateway(&self) -> &dyn GatewayClient {
        self.gateway.as_ref()
    }

    pub fn ledger(&self) -> &dyn CurrencyLedger {
        self.ledger.as_ref()
    }

    pub fn renderer(&self) -> &dyn CardRenderer {
        self.renderer.as_ref()
    }

    // === Cache + queue ===

    pub fn cache(&self) -> &XpCacheManager {
        self.cache.as_ref()
    }

    pub fn queue(&self) -> &XpQueue {
        self.queue.as_ref()
    }

    // === Shared state ===

    pub fn snowflake_generator(&self) -> &SnowflakeGenerator {
        self.snowflake_generator.as_ref()
    }

    pub(crate) fn role_sync_active(&self) -> &AtomicBool {
        self.role_sync_active.as_ref()
    }

    pub(crate) fn role_sync_cooldowns(&self) -> &DashMap<(Snowflake, Snowflake), Instant> {
        self.role_sync_cooldowns.as_ref()
    }

    pub fn config(&self) -> &XpConfig {
        &self.config
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("queue_len", &self.queue.len())
            .finish()
    }
}
