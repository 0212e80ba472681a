//! Application configuration structs
//!
//! Loads configuration from environment variables (optionally seeded from a
//! `.env` file) or from a layered config file + environment override.

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub xp: XpConfig,
    #[serde(default)]
    pub snowflake: SnowflakeConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Snowflake ID generator configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SnowflakeConfig {
    #[serde(default)]
    pub worker_id: u16,
}

/// XP subsystem tuning knobs
///
/// Every field has a sensible default; deployments only override what they
/// need via `XP_*` environment variables or the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct XpConfig {
    /// Seconds between gain-queue flush attempts
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Maximum gain items dequeued per flush tick
    #[serde(default = "default_flush_batch_size")]
    pub flush_batch_size: usize,
    /// Concurrent storage sessions during a flush
    #[serde(default = "default_storage_concurrency")]
    pub storage_concurrency: usize,
    /// Seconds to wait for a storage permit before aborting the tick
    #[serde(default = "default_storage_acquire_timeout_secs")]
    pub storage_acquire_timeout_secs: u64,
    /// Retries on a storage conflict before dropping the entity update
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
    /// Base backoff between conflict retries; grows linearly per attempt
    #[serde(default = "default_conflict_backoff_ms")]
    pub conflict_backoff_ms: u64,
    /// Hours between XP decay passes
    #[serde(default = "default_decay_interval_hours")]
    pub decay_interval_hours: u64,
    /// Seconds between remote-cache cleanup passes
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Process-local settings cache TTL (seconds)
    #[serde(default = "default_settings_local_ttl_secs")]
    pub settings_local_ttl_secs: u64,
    /// Process-local settings cache capacity (entries)
    #[serde(default = "default_settings_local_capacity")]
    pub settings_local_capacity: usize,
    /// Remote settings cache TTL (seconds)
    #[serde(default = "default_settings_remote_ttl_secs")]
    pub settings_remote_ttl_secs: u64,
    /// Remote per-user XP cache TTL (seconds)
    #[serde(default = "default_user_xp_ttl_secs")]
    pub user_xp_ttl_secs: u64,
    /// Resolved-multiplier cache TTL (seconds); short because boosts expire
    #[serde(default = "default_multiplier_ttl_secs")]
    pub multiplier_ttl_secs: u64,
    /// Seconds between voice-session eligibility revalidation passes
    #[serde(default = "default_voice_revalidation_interval_secs")]
    pub voice_revalidation_interval_secs: u64,
    /// Seconds between stale voice-session cleanup passes
    #[serde(default = "default_voice_cleanup_interval_secs")]
    pub voice_cleanup_interval_secs: u64,
    /// Safety ceiling on a voice session's age (hours)
    #[serde(default = "default_voice_session_max_age_hours")]
    pub voice_session_max_age_hours: u64,
    /// Per-user role resync cooldown (seconds)
    #[serde(default = "default_role_sync_user_cooldown_secs")]
    pub role_sync_user_cooldown_secs: u64,
    /// Activity window for competition start snapshots (days)
    #[serde(default = "default_competition_snapshot_days")]
    pub competition_snapshot_days: i64,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval_secs(),
            flush_batch_size: default_flush_batch_size(),
            storage_concurrency: default_storage_concurrency(),
            storage_acquire_timeout_secs: default_storage_acquire_timeout_secs(),
            conflict_retries: default_conflict_retries(),
            conflict_backoff_ms: default_conflict_backoff_ms(),
            decay_interval_hours: default_decay_interval_hours(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            settings_local_ttl_secs: default_settings_local_ttl_secs(),
            settings_local_capacity: default_settings_local_capacity(),
            settings_remote_ttl_secs: default_settings_remote_ttl_secs(),
            user_xp_ttl_secs: default_user_xp_ttl_secs(),
            multiplier_ttl_secs: default_multiplier_ttl_secs(),
            voice_revalidation_interval_secs: default_voice_revalidation_interval_secs(),
            voice_cleanup_interval_secs: default_voice_cleanup_interval_secs(),
            voice_session_max_age_hours: default_voice_session_max_age_hours(),
            role_sync_user_cooldown_secs: default_role_sync_user_cooldown_secs(),
            competition_snapshot_days: default_competition_snapshot_days(),
        }
    }
}

impl XpConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn storage_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_acquire_timeout_secs)
    }

    pub fn conflict_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.conflict_backoff_ms * u64::from(attempt))
    }

    pub fn decay_interval(&self) -> Duration {
        Duration::from_secs(self.decay_interval_hours * 3600)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn voice_revalidation_interval(&self) -> Duration {
        Duration::from_secs(self.voice_revalidation_interval_secs)
    }

    pub fn voice_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.voice_cleanup_interval_secs)
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}")]
    InvalidVar(&'static str),

    #[error("Config file error: {0}")]
    File(#[from] config::ConfigError),
}

// Default value functions
fn default_app_name() -> String {
    "guild-xp".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_flush_interval_secs() -> u64 {
    5
}

fn default_flush_batch_size() -> usize {
    100
}

fn default_storage_concurrency() -> usize {
    5
}

fn default_storage_acquire_timeout_secs() -> u64 {
    10
}

fn default_conflict_retries() -> u32 {
    3
}

fn default_conflict_backoff_ms() -> u64 {
    50
}

fn default_decay_interval_hours() -> u64 {
    6
}

fn default_cleanup_interval_secs() -> u64 {
    600
}

fn default_settings_local_ttl_secs() -> u64 {
    5
}

fn default_settings_local_capacity() -> usize {
    1000
}

fn default_settings_remote_ttl_secs() -> u64 {
    300
}

fn default_user_xp_ttl_secs() -> u64 {
    300
}

fn default_multiplier_ttl_secs() -> u64 {
    30
}

fn default_voice_revalidation_interval_secs() -> u64 {
    120
}

fn default_voice_cleanup_interval_secs() -> u64 {
    1800
}

fn default_voice_session_max_age_hours() -> u64 {
    12
}

fn default_role_sync_user_cooldown_secs() -> u64 {
    300
}

fn default_competition_snapshot_days() -> i64 {
    30
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", default_max_connections()),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", default_min_connections()),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL"))?,
                max_connections: env_or(
                    "REDIS_MAX_CONNECTIONS",
                    default_redis_max_connections(),
                ),
            },
            xp: XpConfig {
                flush_interval_secs: env_or("XP_FLUSH_INTERVAL_SECS", default_flush_interval_secs()),
                flush_batch_size: env_or("XP_FLUSH_BATCH_SIZE", default_flush_batch_size()),
                storage_concurrency: env_or("XP_STORAGE_CONCURRENCY", default_storage_concurrency()),
                ..XpConfig::default()
            },
            snowflake: SnowflakeConfig {
                worker_id: env_or("SNOWFLAKE_WORKER_ID", 0),
            },
        })
    }

    /// Load from a layered config file (`config/{env}.toml`) with
    /// `APP_`-prefixed environment overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Parse an environment variable, falling back to a default
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
