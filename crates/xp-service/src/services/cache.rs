//! Two-tier XP cache manager
//!
//! Read path: process-local hot cache (settings only), then the remote
//! cache, then storage, populating upward on every miss. Writes go to
//! storage first and then refresh both tiers with the new value; the
//! cache is never left to serve a deleted key into a stale read.
//!
//! Every remote failure (connectivity, serialization) degrades to a miss:
//! logged at warn, never propagated.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use xp_cache::{keys, CooldownStore, LocalCache};
use xp_common::XpConfig;
use xp_core::traits::{ModifierRepository, RemoteCache, UserXpRepository, XpSettingsRepository};
use xp_core::{
    GuildUserXp, GuildXpSettings, Snowflake, XpBoostEvent, XpChannelMultiplier, XpExcludedItem,
    XpRoleMultiplier,
};

use super::error::ServiceResult;

/// Two-tier cache in front of the settings, user-XP, and modifier
/// repositories
pub struct XpCacheManager {
    settings_local: LocalCache<Snowflake, GuildXpSettings>,
    remote: Arc<dyn RemoteCache>,
    settings_repo: Arc<dyn XpSettingsRepository>,
    user_xp_repo: Arc<dyn UserXpRepository>,
    modifier_repo: Arc<dyn ModifierRepository>,
    cooldowns: CooldownStore,
    config: XpConfig,
}

impl XpCacheManager {
    pub fn new(
        remote: Arc<dyn RemoteCache>,
        settings_repo: Arc<dyn XpSettingsRepository>,
        user_xp_repo: Arc<dyn UserXpRepository>,
        modifier_repo: Arc<dyn ModifierRepository>,
        config: XpConfig,
    ) -> Self {
        let settings_local = LocalCache::new(
            config.settings_local_capacity,
            std::time::Duration::from_secs(config.settings_local_ttl_secs),
        );
        let cooldowns = CooldownStore::new(Arc::clone(&remote));

        Self {
            settings_local,
            remote,
            settings_repo,
            user_xp_repo,
            modifier_repo,
            cooldowns,
            config,
        }
    }

    // === Guild settings ===

    /// Guild settings: local tier, remote tier, then storage. A guild
    /// with no stored settings gets defaults created on first read.
    #[instrument(skip(self))]
    pub async fn settings(&self, guild_id: Snowflake) -> ServiceResult<GuildXpSettings> {
        if let Some(settings) = self.settings_local.get(&guild_id) {
            return Ok(settings);
        }

        let key = keys::settings(guild_id);
        if let Some(settings) = self.remote_get::<GuildXpSettings>(&key).await {
            self.settings_local.insert(guild_id, settings.clone());
            return Ok(settings);
        }

        let settings = match self.settings_repo.find(guild_id).await? {
            Some(settings) => settings,
            None => {
                let defaults = GuildXpSettings::defaults(guild_id);
                self.settings_repo.upsert(&defaults).await?;
                debug!(guild_id = %guild_id, "created default XP settings");
                defaults
            }
        };

        self.remote_set(&key, &settings, self.config.settings_remote_ttl_secs)
            .await;
        self.settings_local.insert(guild_id, settings.clone());
        Ok(settings)
    }

    /// Persist new settings and refresh both cache tiers
    #[instrument(skip(self, settings), fields(guild_id = %settings.guild_id))]
    pub async fn update_settings(&self, settings: &GuildXpSettings) -> ServiceResult<()> {
        self.settings_repo.upsert(settings).await?;

        let key = keys::settings(settings.guild_id);
        self.remote_set(&key, settings, self.config.settings_remote_ttl_secs)
            .await;
        self.settings_local
            .insert(settings.guild_id, settings.clone());
        Ok(())
    }

    // === Per-user XP ===

    /// User XP record: remote tier, then storage
    #[instrument(skip(self))]
    pub async fn user_xp(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Option<GuildUserXp>> {
        let key = keys::user_xp(guild_id, user_id);
        if let Some(record) = self.remote_get::<GuildUserXp>(&key).await {
            return Ok(Some(record));
        }

        let record = self.user_xp_repo.find(guild_id, user_id).await?;
        if let Some(ref record) = record {
            self.remote_set(&key, record, self.config.user_xp_ttl_secs)
                .await;
        }
        Ok(record)
    }

    /// Write-through refresh after a storage update
    pub async fn refresh_user_xp(&self, record: &GuildUserXp) {
        let key = keys::user_xp(record.guild_id, record.user_id);
        self.remote_set(&key, record, self.config.user_xp_ttl_secs)
            .await;
    }

    /// Drop the cached copies of every user record in a guild. Used after
    /// bulk operations (curve change, reset) so leaderboard-facing reads
    /// do not serve stale totals.
    #[instrument(skip(self))]
    pub async fn invalidate_leaderboard(&self, guild_id: Snowflake) {
        let pattern = keys::guild_pattern(keys::USER_XP_PREFIX, guild_id);
        match self.remote.scan(&pattern, 100).await {
            Ok(matched) => {
                if let Err(e) = self.remote.delete_many(&matched).await {
                    warn!(guild_id = %guild_id, error = %e, "leaderboard invalidation delete failed");
                }
            }
            Err(e) => {
                warn!(guild_id = %guild_id, error = %e, "leaderboard invalidation scan failed");
            }
        }
    }

    // === Exclusions ===

    /// Whether a gain in `channel_id` by `user_id` holding `user_roles`
    /// is excluded from XP
    #[instrument(skip(self, user_roles))]
    pub async fn is_excluded(
        &self,
        guild_id: Snowflake,
        channel_id: Option<Snowflake>,
        user_id: Snowflake,
        user_roles: &[Snowflake],
    ) -> ServiceResult<bool> {
        let exclusions = self.exclusions(guild_id).await?;
        Ok(exclusions
            .iter()
            .any(|item| item.matches(channel_id, user_id, user_roles)))
    }

    async fn exclusions(&self, guild_id: Snowflake) -> ServiceResult<Vec<XpExcludedItem>> {
        let key = keys::exclusions(guild_id);
        if let Some(items) = self.remote_get::<Vec<XpExcludedItem>>(&key).await {
            return Ok(items);
        }

        let items = self.modifier_repo.exclusions(guild_id).await?;
        self.remote_set(&key, &items, self.config.settings_remote_ttl_secs)
            .await;
        Ok(items)
    }

    /// Drop the cached exclusion list after a mutation
    pub async fn invalidate_exclusions(&self, guild_id: Snowflake) {
        let key = keys::exclusions(guild_id);
        if let Err(e) = self.remote.delete(&key).await {
            warn!(guild_id = %guild_id, error = %e, "exclusion invalidation failed");
        }
    }

    // === Effective multiplier ===

    /// Resolved effective multiplier for a gain: guild x channel x
    /// max(role multipliers) x product of active applicable boosts.
    ///
    /// The resolved scalar is cached with a short TTL; boost expiry makes
    /// longer caching wrong.
    #[instrument(skip(self, user_roles))]
    pub async fn effective_multiplier(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Option<Snowflake>,
        user_roles: &[Snowflake],
    ) -> ServiceResult<f64> {
        let key = keys::multiplier(guild_id, user_id, channel_id);
        if let Some(cached) = self.remote_get::<f64>(&key).await {
            return Ok(cached);
        }

        let settings = self.settings(guild_id).await?;
        let channel_multipliers = self.modifier_repo.channel_multipliers(guild_id).await?;
        let role_multipliers = self.modifier_repo.role_multipliers(guild_id).await?;
        let boosts = self.modifier_repo.boosts(guild_id).await?;

        let resolved = resolve_multiplier(
            &settings,
            &channel_multipliers,
            &role_multipliers,
            &boosts,
            channel_id,
            user_roles,
        );

        self.remote_set(&key, &resolved, self.config.multiplier_ttl_secs)
            .await;
        Ok(resolved)
    }

    /// Drop cached multipliers for a guild after a modifier mutation
    pub async fn invalidate_multipliers(&self, guild_id: Snowflake) {
        let pattern = keys::guild_pattern(keys::MULTIPLIER_PREFIX, guild_id);
        match self.remote.scan(&pattern, 100).await {
            Ok(matched) => {
                if let Err(e) = self.remote.delete_many(&matched).await {
                    warn!(guild_id = %guild_id, error = %e, "multiplier invalidation delete failed");
                }
            }
            Err(e) => {
                warn!(guild_id = %guild_id, error = %e, "multiplier invalidation scan failed");
            }
        }
    }

    // === Cooldowns ===

    /// Atomic cooldown gate; true when the award may proceed
    pub async fn try_begin_cooldown(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        cooldown_secs: u64,
    ) -> bool {
        match self.cooldowns.try_begin(guild_id, user_id, cooldown_secs).await {
            Ok(won) => won,
            Err(e) => {
                // Fail open: a cache outage should not silence XP entirely
                warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "cooldown check failed");
                true
            }
        }
    }

    /// Clear a user's cooldown (admin reset)
    pub async fn clear_cooldown(&self, guild_id: Snowflake, user_id: Snowflake) {
        if let Err(e) = self.cooldowns.clear(guild_id, user_id).await {
            warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "cooldown clear failed");
        }
    }

    // === Maintenance ===

    /// One cleanup pass: delete remote settings/user/exclusion state for
    /// guilds no longer connected, refresh TTL on live multiplier keys,
    /// and purge expired local entries.
    ///
    /// Returns the number of keys deleted.
    #[instrument(skip(self, connected_guilds), fields(connected = connected_guilds.len()))]
    pub async fn cleanup_pass(&self, connected_guilds: &[Snowflake]) -> u64 {
        self.settings_local.purge_expired();

        let mut deleted = 0u64;
        for prefix in [
            keys::SETTINGS_PREFIX,
            keys::USER_XP_PREFIX,
            keys::EXCLUSIONS_PREFIX,
        ] {
            let pattern = keys::all_pattern(prefix);
            let matched = match self.remote.scan(&pattern, 100).await {
                Ok(matched) => matched,
                Err(e) => {
                    warn!(error = %e, prefix, "cleanup scan failed");
                    continue;
                }
            };

            let stale: Vec<String> = matched
                .into_iter()
                .filter(|key| {
                    keys::guild_id_of(key, prefix)
                        .is_some_and(|guild| !connected_guilds.contains(&guild))
                })
                .collect();

            if stale.is_empty() {
                continue;
            }
            match self.remote.delete_many(&stale).await {
                Ok(count) => deleted += count,
                Err(e) => warn!(error = %e, prefix, "cleanup delete failed"),
            }
        }

        // Keep hot multiplier entries alive across the cleanup interval
        let pattern = keys::all_pattern(keys::MULTIPLIER_PREFIX);
        if let Ok(matched) = self.remote.scan(&pattern, 100).await {
            for key in matched {
                let live = keys::guild_id_of(&key, keys::MULTIPLIER_PREFIX)
                    .is_some_and(|guild| connected_guilds.contains(&guild));
                if live {
                    if let Err(e) = self
                        .remote
                        .refresh_ttl(&key, self.config.multiplier_ttl_secs)
                        .await
                    {
                        warn!(error = %e, key, "multiplier TTL refresh failed");
                    }
                }
            }
        }

        deleted
    }

    // === Remote helpers ===

    async fn remote_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.remote.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "remote cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "remote cache entry undecodable, treating as miss");
                None
            }
        }
    }

    async fn remote_set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "remote cache serialization failed");
                return;
            }
        };
        if let Err(e) = self.remote.set(key, &raw, Some(ttl_secs)).await {
            warn!(key, error = %e, "remote cache write failed");
        }
    }
}

impl std::fmt::Debug for XpCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XpCacheManager")
            .field("local_entries", &self.settings_local.len())
            .finish()
    }
}

/// Pure multiplier composition: guild x channel x max(role multipliers) x
/// product of active applicable boosts
pub fn resolve_multiplier(
    settings: &GuildXpSettings,
    channel_multipliers: &[XpChannelMultiplier],
    role_multipliers: &[XpRoleMultiplier],
    boosts: &[XpBoostEvent],
    channel_id: Option<Snowflake>,
    user_roles: &[Snowflake],
) -> f64 {
    let mut multiplier = settings.multiplier;

    if let Some(channel) = channel_id {
        if let Some(m) = channel_multipliers
            .iter()
            .find(|m| m.channel_id == channel)
        {
            multiplier *= m.multiplier;
        }
    }

    let best_role = role_multipliers
        .iter()
        .filter(|m| user_roles.contains(&m.role_id))
        .map(|m| m.multiplier)
        .fold(None::<f64>, |best, m| {
            Some(best.map_or(m, |b| b.max(m)))
        });
    if let Some(role_multiplier) = best_role {
        multiplier *= role_multiplier;
    }

    let now = Utc::now();
    for boost in boosts {
        if boost.is_active(now) && boost.applies_to(channel_id, user_roles) {
            multiplier *= boost.multiplier;
        }
    }

    multiplier.max(0.0)
}
