//! In-memory implementations of every port the service layer consumes
//!
//! The repositories reproduce the storage semantics the services rely on:
//! `create` conflicts on a duplicate key, `update_conditional` conflicts
//! when the stored total moved, and the remote cache implements a real
//! check-and-set for `set_if_absent`. Gateway and ledger mocks record
//! every side effect so tests can assert on them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use xp_core::traits::{
    CacheResult, CardRenderer, CompetitionRepository, CurrencyLedger, GatewayClient,
    GatewayError, GatewayResult, LedgerResult, ModifierRepository, ProfileCardData, RemoteCache,
    RendererError, RepoResult, RewardRepository, UserXpRepository, VoiceChannelMember,
    XpSettingsRepository,
};
use xp_core::{
    DomainError, GuildUserXp, GuildXpSettings, Snowflake, XpBoostEvent, XpChannelMultiplier,
    XpCompetition, XpCompetitionEntry, XpCompetitionReward, XpCurrencyReward, XpExcludedItem,
    XpLevelUpMessage, XpRoleMultiplier, XpRoleReward,
};

// ============================================================================
// Settings repository
// ============================================================================

#[derive(Default)]
pub struct MemorySettingsRepository {
    settings: Mutex<HashMap<Snowflake, GuildXpSettings>>,
    messages: Mutex<HashMap<(Snowflake, i64), XpLevelUpMessage>>,
}

impl MemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl XpSettingsRepository for MemorySettingsRepository {
    async fn find(&self, guild_id: Snowflake) -> RepoResult<Option<GuildXpSettings>> {
        Ok(self.settings.lock().get(&guild_id).cloned())
    }

    async fn upsert(&self, settings: &GuildXpSettings) -> RepoResult<()> {
        self.settings
            .lock()
            .insert(settings.guild_id, settings.clone());
        Ok(())
    }

    async fn guilds_with_decay(&self) -> RepoResult<Vec<GuildXpSettings>> {
        Ok(self
            .settings
            .lock()
            .values()
            .filter(|s| s.decay_enabled)
            .cloned()
            .collect())
    }

    async fn level_up_message(
        &self,
        guild_id: Snowflake,
        level: i64,
    ) -> RepoResult<Option<XpLevelUpMessage>> {
        Ok(self.messages.lock().get(&(guild_id, level)).cloned())
    }

    async fn set_level_up_message(&self, message: &XpLevelUpMessage) -> RepoResult<()> {
        self.messages
            .lock()
            .insert((message.guild_id, message.level), message.clone());
        Ok(())
    }

    async fn delete_level_up_message(&self, guild_id: Snowflake, level: i64) -> RepoResult<()> {
        self.messages.lock().remove(&(guild_id, level));
        Ok(())
    }
}

// ============================================================================
// User XP repository
// ============================================================================

#[derive(Default)]
pub struct MemoryUserXpRepository {
    records: Mutex<HashMap<(Snowflake, Snowflake), GuildUserXp>>,
    /// Number of upcoming conditional updates to reject with a conflict,
    /// regardless of the expected total. Drives retry-path tests.
    forced_conflicts: AtomicU32,
}

impl MemoryUserXpRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` conditional updates fail with a conflict
    pub fn force_conflicts(&self, n: u32) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    /// Insert a record directly, bypassing conflict semantics
    pub fn seed(&self, record: GuildUserXp) {
        self.records
            .lock()
            .insert((record.guild_id, record.user_id), record);
    }

    fn sorted_for_guild(&self, guild_id: Snowflake) -> Vec<GuildUserXp> {
        let mut records: Vec<GuildUserXp> = self
            .records
            .lock()
            .values()
            .filter(|r| r.guild_id == guild_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.total_xp
                .cmp(&a.total_xp)
                .then(a.user_id.into_inner().cmp(&b.user_id.into_inner()))
        });
        records
    }
}

#[async_trait]
impl UserXpRepository for MemoryUserXpRepository {
    async fn find(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<GuildUserXp>> {
        Ok(self.records.lock().get(&(guild_id, user_id)).cloned())
    }

    async fn create(&self, record: &GuildUserXp) -> RepoResult<()> {
        let mut records = self.records.lock();
        let key = (record.guild_id, record.user_id);
        if records.contains_key(&key) {
            return Err(DomainError::Conflict("duplicate XP record".to_string()));
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn update_conditional(
        &self,
        record: &GuildUserXp,
        expected_total: i64,
    ) -> RepoResult<()> {
        if self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DomainError::Conflict("forced test conflict".to_string()));
        }

        let mut records = self.records.lock();
        let key = (record.guild_id, record.user_id);
        match records.get(&key) {
            Some(stored) if stored.total_xp == expected_total => {
                records.insert(key, record.clone());
                Ok(())
            }
            _ => Err(DomainError::Conflict("stale XP total".to_string())),
        }
    }

    async fn upsert(&self, record: &GuildUserXp) -> RepoResult<()> {
        self.records
            .lock()
            .insert((record.guild_id, record.user_id), record.clone());
        Ok(())
    }

    async fn top_by_xp(
        &self,
        guild_id: Snowflake,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<GuildUserXp>> {
        Ok(self
            .sorted_for_guild(guild_id)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn rank_of(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<i64>> {
        let records = self.records.lock();
        let Some(target) = records.get(&(guild_id, user_id)) else {
            return Ok(None);
        };
        let higher = records
            .values()
            .filter(|r| r.guild_id == guild_id && r.total_xp > target.total_xp)
            .count();
        Ok(Some(higher as i64 + 1))
    }

    async fn count(&self, guild_id: Snowflake) -> RepoResult<i64> {
        Ok(self
            .records
            .lock()
            .values()
            .filter(|r| r.guild_id == guild_id)
            .count() as i64)
    }

    async fn find_inactive_since(
        &self,
        guild_id: Snowflake,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<Vec<GuildUserXp>> {
        Ok(self
            .records
            .lock()
            .values()
            .filter(|r| r.guild_id == guild_id && r.last_activity < cutoff && r.total_xp > 0)
            .cloned()
            .collect())
    }

    async fn find_active_since(
        &self,
        guild_id: Snowflake,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<Vec<GuildUserXp>> {
        Ok(self
            .records
            .lock()
            .values()
            .filter(|r| r.guild_id == guild_id && r.last_activity >= cutoff)
            .cloned()
            .collect())
    }

    async fn find_with_xp(&self, guild_id: Snowflake) -> RepoResult<Vec<GuildUserXp>> {
        Ok(self
            .sorted_for_guild(guild_id)
            .into_iter()
            .filter(|r| r.total_xp > 0)
            .collect())
    }
}

// ============================================================================
// Reward repository
// ============================================================================

#[derive(Default)]
pub struct MemoryRewardRepository {
    roles: Mutex<HashMap<(Snowflake, i64), XpRoleReward>>,
    currency: Mutex<HashMap<(Snowflake, i64), XpCurrencyReward>>,
}

impl MemoryRewardRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RewardRepository for MemoryRewardRepository {
    async fn role_rewards(&self, guild_id: Snowflake) -> RepoResult<Vec<XpRoleReward>> {
        let mut rewards: Vec<XpRoleReward> = self
            .roles
            .lock()
            .values()
            .filter(|r| r.guild_id == guild_id)
            .cloned()
            .collect();
        rewards.sort_by_key(|r| r.level);
        Ok(rewards)
    }

    async fn upsert_role_reward(&self, reward: &XpRoleReward) -> RepoResult<()> {
        self.roles
            .lock()
            .insert((reward.guild_id, reward.level), reward.clone());
        Ok(())
    }

    async fn delete_role_reward(&self, guild_id: Snowflake, level: i64) -> RepoResult<()> {
        self.roles.lock().remove(&(guild_id, level));
        Ok(())
    }

    async fn currency_rewards(&self, guild_id: Snowflake) -> RepoResult<Vec<XpCurrencyReward>> {
        let mut rewards: Vec<XpCurrencyReward> = self
            .currency
            .lock()
            .values()
            .filter(|r| r.guild_id == guild_id)
            .cloned()
            .collect();
        rewards.sort_by_key(|r| r.level);
        Ok(rewards)
    }

    async fn upsert_currency_reward(&self, reward: &XpCurrencyReward) -> RepoResult<()> {
        self.currency
            .lock()
            .insert((reward.guild_id, reward.level), reward.clone());
        Ok(())
    }

    async fn delete_currency_reward(&self, guild_id: Snowflake, level: i64) -> RepoResult<()> {
        self.currency.lock().remove(&(guild_id, level));
        Ok(())
    }
}

// ============================================================================
// Modifier repository
// ============================================================================

#[derive(Default)]
pub struct MemoryModifierRepository {
    channel_multipliers: Mutex<HashMap<(Snowflake, Snowflake), XpChannelMultiplier>>,
    role_multipliers: Mutex<HashMap<(Snowflake, Snowflake), XpRoleMultiplier>>,
    boosts: Mutex<HashMap<Snowflake, XpBoostEvent>>,
    exclusions: Mutex<Vec<XpExcludedItem>>,
}

impl MemoryModifierRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModifierRepository for MemoryModifierRepository {
    async fn channel_multipliers(
        &self,
        guild_id: Snowflake,
    ) -> RepoResult<Vec<XpChannelMultiplier>> {
        Ok(self
            .channel_multipliers
            .lock()
            .values()
            .filter(|m| m.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn set_channel_multiplier(&self, multiplier: &XpChannelMultiplier) -> RepoResult<()> {
        self.channel_multipliers
            .lock()
            .insert((multiplier.guild_id, multiplier.channel_id), multiplier.clone());
        Ok(())
    }

    async fn delete_channel_multiplier(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> RepoResult<()> {
        self.channel_multipliers
            .lock()
            .remove(&(guild_id, channel_id));
        Ok(())
    }

    async fn role_multipliers(&self, guild_id: Snowflake) -> RepoResult<Vec<XpRoleMultiplier>> {
        Ok(self
            .role_multipliers
            .lock()
            .values()
            .filter(|m| m.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn set_role_multiplier(&self, multiplier: &XpRoleMultiplier) -> RepoResult<()> {
        self.role_multipliers
            .lock()
            .insert((multiplier.guild_id, multiplier.role_id), multiplier.clone());
        Ok(())
    }

    async fn delete_role_multiplier(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
    ) -> RepoResult<()> {
        self.role_multipliers.lock().remove(&(guild_id, role_id));
        Ok(())
    }

    async fn boosts(&self, guild_id: Snowflake) -> RepoResult<Vec<XpBoostEvent>> {
        let now = Utc::now();
        Ok(self
            .boosts
            .lock()
            .values()
            .filter(|b| b.guild_id == guild_id && b.ends_at > now)
            .cloned()
            .collect())
    }

    async fn create_boost(&self, boost: &XpBoostEvent) -> RepoResult<()> {
        self.boosts.lock().insert(boost.id, boost.clone());
        Ok(())
    }

    async fn delete_boost(&self, id: Snowflake) -> RepoResult<()> {
        self.boosts.lock().remove(&id);
        Ok(())
    }

    async fn exclusions(&self, guild_id: Snowflake) -> RepoResult<Vec<XpExcludedItem>> {
        Ok(self
            .exclusions
            .lock()
            .iter()
            .filter(|i| i.guild_id == guild_id)
            .copied()
            .collect())
    }

    async fn add_exclusion(&self, item: &XpExcludedItem) -> RepoResult<()> {
        let mut exclusions = self.exclusions.lock();
        if !exclusions.contains(item) {
            exclusions.push(*item);
        }
        Ok(())
    }

    async fn remove_exclusion(&self, item: &XpExcludedItem) -> RepoResult<()> {
        self.exclusions.lock().retain(|i| i != item);
        Ok(())
    }
}

// ============================================================================
// Competition repository
// ============================================================================

#[derive(Default)]
pub struct MemoryCompetitionRepository {
    competitions: Mutex<HashMap<Snowflake, XpCompetition>>,
    entries: Mutex<HashMap<(Snowflake, Snowflake), XpCompetitionEntry>>,
    rewards: Mutex<HashMap<Snowflake, Vec<XpCompetitionReward>>>,
}

impl MemoryCompetitionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompetitionRepository for MemoryCompetitionRepository {
    async fn create(&self, competition: &XpCompetition) -> RepoResult<()> {
        self.competitions
            .lock()
            .insert(competition.id, competition.clone());
        Ok(())
    }

    async fn find(&self, id: Snowflake) -> RepoResult<Option<XpCompetition>> {
        Ok(self.competitions.lock().get(&id).cloned())
    }

    async fn active_by_guild(&self, guild_id: Snowflake) -> RepoResult<Vec<XpCompetition>> {
        Ok(self
            .competitions
            .lock()
            .values()
            .filter(|c| c.guild_id == guild_id && c.started && !c.finalized)
            .cloned()
            .collect())
    }

    async fn update(&self, competition: &XpCompetition) -> RepoResult<()> {
        let mut competitions = self.competitions.lock();
        if !competitions.contains_key(&competition.id) {
            return Err(DomainError::CompetitionNotFound(competition.id));
        }
        competitions.insert(competition.id, competition.clone());
        Ok(())
    }

    async fn entries(&self, competition_id: Snowflake) -> RepoResult<Vec<XpCompetitionEntry>> {
        Ok(self
            .entries
            .lock()
            .values()
            .filter(|e| e.competition_id == competition_id)
            .cloned()
            .collect())
    }

    async fn entry(
        &self,
        competition_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<XpCompetitionEntry>> {
        Ok(self
            .entries
            .lock()
            .get(&(competition_id, user_id))
            .cloned())
    }

    async fn upsert_entry(&self, entry: &XpCompetitionEntry) -> RepoResult<()> {
        let mut entries = self.entries.lock();
        let key = (entry.competition_id, entry.user_id);
        let mut entry = entry.clone();
        // achieved_at is write-once, matching the storage layer
        if let Some(existing) = entries.get(&key) {
            if existing.achieved_at.is_some() {
                entry.achieved_at = existing.achieved_at;
            }
        }
        entries.insert(key, entry);
        Ok(())
    }

    async fn any_achieved(&self, competition_id: Snowflake) -> RepoResult<bool> {
        Ok(self
            .entries
            .lock()
            .values()
            .any(|e| e.competition_id == competition_id && e.achieved_at.is_some()))
    }

    async fn rewards(&self, competition_id: Snowflake) -> RepoResult<Vec<XpCompetitionReward>> {
        Ok(self
            .rewards
            .lock()
            .get(&competition_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_rewards(
        &self,
        competition_id: Snowflake,
        rewards: &[XpCompetitionReward],
    ) -> RepoResult<()> {
        self.rewards
            .lock()
            .insert(competition_id, rewards.to_vec());
        Ok(())
    }
}

// ============================================================================
// Gateway mock
// ============================================================================

/// One recorded role mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Added(Snowflake, Snowflake, Snowflake),
    Removed(Snowflake, Snowflake, Snowflake),
}

#[derive(Default)]
pub struct MockGateway {
    guilds: Mutex<Vec<Snowflake>>,
    /// (guild, user) -> held role ids; presence in the map means the
    /// member exists
    members: Mutex<HashMap<(Snowflake, Snowflake), Vec<Snowflake>>>,
    display_names: Mutex<HashMap<(Snowflake, Snowflake), String>>,
    guild_names: Mutex<HashMap<Snowflake, String>>,
    voice_channels: Mutex<HashMap<(Snowflake, Snowflake), Vec<VoiceChannelMember>>>,
    removed_channels: Mutex<Vec<(Snowflake, Snowflake)>>,
    pub role_changes: Mutex<Vec<RoleChange>>,
    pub channel_messages: Mutex<Vec<(Snowflake, String)>>,
    pub direct_messages: Mutex<Vec<(Snowflake, String)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_guild(&self, guild_id: Snowflake) {
        self.guilds.lock().push(guild_id);
    }

    pub fn add_member(&self, guild_id: Snowflake, user_id: Snowflake, roles: Vec<Snowflake>) {
        self.members.lock().insert((guild_id, user_id), roles);
    }

    pub fn set_display_name(&self, guild_id: Snowflake, user_id: Snowflake, name: &str) {
        self.display_names
            .lock()
            .insert((guild_id, user_id), name.to_string());
    }

    pub fn set_voice_members(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
        members: Vec<VoiceChannelMember>,
    ) {
        self.voice_channels
            .lock()
            .insert((guild_id, channel_id), members);
    }

    pub fn remove_channel(&self, guild_id: Snowflake, channel_id: Snowflake) {
        self.removed_channels.lock().push((guild_id, channel_id));
    }

    pub fn roles_of(&self, guild_id: Snowflake, user_id: Snowflake) -> Vec<Snowflake> {
        self.members
            .lock()
            .get(&(guild_id, user_id))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn connected_guilds(&self) -> GatewayResult<Vec<Snowflake>> {
        Ok(self.guilds.lock().clone())
    }

    async fn guild_name(&self, guild_id: Snowflake) -> GatewayResult<Option<String>> {
        Ok(self.guild_names.lock().get(&guild_id).cloned())
    }

    async fn member_exists(&self, guild_id: Snowflake, user_id: Snowflake) -> GatewayResult<bool> {
        Ok(self.members.lock().contains_key(&(guild_id, user_id)))
    }

    async fn member_roles(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> GatewayResult<Vec<Snowflake>> {
        self.members
            .lock()
            .get(&(guild_id, user_id))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("member {user_id}")))
    }

    async fn member_display_name(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> GatewayResult<Option<String>> {
        Ok(self.display_names.lock().get(&(guild_id, user_id)).cloned())
    }

    async fn channel_exists(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> GatewayResult<bool> {
        Ok(!self
            .removed_channels
            .lock()
            .contains(&(guild_id, channel_id)))
    }

    async fn voice_channel_members(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> GatewayResult<Vec<VoiceChannelMember>> {
        Ok(self
            .voice_channels
            .lock()
            .get(&(guild_id, channel_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
    ) -> GatewayResult<()> {
        let mut members = self.members.lock();
        if let Some(roles) = members.get_mut(&(guild_id, user_id)) {
            if !roles.contains(&role_id) {
                roles.push(role_id);
            }
        }
        self.role_changes
            .lock()
            .push(RoleChange::Added(guild_id, user_id, role_id));
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
    ) -> GatewayResult<()> {
        let mut members = self.members.lock();
        if let Some(roles) = members.get_mut(&(guild_id, user_id)) {
            roles.retain(|r| *r != role_id);
        }
        self.role_changes
            .lock()
            .push(RoleChange::Removed(guild_id, user_id, role_id));
        Ok(())
    }

    async fn send_channel_message(
        &self,
        channel_id: Snowflake,
        content: &str,
    ) -> GatewayResult<()> {
        self.channel_messages
            .lock()
            .push((channel_id, content.to_string()));
        Ok(())
    }

    async fn send_direct_message(&self, user_id: Snowflake, content: &str) -> GatewayResult<()> {
        self.direct_messages
            .lock()
            .push((user_id, content.to_string()));
        Ok(())
    }
}

// ============================================================================
// Ledger mock
// ============================================================================

/// One recorded ledger transaction; positive amount is a credit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub amount: i64,
    pub reason: String,
}

#[derive(Default)]
pub struct RecordingLedger {
    pub entries: Mutex<Vec<LedgerEntry>>,
}

impl RecordingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Net balance for a (guild, user) across all recorded transactions
    pub fn balance(&self, guild_id: Snowflake, user_id: Snowflake) -> i64 {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.guild_id == guild_id && e.user_id == user_id)
            .map(|e| e.amount)
            .sum()
    }
}

#[async_trait]
impl CurrencyLedger for RecordingLedger {
    async fn credit(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        amount: i64,
        reason: &str,
    ) -> LedgerResult<()> {
        self.entries.lock().push(LedgerEntry {
            guild_id,
            user_id,
            amount,
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn debit(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        amount: i64,
        reason: &str,
    ) -> LedgerResult<()> {
        self.entries.lock().push(LedgerEntry {
            guild_id,
            user_id,
            amount: -amount,
            reason: reason.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Renderer stub
// ============================================================================

#[derive(Default)]
pub struct StubRenderer {
    pub calls: Mutex<Vec<ProfileCardData>>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardRenderer for StubRenderer {
    async fn render_profile_card(&self, data: &ProfileCardData) -> Result<Vec<u8>, RendererError> {
        self.calls.lock().push(data.clone());
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

// ============================================================================
// Remote cache mock
// ============================================================================

/// In-memory key/value store. TTLs are accepted but never expire; tests
/// never advance the clock far enough for that to matter.
#[derive(Default)]
pub struct MemoryRemoteCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryRemoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

fn glob_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl RemoteCache for MemoryRemoteCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl_secs: Option<u64>) -> CacheResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, _ttl_secs: u64) -> CacheResult<bool> {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn delete_many(&self, keys: &[String]) -> CacheResult<u64> {
        let mut entries = self.entries.lock();
        let mut removed = 0;
        for key in keys {
            if entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn scan(&self, pattern: &str, _count: usize) -> CacheResult<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| glob_matches(pattern, k))
            .cloned()
            .collect())
    }

    async fn refresh_ttl(&self, key: &str, _ttl_secs: u64) -> CacheResult<bool> {
        Ok(self.entries.lock().contains_key(key))
    }
}
