//! Message cooldown gate
//!
//! Check-and-set in a single remote round trip (`SET NX EX`): when two
//! event-handler invocations race on the same (guild, user), exactly one
//! wins the marker write and awards XP. Anything less atomic double-awards
//! under closely spaced messages.

use std::sync::Arc;

use xp_core::{CacheResult, RemoteCache, Snowflake};

use crate::keys;

/// Atomic message-cooldown store over the remote cache
#[derive(Clone)]
pub struct CooldownStore {
    cache: Arc<dyn RemoteCache>,
}

impl CooldownStore {
    pub fn new(cache: Arc<dyn RemoteCache>) -> Self {
        Self { cache }
    }

    /// Try to start a cooldown window.
    ///
    /// Returns true when the user was *not* on cooldown and the window was
    /// started; false when a window is already active. A zero-length
    /// cooldown always passes.
    pub async fn try_begin(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        cooldown_secs: u64,
    ) -> CacheResult<bool> {
        if cooldown_secs == 0 {
            return Ok(true);
        }
        let key = keys::cooldown(guild_id, user_id);
        self.cache.set_if_absent(&key, "1", cooldown_secs).await
    }

    /// Clear a user's cooldown window (admin reset path)
    pub async fn clear(&self, guild_id: Snowflake, user_id: Snowflake) -> CacheResult<bool> {
        let key = keys::cooldown(guild_id, user_id);
        self.cache.delete(&key).await
    }
}

impl std::fmt::Debug for CooldownStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownStore").finish()
    }
}
