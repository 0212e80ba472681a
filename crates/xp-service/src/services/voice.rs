//! Voice presence tracker
//!
//! Tracks one in-memory session per (guild, user) in voice. A session
//! accrues eligible time only while the user participates (not muted or
//! deafened in any form) in a channel with at least two participating
//! non-bot members; solo or muted time earns nothing. Leaving closes the
//! session and enqueues the earned XP.
//!
//! Gateway voice events drive the state machine; a revalidation timer
//! catches drift (missed events), and a cleanup timer evicts sessions
//! whose channel no longer resolves or that exceed the age ceiling.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use xp_core::{Snowflake, VoiceSession, VoiceState, XpGainItem, XpGainSource};

use super::context::ServiceContext;

/// Awards below this many base XP skip multiplier resolution
const MULTIPLIER_MIN_XP: i64 = 5;

/// Minimum participating non-bot members for eligible accrual
const QUORUM: usize = 2;

/// In-memory voice session tracker
#[derive(Clone)]
pub struct XpVoiceTracker {
    ctx: ServiceContext,
    sessions: Arc<DashMap<(Snowflake, Snowflake), VoiceSession>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl XpVoiceTracker {
    pub fn new(ctx: ServiceContext) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            ctx,
            sessions: Arc::new(DashMap::new()),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Spawn the revalidation and cleanup timers
    pub fn start(&self) {
        self.spawn_timer(
            self.ctx.config().voice_revalidation_interval(),
            |tracker| async move { tracker.revalidation_pass().await },
        );
        self.spawn_timer(
            self.ctx.config().voice_cleanup_interval(),
            |tracker| async move { tracker.cleanup_pass().await },
        );
        info!("voice tracker started");
    }

    fn spawn_timer<F, Fut>(&self, period: std::time::Duration, body: F)
    where
        F: Fn(XpVoiceTracker) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let tracker = self.clone();
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => body(tracker.clone()).await,
                    _ = shutdown.changed() => break,
                }
            }
        });
    }

    /// Stop the timers and flush every open session
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let keys: Vec<_> = self.sessions.iter().map(|s| *s.key()).collect();
        for key in keys {
            self.close_session(key.0, key.1).await;
        }
        info!("voice tracker flushed and stopped");
    }

    /// Number of open sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of one tracked session
    #[cfg(feature = "test-util")]
    pub fn session(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<VoiceSession> {
        self.sessions
            .get(&(guild_id, user_id))
            .map(|s| s.value().clone())
    }

    /// Mutate a tracked session in place
    #[cfg(feature = "test-util")]
    pub fn with_session_mut(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        f: impl FnOnce(&mut VoiceSession),
    ) {
        if let Some(mut session) = self.sessions.get_mut(&(guild_id, user_id)) {
            f(session.value_mut());
        }
    }

    /// Apply one gateway voice-state update
    #[instrument(skip(self, state))]
    pub async fn handle_voice_update(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        is_bot: bool,
        state: VoiceState,
    ) {
        if is_bot {
            return;
        }

        let key = (guild_id, user_id);
        let previous_channel = self.sessions.get(&key).map(|s| s.channel_id);

        match (previous_channel, state.channel_id) {
            // Leave
            (Some(old_channel), None) => {
                self.close_session(guild_id, user_id).await;
                self.revalidate_channel(guild_id, old_channel).await;
            }
            // Move
            (Some(old_channel), Some(new_channel)) if old_channel != new_channel => {
                self.close_session(guild_id, user_id).await;
                self.open_session(guild_id, user_id, new_channel).await;
                self.revalidate_channel(guild_id, old_channel).await;
                self.revalidate_channel(guild_id, new_channel).await;
            }
            // In-place state change (mute/deafen toggles)
            (Some(_), Some(channel)) => {
                self.revalidate_channel(guild_id, channel).await;
            }
            // Join
            (None, Some(channel)) => {
                self.open_session(guild_id, user_id, channel).await;
                self.revalidate_channel(guild_id, channel).await;
            }
            (None, None) => {}
        }
    }

    async fn open_session(&self, guild_id: Snowflake, user_id: Snowflake, channel_id: Snowflake) {
        let user_roles = self.member_roles(guild_id, user_id).await;
        match self
            .ctx
            .cache()
            .is_excluded(guild_id, Some(channel_id), user_id, &user_roles)
            .await
        {
            Ok(true) => {
                debug!(guild_id = %guild_id, user_id = %user_id, "excluded from voice XP");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "exclusion check failed, tracking anyway");
            }
        }

        self.sessions.insert(
            (guild_id, user_id),
            VoiceSession::new(guild_id, user_id, channel_id),
        );
        debug!(guild_id = %guild_id, user_id = %user_id, channel_id = %channel_id, "voice session opened");
    }

    /// Close and award a session, if one exists
    async fn close_session(&self, guild_id: Snowflake, user_id: Snowflake) {
        let Some((_, mut session)) = self.sessions.remove(&(guild_id, user_id)) else {
            return;
        };
        let now = Utc::now();
        session.mark_ineligible(now);

        let settings = match self.ctx.cache().settings(guild_id).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "settings unavailable, voice session discarded");
                return;
            }
        };

        let minutes = session
            .eligible_duration(now)
            .num_minutes()
            .min(settings.voice_timeout_minutes)
            .max(0);
        let mut xp = settings.voice_xp_per_minute * minutes;
        if xp <= 0 {
            return;
        }

        // Multiplier resolution costs reads; skip it for trivial awards
        if xp >= MULTIPLIER_MIN_XP {
            let user_roles = self.member_roles(guild_id, user_id).await;
            match self
                .ctx
                .cache()
                .effective_multiplier(guild_id, user_id, Some(session.channel_id), &user_roles)
                .await
            {
                Ok(multiplier) => xp = ((xp as f64) * multiplier).floor() as i64,
                Err(e) => {
                    warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "multiplier resolution failed, using base XP");
                }
            }
        }
        if xp <= 0 {
            return;
        }

        self.ctx.queue().enqueue(XpGainItem::new(
            guild_id,
            user_id,
            Some(session.channel_id),
            xp,
            XpGainSource::Voice,
        ));
        debug!(guild_id = %guild_id, user_id = %user_id, minutes, xp, "voice session closed");
    }

    /// Re-derive eligibility for every tracked session in a channel from
    /// the gateway's member list
    async fn revalidate_channel(&self, guild_id: Snowflake, channel_id: Snowflake) {
        let members = match self
            .ctx
            .gateway()
            .voice_channel_members(guild_id, channel_id)
            .await
        {
            Ok(members) => members,
            Err(e) => {
                warn!(guild_id = %guild_id, channel_id = %channel_id, error = %e, "voice member lookup failed");
                return;
            }
        };

        let quorum_met = members.iter().filter(|m| m.counts_for_quorum()).count() >= QUORUM;
        let now = Utc::now();

        for mut entry in self.sessions.iter_mut() {
            let session = entry.value_mut();
            if session.guild_id != guild_id || session.channel_id != channel_id {
                continue;
            }
            let participating = members
                .iter()
                .find(|m| m.user_id == session.user_id)
                .is_some_and(|m| m.is_participating());

            if participating && quorum_met {
                session.mark_eligible(now);
            } else {
                session.mark_ineligible(now);
            }
        }
    }

    /// Re-check every tracked channel; catches missed gateway events
    #[instrument(skip(self))]
    pub async fn revalidation_pass(&self) {
        let mut channels: Vec<(Snowflake, Snowflake)> = self
            .sessions
            .iter()
            .map(|s| (s.guild_id, s.channel_id))
            .collect();
        channels.sort_unstable();
        channels.dedup();

        for (guild_id, channel_id) in channels {
            self.revalidate_channel(guild_id, channel_id).await;
        }
    }

    /// Evict sessions whose channel no longer resolves or that exceed
    /// the age ceiling. Evicted sessions are awarded their banked time.
    #[instrument(skip(self))]
    pub async fn cleanup_pass(&self) {
        let max_age =
            chrono::Duration::hours(self.ctx.config().voice_session_max_age_hours as i64);
        let now = Utc::now();

        let snapshot: Vec<(Snowflake, Snowflake, Snowflake)> = self
            .sessions
            .iter()
            .map(|s| (s.guild_id, s.user_id, s.channel_id))
            .collect();

        for (guild_id, user_id, channel_id) in snapshot {
            let too_old = self
                .sessions
                .get(&(guild_id, user_id))
                .is_some_and(|s| s.age(now) > max_age);

            let resolves = if too_old {
                false
            } else {
                match self.ctx.gateway().channel_exists(guild_id, channel_id).await {
                    Ok(resolves) => resolves,
                    Err(e) => {
                        warn!(guild_id = %guild_id, channel_id = %channel_id, error = %e, "channel resolution failed, keeping session");
                        true
                    }
                }
            };

            if too_old || !resolves {
                debug!(guild_id = %guild_id, user_id = %user_id, too_old, "evicting stale voice session");
                self.close_session(guild_id, user_id).await;
            }
        }
    }

    async fn member_roles(&self, guild_id: Snowflake, user_id: Snowflake) -> Vec<Snowflake> {
        match self.ctx.gateway().member_roles(guild_id, user_id).await {
            Ok(roles) => roles,
            Err(e) => {
                warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "member role lookup failed");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for XpVoiceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XpVoiceTracker")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
