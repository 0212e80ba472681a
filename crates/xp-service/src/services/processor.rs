//! Background XP processor
//!
//! Owns the periodic work: flushing the gain queue into storage, XP
//! decay, and remote-cache cleanup. Each timer is guarded by its own
//! single-flight flag so a slow pass never stacks behind itself, and no
//! failure crosses a timer boundary.
//!
//! Flush semantics: a bounded batch is dequeued, summed per (guild,
//! user), and persisted entity by entity under a storage-concurrency
//! semaphore. A conflict is retried with linear backoff and then dropped
//! with a warning; losing one batch of gains is preferred over blocking
//! the queue. Level-transition side effects are collected during the
//! batch and fanned out concurrently once the whole batch is persisted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use futures::future::join_all;
use tokio::sync::{watch, Semaphore};
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use xp_core::{GuildUserXp, LevelChange, Snowflake, XpGainItem};

use super::competition::XpCompetitionManager;
use super::context::ServiceContext;
use super::reward::XpRewardManager;

/// One summed-per-entity update that reached storage
#[derive(Debug, Clone)]
struct EntityOutcome {
    record: GuildUserXp,
    old_level: i64,
    new_level: i64,
    channel_id: Option<Snowflake>,
}

/// Periodic flush/decay/cleanup driver
#[derive(Clone)]
pub struct XpBackgroundProcessor {
    ctx: ServiceContext,
    flush_active: Arc<AtomicBool>,
    decay_active: Arc<AtomicBool>,
    cleanup_active: Arc<AtomicBool>,
    storage_permits: Arc<Semaphore>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl XpBackgroundProcessor {
    pub fn new(ctx: ServiceContext) -> Self {
        let permits = ctx.config().storage_concurrency.max(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            ctx,
            flush_active: Arc::new(AtomicBool::new(false)),
            decay_active: Arc::new(AtomicBool::new(false)),
            cleanup_active: Arc::new(AtomicBool::new(false)),
            storage_permits: Arc::new(Semaphore::new(permits)),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Spawn the flush, decay, and cache-cleanup timers
    pub fn start(&self) {
        self.spawn_timer(self.ctx.config().flush_interval(), |processor| async move {
            processor.flush_once().await;
        });
        self.spawn_timer(self.ctx.config().decay_interval(), |processor| async move {
            processor.decay_pass().await;
        });
        self.spawn_timer(
            self.ctx.config().cleanup_interval(),
            |processor| async move {
                processor.cleanup_pass().await;
            },
        );
        info!(
            flush_interval_secs = self.ctx.config().flush_interval_secs,
            decay_interval_hours = self.ctx.config().decay_interval_hours,
            cleanup_interval_secs = self.ctx.config().cleanup_interval_secs,
            "XP background processor started"
        );
    }

    fn spawn_timer<F, Fut>(&self, period: std::time::Duration, body: F)
    where
        F: Fn(XpBackgroundProcessor) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let processor = self.clone();
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => body(processor.clone()).await,
                    _ = shutdown.changed() => break,
                }
            }
        });
    }

    /// Stop the timers and synchronously drain the queue
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        while !self.ctx.queue().is_empty() {
            if self.flush_once().await == 0 {
                // A straggler flush from a timer may still hold the guard
                sleep(std::time::Duration::from_millis(50)).await;
            }
        }
        info!("XP background processor drained and stopped");
    }

    /// One flush tick. Returns the number of entity updates persisted.
    #[instrument(skip(self))]
    pub async fn flush_once(&self) -> usize {
        if self
            .flush_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("previous flush still running, skipping tick");
            return 0;
        }

        let persisted = self.flush_batch().await;

        self.flush_active.store(false, Ordering::Release);
        persisted
    }

    async fn flush_batch(&self) -> usize {
        let batch_size = self.ctx.config().flush_batch_size;
        let items = self.ctx.queue().dequeue_batch(batch_size);
        if items.is_empty() {
            return 0;
        }

        let groups = group_by_entity(items);
        let group_count = groups.len();
        let acquire_timeout = self.ctx.config().storage_acquire_timeout();

        let mut handles = Vec::with_capacity(group_count);
        let mut aborted = 0usize;
        let mut pending = groups.into_iter();
        for ((guild_id, user_id), gain) in pending.by_ref() {
            let permit =
                match timeout(acquire_timeout, Arc::clone(&self.storage_permits).acquire_owned())
                    .await
                {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_)) => return handles.len(), // semaphore closed, shutting down
                    Err(_) => {
                        aborted += 1;
                        break;
                    }
                };

            let ctx = self.ctx.clone();
            handles.push(tokio::spawn(async move {
                let outcome = apply_entity(&ctx, guild_id, user_id, gain).await;
                drop(permit);
                outcome
            }));
        }
        if aborted > 0 {
            let dropped = aborted + pending.count();
            warn!(
                dropped,
                "storage permit acquisition timed out, aborting flush tick"
            );
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => error!(error = %e, "entity flush task panicked"),
            }
        }

        let persisted = outcomes.len();
        self.fan_out(&outcomes).await;
        debug!(groups = group_count, persisted, "flush tick complete");
        persisted
    }

    /// Side effects after the whole batch is persisted: level-change
    /// handling and competition entry updates, all concurrent, all
    /// failures logged only.
    async fn fan_out(&self, outcomes: &[EntityOutcome]) {
        let changes: Vec<LevelChange> = outcomes
            .iter()
            .filter(|o| o.new_level != o.old_level)
            .map(|o| LevelChange {
                guild_id: o.record.guild_id,
                user_id: o.record.user_id,
                old_level: o.old_level,
                new_level: o.new_level,
                channel_id: o.channel_id,
                notification_type: o.record.notification_type,
            })
            .collect();

        let reward_futures = changes.iter().map(|change| {
            let ctx = &self.ctx;
            async move {
                if let Err(e) = XpRewardManager::new(ctx).handle(change).await {
                    warn!(
                        guild_id = %change.guild_id,
                        user_id = %change.user_id,
                        error = %e,
                        "level change handling failed"
                    );
                }
            }
        });

        let competition_futures = outcomes.iter().map(|outcome| {
            let ctx = &self.ctx;
            async move {
                let manager = XpCompetitionManager::new(ctx);
                if let Err(e) = manager
                    .record_gain(
                        outcome.record.guild_id,
                        outcome.record.user_id,
                        outcome.record.total_xp,
                        outcome.new_level,
                    )
                    .await
                {
                    warn!(
                        guild_id = %outcome.record.guild_id,
                        user_id = %outcome.record.user_id,
                        error = %e,
                        "competition entry update failed"
                    );
                }
            }
        });

        tokio::join!(join_all(reward_futures), join_all(competition_futures));
    }

    /// One decay pass over every guild with decay enabled
    #[instrument(skip(self))]
    pub async fn decay_pass(&self) {
        if self
            .decay_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("previous decay pass still running, skipping");
            return;
        }

        match self.ctx.settings_repo().guilds_with_decay().await {
            Ok(guilds) => {
                for settings in guilds {
                    if let Err(e) = self.decay_guild(&settings).await {
                        warn!(guild_id = %settings.guild_id, error = %e, "decay pass failed for guild");
                    }
                }
            }
            Err(e) => warn!(error = %e, "could not list guilds with decay enabled"),
        }

        self.decay_active.store(false, Ordering::Release);
    }

    async fn decay_guild(
        &self,
        settings: &xp_core::GuildXpSettings,
    ) -> Result<(), xp_core::DomainError> {
        let cutoff = Utc::now() - ChronoDuration::days(settings.decay_inactive_days);
        let inactive = self
            .ctx
            .user_xp_repo()
            .find_inactive_since(settings.guild_id, cutoff)
            .await?;

        let mut decayed = 0usize;
        let mut removed_total = 0i64;
        for mut record in inactive {
            let removed = record.apply_decay(settings.decay_percent);
            if removed == 0 {
                continue;
            }
            // Decay must not reset the inactivity clock
            record.last_activity = cutoff.min(record.last_activity);
            self.ctx.user_xp_repo().upsert(&record).await?;
            self.ctx.cache().refresh_user_xp(&record).await;
            decayed += 1;
            removed_total += removed;
        }

        if decayed > 0 {
            info!(
                guild_id = %settings.guild_id,
                users = decayed,
                xp_removed = removed_total,
                "decay pass applied"
            );
        }
        Ok(())
    }

    /// One remote-cache cleanup pass scoped to connected guilds
    #[instrument(skip(self))]
    pub async fn cleanup_pass(&self) {
        if self
            .cleanup_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        match self.ctx.gateway().connected_guilds().await {
            Ok(connected) => {
                let deleted = self.ctx.cache().cleanup_pass(&connected).await;
                if deleted > 0 {
                    info!(deleted, "cache cleanup removed stale guild keys");
                }
            }
            Err(e) => warn!(error = %e, "cache cleanup skipped, guild list unavailable"),
        }

        self.cleanup_active.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for XpBackgroundProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XpBackgroundProcessor")
            .field("queue_len", &self.ctx.queue().len())
            .finish()
    }
}

/// A summed gain for one (guild, user)
#[derive(Debug, Clone, Copy)]
struct SummedGain {
    amount: i64,
    /// Channel of the latest contributing item, for channel-local
    /// level-up announcements
    channel_id: Option<Snowflake>,
}

fn group_by_entity(
    items: Vec<XpGainItem>,
) -> HashMap<(Snowflake, Snowflake), SummedGain> {
    let mut groups: HashMap<(Snowflake, Snowflake), SummedGain> = HashMap::new();
    for item in items {
        let entry = groups.entry(item.entity_key()).or_insert(SummedGain {
            amount: 0,
            channel_id: None,
        });
        entry.amount += item.amount;
        if item.channel_id.is_some() {
            entry.channel_id = item.channel_id;
        }
    }
    groups
}

/// Load-or-create, apply the summed delta, persist conditionally with
/// retry on conflict. Returns None when the update was dropped or failed.
async fn apply_entity(
    ctx: &ServiceContext,
    guild_id: Snowflake,
    user_id: Snowflake,
    gain: SummedGain,
) -> Option<EntityOutcome> {
    let settings = match ctx.cache().settings(guild_id).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "settings unavailable, gain dropped");
            return None;
        }
    };
    let curve = settings.curve_type;
    let retries = ctx.config().conflict_retries;

    for attempt in 0..=retries {
        if attempt > 0 {
            sleep(ctx.config().conflict_backoff(attempt)).await;
        }

        let existing = match ctx.user_xp_repo().find(guild_id, user_id).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "XP record load failed, gain dropped");
                return None;
            }
        };

        let (mut record, expected_total) = match existing {
            Some(record) => {
                let expected = record.total_xp;
                (record, Some(expected))
            }
            None => (GuildUserXp::new(guild_id, user_id), None),
        };

        let old_level = record.level(curve);
        record.apply_gain(gain.amount);
        let new_level = record.level(curve);
        if new_level > old_level {
            record.mark_level_up();
        }

        let persist = match expected_total {
            Some(expected) => ctx.user_xp_repo().update_conditional(&record, expected).await,
            None => ctx.user_xp_repo().create(&record).await,
        };

        match persist {
            Ok(()) => {
                // Fire-and-forget cache refresh; a miss self-heals
                let refresh_ctx = ctx.clone();
                let refreshed = record.clone();
                tokio::spawn(async move {
                    refresh_ctx.cache().refresh_user_xp(&refreshed).await;
                });

                return Some(EntityOutcome {
                    record,
                    old_level,
                    new_level,
                    channel_id: gain.channel_id,
                });
            }
            Err(e) if e.is_retryable() => {
                debug!(
                    guild_id = %guild_id,
                    user_id = %user_id,
                    attempt,
                    error = %e,
                    "storage conflict, retrying"
                );
            }
            Err(e) => {
                warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "XP persist failed, gain dropped");
                return None;
            }
        }
    }

    warn!(
        guild_id = %guild_id,
        user_id = %user_id,
        amount = gain.amount,
        retries,
        "conflict retries exhausted, gain dropped"
    );
    None
}
