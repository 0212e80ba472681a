//! Background processor flows: batch flush, conflict retry, decay,
//! and queue drain on shutdown.

use chrono::{Duration, Utc};

use integration_tests::{unique_id, TestHarness};
use xp_common::XpConfig;
use xp_core::{GuildUserXp, Snowflake, XpGainItem, XpGainSource};
use xp_service::XpBackgroundProcessor;

fn gain(guild: Snowflake, user: Snowflake, channel: Option<Snowflake>, amount: i64) -> XpGainItem {
    XpGainItem::new(guild, user, channel, amount, XpGainSource::Message)
}

fn fast_config() -> XpConfig {
    XpConfig {
        conflict_backoff_ms: 1,
        ..XpConfig::default()
    }
}

#[tokio::test]
async fn test_flush_sums_batch_per_user() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let user = unique_id();
    harness.configure_guild(guild, |_| {}).await;

    harness.ctx.queue().enqueue(gain(guild, user, None, 3));
    harness.ctx.queue().enqueue(gain(guild, user, None, 4));
    harness.ctx.queue().enqueue(gain(guild, user, None, 5));

    let processor = XpBackgroundProcessor::new(harness.ctx.clone());
    let persisted = processor.flush_once().await;
    assert_eq!(persisted, 1);
    assert!(harness.ctx.queue().is_empty());

    let record = harness
        .ctx
        .user_xp_repo()
        .find(guild, user)
        .await
        .unwrap()
        .expect("record created");
    assert_eq!(record.total_xp, 12);
}

#[tokio::test]
async fn test_flush_level_up_notifies_and_grants_role() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let user = unique_id();
    let channel = unique_id();
    let reward_role = unique_id();

    harness
        .configure_guild(guild, |s| {
            s.notification_channel_id = Some(channel);
        })
        .await;
    harness
        .ctx
        .reward_repo()
        .upsert_role_reward(&xp_core::XpRoleReward {
            guild_id: guild,
            level: 1,
            role_id: reward_role,
        })
        .await
        .unwrap();
    harness.gateway.add_member(guild, user, vec![]);

    // 36 XP = level 1 on the standard curve
    harness.ctx.queue().enqueue(gain(guild, user, Some(channel), 36));
    let processor = XpBackgroundProcessor::new(harness.ctx.clone());
    assert_eq!(processor.flush_once().await, 1);

    let messages = harness.gateway.channel_messages.lock().clone();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, channel);
    assert!(messages[0].1.contains("level 1"));

    assert!(harness.gateway.roles_of(guild, user).contains(&reward_role));
}

#[tokio::test]
async fn test_flush_retries_conflict_then_succeeds() {
    let harness = TestHarness::with_config(fast_config());
    let guild = unique_id();
    let user = unique_id();
    harness.configure_guild(guild, |_| {}).await;

    let mut record = GuildUserXp::new(guild, user);
    record.total_xp = 50;
    harness.user_xp_repo.seed(record);
    harness.user_xp_repo.force_conflicts(1);

    harness.ctx.queue().enqueue(gain(guild, user, None, 10));
    let processor = XpBackgroundProcessor::new(harness.ctx.clone());
    assert_eq!(processor.flush_once().await, 1);

    let record = harness
        .ctx
        .user_xp_repo()
        .find(guild, user)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.total_xp, 60);
}

#[tokio::test]
async fn test_flush_drops_gain_after_retries_exhausted() {
    let config = fast_config();
    let retries = config.conflict_retries;
    let harness = TestHarness::with_config(config);
    let guild = unique_id();
    let user = unique_id();
    harness.configure_guild(guild, |_| {}).await;

    let mut record = GuildUserXp::new(guild, user);
    record.total_xp = 50;
    harness.user_xp_repo.seed(record);
    // One more conflict than the processor will tolerate
    harness.user_xp_repo.force_conflicts(retries + 1);

    harness.ctx.queue().enqueue(gain(guild, user, None, 10));
    let processor = XpBackgroundProcessor::new(harness.ctx.clone());
    assert_eq!(processor.flush_once().await, 0);

    let record = harness
        .ctx
        .user_xp_repo()
        .find(guild, user)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.total_xp, 50, "dropped gain must not be applied");
}

#[tokio::test]
async fn test_decay_reduces_inactive_users_only() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let idle = unique_id();
    let active = unique_id();
    harness
        .configure_guild(guild, |s| {
            s.decay_enabled = true;
            s.decay_percent = 0.10;
            s.decay_inactive_days = 30;
        })
        .await;

    let mut idle_record = GuildUserXp::new(guild, idle);
    idle_record.total_xp = 100;
    idle_record.last_activity = Utc::now() - Duration::days(60);
    harness.user_xp_repo.seed(idle_record);

    let mut active_record = GuildUserXp::new(guild, active);
    active_record.total_xp = 100;
    harness.user_xp_repo.seed(active_record);

    let processor = XpBackgroundProcessor::new(harness.ctx.clone());
    processor.decay_pass().await;

    let idle_after = harness.ctx.user_xp_repo().find(guild, idle).await.unwrap().unwrap();
    assert_eq!(idle_after.total_xp, 90);
    // Decay must not reset the inactivity clock
    assert!(idle_after.last_activity <= Utc::now() - Duration::days(30));

    let active_after = harness
        .ctx
        .user_xp_repo()
        .find(guild, active)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active_after.total_xp, 100);
}

#[tokio::test]
async fn test_decay_never_goes_below_zero() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let user = unique_id();
    harness
        .configure_guild(guild, |s| {
            s.decay_enabled = true;
            s.decay_percent = 1.0;
        })
        .await;

    let mut record = GuildUserXp::new(guild, user);
    record.total_xp = 7;
    record.last_activity = Utc::now() - Duration::days(90);
    harness.user_xp_repo.seed(record);

    let processor = XpBackgroundProcessor::new(harness.ctx.clone());
    processor.decay_pass().await;
    processor.decay_pass().await;

    let record = harness.ctx.user_xp_repo().find(guild, user).await.unwrap().unwrap();
    assert_eq!(record.total_xp, 0);
}

#[tokio::test]
async fn test_shutdown_drains_queue() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let user = unique_id();
    harness.configure_guild(guild, |_| {}).await;

    for _ in 0..5 {
        harness.ctx.queue().enqueue(gain(guild, user, None, 2));
    }

    let processor = XpBackgroundProcessor::new(harness.ctx.clone());
    processor.start();
    processor.shutdown().await;

    assert!(harness.ctx.queue().is_empty());
    let record = harness.ctx.user_xp_repo().find(guild, user).await.unwrap().unwrap();
    assert_eq!(record.total_xp, 10);
}
