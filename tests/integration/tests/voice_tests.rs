//! Voice presence tracking: session lifecycle, quorum revalidation,
//! and stale-session cleanup.

use chrono::{Duration, Utc};

use integration_tests::{unique_id, TestHarness};
use xp_core::traits::VoiceChannelMember;
use xp_core::{Snowflake, VoiceState, XpChannelMultiplier, XpGainSource};
use xp_service::XpVoiceTracker;

fn joined(channel: Snowflake) -> VoiceState {
    VoiceState {
        channel_id: Some(channel),
        self_mute: false,
        self_deaf: false,
        server_mute: false,
        server_deaf: false,
    }
}

fn left() -> VoiceState {
    VoiceState {
        channel_id: None,
        self_mute: false,
        self_deaf: false,
        server_mute: false,
        server_deaf: false,
    }
}

fn participant(user_id: Snowflake) -> VoiceChannelMember {
    VoiceChannelMember {
        user_id,
        is_bot: false,
        muted: false,
        deafened: false,
    }
}

#[tokio::test]
async fn test_join_and_leave_lifecycle() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let channel = unique_id();
    let user = unique_id();
    harness.configure_guild(guild, |_| {}).await;

    let tracker = XpVoiceTracker::new(harness.ctx.clone());
    tracker.handle_voice_update(guild, user, false, joined(channel)).await;
    assert_eq!(tracker.session_count(), 1);

    tracker.handle_voice_update(guild, user, false, left()).await;
    assert_eq!(tracker.session_count(), 0);

    // No eligible time accumulated, so nothing was enqueued
    assert!(harness.ctx.queue().is_empty());
}

#[tokio::test]
async fn test_bots_never_tracked() {
    let harness = TestHarness::new();
    let guild = unique_id();
    harness.configure_guild(guild, |_| {}).await;

    let tracker = XpVoiceTracker::new(harness.ctx.clone());
    tracker
        .handle_voice_update(guild, unique_id(), true, joined(unique_id()))
        .await;
    assert_eq!(tracker.session_count(), 0);
}

#[tokio::test]
async fn test_channel_move_keeps_one_session() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let user = unique_id();
    let (first, second) = (unique_id(), unique_id());
    harness.configure_guild(guild, |_| {}).await;

    let tracker = XpVoiceTracker::new(harness.ctx.clone());
    tracker.handle_voice_update(guild, user, false, joined(first)).await;
    tracker.handle_voice_update(guild, user, false, joined(second)).await;
    assert_eq!(tracker.session_count(), 1);
}

#[tokio::test]
async fn test_excluded_user_not_tracked() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let channel = unique_id();
    let user = unique_id();
    harness.configure_guild(guild, |_| {}).await;
    harness
        .ctx
        .modifier_repo()
        .add_exclusion(&xp_core::XpExcludedItem {
            guild_id: guild,
            kind: xp_core::ExcludedItemKind::User,
            item_id: user,
        })
        .await
        .unwrap();

    let tracker = XpVoiceTracker::new(harness.ctx.clone());
    tracker.handle_voice_update(guild, user, false, joined(channel)).await;
    assert_eq!(tracker.session_count(), 0);
}

#[tokio::test]
async fn test_revalidation_pass_with_quorum() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let channel = unique_id();
    let (a, b) = (unique_id(), unique_id());
    harness.configure_guild(guild, |_| {}).await;
    harness
        .gateway
        .set_voice_members(guild, channel, vec![participant(a), participant(b)]);

    let tracker = XpVoiceTracker::new(harness.ctx.clone());
    tracker.handle_voice_update(guild, a, false, joined(channel)).await;
    tracker.handle_voice_update(guild, b, false, joined(channel)).await;
    assert_eq!(tracker.session_count(), 2);

    // Both sessions survive a revalidation pass with quorum met
    tracker.revalidation_pass().await;
    assert_eq!(tracker.session_count(), 2);

    // One participant goes solo: quorum lost, sessions stay but stop
    // accruing; the pass itself must not evict them
    harness
        .gateway
        .set_voice_members(guild, channel, vec![participant(a)]);
    tracker.revalidation_pass().await;
    assert_eq!(tracker.session_count(), 2);
}

#[tokio::test]
async fn test_cleanup_evicts_sessions_in_deleted_channels() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let channel = unique_id();
    let user = unique_id();
    harness.configure_guild(guild, |_| {}).await;

    let tracker = XpVoiceTracker::new(harness.ctx.clone());
    tracker.handle_voice_update(guild, user, false, joined(channel)).await;
    assert_eq!(tracker.session_count(), 1);

    harness.gateway.remove_channel(guild, channel);
    tracker.cleanup_pass().await;
    assert_eq!(tracker.session_count(), 0);
}

#[tokio::test]
async fn test_quorum_session_awards_voice_xp() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let channel = unique_id();
    let (user, other) = (unique_id(), unique_id());
    harness.configure_guild(guild, |_| {}).await;
    harness
        .gateway
        .set_voice_members(guild, channel, vec![participant(user), participant(other)]);

    let tracker = XpVoiceTracker::new(harness.ctx.clone());
    tracker.handle_voice_update(guild, user, false, joined(channel)).await;

    // Quorum met and participating: the join revalidation opened an
    // eligibility period
    let session = tracker.session(guild, user).unwrap();
    assert!(session.is_eligible());

    // Ten eligible minutes elapse
    tracker.with_session_mut(guild, user, |s| {
        s.eligible_since = Some(Utc::now() - Duration::minutes(10));
    });
    tracker.handle_voice_update(guild, user, false, left()).await;

    // Default 2 XP/minute over 10 minutes
    let items = harness.ctx.queue().dequeue_batch(10);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].amount, 20);
    assert_eq!(items[0].source, XpGainSource::Voice);
    assert_eq!(items[0].channel_id, Some(channel));
}

#[tokio::test]
async fn test_voice_timeout_caps_credited_minutes() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let channel = unique_id();
    let (user, other) = (unique_id(), unique_id());
    harness
        .configure_guild(guild, |s| {
            s.voice_timeout_minutes = 5;
        })
        .await;
    harness
        .gateway
        .set_voice_members(guild, channel, vec![participant(user), participant(other)]);

    let tracker = XpVoiceTracker::new(harness.ctx.clone());
    tracker.handle_voice_update(guild, user, false, joined(channel)).await;
    tracker.with_session_mut(guild, user, |s| {
        s.eligible_since = Some(Utc::now() - Duration::minutes(60));
    });
    tracker.handle_voice_update(guild, user, false, left()).await;

    // An hour eligible, but only 5 minutes credited
    let items = harness.ctx.queue().dequeue_batch(10);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].amount, 10);
}

#[tokio::test]
async fn test_small_awards_skip_multipliers() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let channel = unique_id();
    let (user, other) = (unique_id(), unique_id());
    harness
        .configure_guild(guild, |s| {
            s.voice_xp_per_minute = 1;
        })
        .await;
    harness
        .ctx
        .modifier_repo()
        .set_channel_multiplier(&XpChannelMultiplier {
            guild_id: guild,
            channel_id: channel,
            multiplier: 3.0,
        })
        .await
        .unwrap();
    harness
        .gateway
        .set_voice_members(guild, channel, vec![participant(user), participant(other)]);

    let tracker = XpVoiceTracker::new(harness.ctx.clone());

    // 3 base XP stays below the multiplier floor: awarded unscaled
    tracker.handle_voice_update(guild, user, false, joined(channel)).await;
    tracker.with_session_mut(guild, user, |s| {
        s.eligible_since = Some(Utc::now() - Duration::minutes(3));
    });
    tracker.handle_voice_update(guild, user, false, left()).await;
    let items = harness.ctx.queue().dequeue_batch(10);
    assert_eq!(items[0].amount, 3);

    // 5 base XP reaches the floor: the channel multiplier applies
    let scaled = unique_id();
    harness.gateway.set_voice_members(
        guild,
        channel,
        vec![participant(scaled), participant(other)],
    );
    tracker.handle_voice_update(guild, scaled, false, joined(channel)).await;
    tracker.with_session_mut(guild, scaled, |s| {
        s.eligible_since = Some(Utc::now() - Duration::minutes(5));
    });
    tracker.handle_voice_update(guild, scaled, false, left()).await;
    let items = harness.ctx.queue().dequeue_batch(10);
    assert_eq!(items[0].amount, 15);
}

#[tokio::test]
async fn test_solo_session_accrues_nothing() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let channel = unique_id();
    let user = unique_id();
    harness.configure_guild(guild, |_| {}).await;
    harness
        .gateway
        .set_voice_members(guild, channel, vec![participant(user)]);

    let tracker = XpVoiceTracker::new(harness.ctx.clone());
    tracker.handle_voice_update(guild, user, false, joined(channel)).await;

    // Alone in the channel: tracked but never eligible
    let session = tracker.session(guild, user).unwrap();
    assert!(!session.is_eligible());

    tracker.handle_voice_update(guild, user, false, left()).await;
    assert!(harness.ctx.queue().is_empty());
}

#[tokio::test]
async fn test_shutdown_closes_all_sessions() {
    let harness = TestHarness::new();
    let guild = unique_id();
    harness.configure_guild(guild, |_| {}).await;

    let tracker = XpVoiceTracker::new(harness.ctx.clone());
    for _ in 0..3 {
        tracker
            .handle_voice_update(guild, unique_id(), false, joined(unique_id()))
            .await;
    }
    assert_eq!(tracker.session_count(), 3);

    tracker.shutdown().await;
    assert_eq!(tracker.session_count(), 0);
}
