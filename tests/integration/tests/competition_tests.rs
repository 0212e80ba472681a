//! Competition lifecycle end to end: snapshot on start, live entry
//! updates driven by flushes, ranking, placement rewards, and the
//! first-achievement announcement.

use chrono::{Duration, Utc};

use integration_tests::{unique_id, TestHarness};
use xp_core::{
    CompetitionKind, GuildUserXp, Snowflake, XpCompetitionReward, XpGainItem, XpGainSource,
};
use xp_service::dto::CreateCompetitionRequest;
use xp_service::{ServiceError, XpBackgroundProcessor, XpService};

fn seed_user(harness: &TestHarness, guild: Snowflake, user: Snowflake, total: i64) {
    let mut record = GuildUserXp::new(guild, user);
    record.total_xp = total;
    harness.user_xp_repo.seed(record);
}

fn request(kind: CompetitionKind, target: Option<i64>, channel: Snowflake) -> CreateCompetitionRequest {
    let now = Utc::now();
    CreateCompetitionRequest {
        kind,
        target_level: target,
        starts_at: now - Duration::minutes(1),
        ends_at: now + Duration::hours(1),
        announcement_channel_id: Some(channel),
    }
}

async fn flush_gain(harness: &TestHarness, guild: Snowflake, user: Snowflake, amount: i64) {
    harness.ctx.queue().enqueue(XpGainItem::new(
        guild,
        user,
        None,
        amount,
        XpGainSource::Message,
    ));
    let processor = XpBackgroundProcessor::new(harness.ctx.clone());
    assert_eq!(processor.flush_once().await, 1);
}

#[tokio::test]
async fn test_create_rejects_bad_windows_and_targets() {
    let harness = TestHarness::new();
    let service = XpService::new(&harness.ctx);
    let now = Utc::now();

    let inverted = CreateCompetitionRequest {
        kind: CompetitionKind::MostGained,
        target_level: None,
        starts_at: now,
        ends_at: now - Duration::hours(1),
        announcement_channel_id: None,
    };
    assert!(matches!(
        service.create_competition(unique_id(), &inverted).await,
        Err(ServiceError::Validation(_))
    ));

    let no_target = CreateCompetitionRequest {
        kind: CompetitionKind::ReachLevel,
        target_level: None,
        starts_at: now,
        ends_at: now + Duration::hours(1),
        announcement_channel_id: None,
    };
    assert!(matches!(
        service.create_competition(unique_id(), &no_target).await,
        Err(ServiceError::Validation(_))
    ));
}

#[tokio::test]
async fn test_most_gained_full_lifecycle() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let channel = unique_id();
    let (slow, fast) = (unique_id(), unique_id());
    harness.configure_guild(guild, |_| {}).await;
    seed_user(&harness, guild, slow, 500);
    seed_user(&harness, guild, fast, 100);
    harness.gateway.add_member(guild, fast, vec![]);

    let service = XpService::new(&harness.ctx);
    let competition = service
        .create_competition(guild, &request(CompetitionKind::MostGained, None, channel))
        .await
        .unwrap();
    let competition = service.start_competition(competition.id).await.unwrap();
    assert!(competition.started);

    // Both recently-active users were snapshotted
    let entries = harness.ctx.competition_repo().entries(competition.id).await.unwrap();
    assert_eq!(entries.len(), 2);

    let start_announcements = harness.gateway.channel_messages.lock().len();
    assert_eq!(start_announcements, 1);

    // The lower-total user gains more during the window
    flush_gain(&harness, guild, slow, 30).await;
    flush_gain(&harness, guild, fast, 80).await;

    let winner_role = unique_id();
    harness
        .ctx
        .competition_repo()
        .set_rewards(
            competition.id,
            &[XpCompetitionReward {
                competition_id: competition.id,
                placement: 1,
                role_id: Some(winner_role),
                xp: 25,
                currency: 100,
            }],
        )
        .await
        .unwrap();

    let results = service.finalize_competition(competition.id).await.unwrap();
    let first = results.iter().find(|e| e.placement == Some(1)).unwrap();
    assert_eq!(first.user_id, fast);
    assert_eq!(first.current_xp - first.starting_xp, 80);

    // Placement rewards: role granted, currency credited, XP enqueued
    assert!(harness.gateway.roles_of(guild, fast).contains(&winner_role));
    assert_eq!(harness.ledger.balance(guild, fast), 100);
    let queued = harness.ctx.queue().dequeue_batch(10);
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].amount, 25);
    assert_eq!(queued[0].user_id, fast);

    // Podium announcement went out
    let messages = harness.gateway.channel_messages.lock().clone();
    assert!(messages.last().unwrap().1.contains("has ended"));

    // A second finalize is rejected
    assert!(matches!(
        service.finalize_competition(competition.id).await,
        Err(ServiceError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_reach_level_announces_first_achiever_once() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let channel = unique_id();
    let (first, second) = (unique_id(), unique_id());
    harness.configure_guild(guild, |_| {}).await;
    seed_user(&harness, guild, first, 0);
    seed_user(&harness, guild, second, 0);

    let service = XpService::new(&harness.ctx);
    let competition = service
        .create_competition(guild, &request(CompetitionKind::ReachLevel, Some(1), channel))
        .await
        .unwrap();
    service.start_competition(competition.id).await.unwrap();

    // 36 XP = level 1; the first user to cross triggers one announcement
    flush_gain(&harness, guild, first, 40).await;
    flush_gain(&harness, guild, second, 50).await;

    let messages = harness.gateway.channel_messages.lock().clone();
    let achievement_messages: Vec<_> = messages
        .iter()
        .filter(|(_, m)| m.contains("first to reach"))
        .collect();
    assert_eq!(achievement_messages.len(), 1);
    assert!(achievement_messages[0].1.contains(&format!("<@{first}>")));

    // Both achievers carry a timestamp; the earlier one ranks first
    let results = service.finalize_competition(competition.id).await.unwrap();
    let winner = results.iter().find(|e| e.placement == Some(1)).unwrap();
    assert_eq!(winner.user_id, first);
    assert!(winner.achieved_at.is_some());
}

#[tokio::test]
async fn test_late_joiner_counts_only_new_gains() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let veteran = unique_id();
    harness.configure_guild(guild, |_| {}).await;

    let service = XpService::new(&harness.ctx);
    let competition = service
        .create_competition(
            guild,
            &request(CompetitionKind::MostGained, None, unique_id()),
        )
        .await
        .unwrap();
    service.start_competition(competition.id).await.unwrap();

    // A user with a pile of pre-existing XP shows up mid-competition;
    // their entry snapshots at the total after the first flush, so that
    // flush contributes nothing
    seed_user(&harness, guild, veteran, 10_000);
    flush_gain(&harness, guild, veteran, 5).await;

    let entry = harness
        .ctx
        .competition_repo()
        .entry(competition.id, veteran)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.current_xp - entry.starting_xp, 0);

    // Gains from here on count
    flush_gain(&harness, guild, veteran, 7).await;
    let entry = harness
        .ctx
        .competition_repo()
        .entry(competition.id, veteran)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.current_xp - entry.starting_xp, 7);
}

#[tokio::test]
async fn test_lifecycle_conflicts() {
    let harness = TestHarness::new();
    let guild = unique_id();
    harness.configure_guild(guild, |_| {}).await;
    let service = XpService::new(&harness.ctx);

    let competition = service
        .create_competition(
            guild,
            &request(CompetitionKind::HighestTotal, None, unique_id()),
        )
        .await
        .unwrap();

    // Finalizing before start is rejected
    assert!(matches!(
        service.finalize_competition(competition.id).await,
        Err(ServiceError::Conflict(_))
    ));

    service.start_competition(competition.id).await.unwrap();
    assert!(matches!(
        service.start_competition(competition.id).await,
        Err(ServiceError::Conflict(_))
    ));

    assert!(matches!(
        service.start_competition(unique_id()).await,
        Err(ServiceError::NotFound { .. })
    ));
}
