//! Reward-role reconciliation: single-user resync with cooldown,
//! guild-wide resync with progress reporting, and the exclusive policy.

use parking_lot::Mutex;

use integration_tests::{unique_id, TestHarness};
use xp_core::{GuildUserXp, Snowflake, XpRoleReward};
use xp_service::{ServiceError, XpRoleSyncService};

fn seed_user(harness: &TestHarness, guild: Snowflake, user: Snowflake, total: i64) {
    let mut record = GuildUserXp::new(guild, user);
    record.total_xp = total;
    harness.user_xp_repo.seed(record);
}

async fn seed_rewards(harness: &TestHarness, guild: Snowflake, rewards: &[(i64, Snowflake)]) {
    for (level, role_id) in rewards {
        harness
            .ctx
            .reward_repo()
            .upsert_role_reward(&XpRoleReward {
                guild_id: guild,
                level: *level,
                role_id: *role_id,
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_resync_user_reconciles_only_reward_roles() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let user = unique_id();
    let (level1_role, level5_role, unrelated_role) = (unique_id(), unique_id(), unique_id());
    harness.configure_guild(guild, |_| {}).await;
    seed_rewards(&harness, guild, &[(1, level1_role), (5, level5_role)]).await;

    // User is level 1 (36 XP) but holds the level-5 reward and an
    // unrelated role
    seed_user(&harness, guild, user, 36);
    harness
        .gateway
        .add_member(guild, user, vec![level5_role, unrelated_role]);

    let (added, removed) = XpRoleSyncService::new(&harness.ctx)
        .resync_user(guild, user)
        .await
        .unwrap();
    assert_eq!(added, 1);
    assert_eq!(removed, 1);

    let roles = harness.gateway.roles_of(guild, user);
    assert!(roles.contains(&level1_role));
    assert!(!roles.contains(&level5_role));
    assert!(roles.contains(&unrelated_role), "non-reward roles are never touched");
}

#[tokio::test]
async fn test_resync_user_cooldown() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let user = unique_id();
    harness.configure_guild(guild, |_| {}).await;
    harness.gateway.add_member(guild, user, vec![]);

    let service = XpRoleSyncService::new(&harness.ctx);
    service.resync_user(guild, user).await.unwrap();
    assert!(matches!(
        service.resync_user(guild, user).await,
        Err(ServiceError::Conflict(_))
    ));

    // A different user is unaffected
    let other = unique_id();
    harness.gateway.add_member(guild, other, vec![]);
    service.resync_user(guild, other).await.unwrap();
}

#[tokio::test]
async fn test_resync_user_skips_departed_member() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let user = unique_id();
    harness.configure_guild(guild, |_| {}).await;
    seed_rewards(&harness, guild, &[(1, unique_id())]).await;
    seed_user(&harness, guild, user, 100);
    // Member never added to the gateway: they left the guild

    let (added, removed) = XpRoleSyncService::new(&harness.ctx)
        .resync_user(guild, user)
        .await
        .unwrap();
    assert_eq!((added, removed), (0, 0));
}

#[tokio::test]
async fn test_exclusive_policy_keeps_highest_only() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let user = unique_id();
    let (level1_role, level5_role) = (unique_id(), unique_id());
    harness
        .configure_guild(guild, |s| {
            s.exclusive_role_rewards = true;
        })
        .await;
    seed_rewards(&harness, guild, &[(1, level1_role), (5, level5_role)]).await;

    // Level 7 (36 * 49 = 1764 XP qualifies past level 5)
    seed_user(&harness, guild, user, 1800);
    harness.gateway.add_member(guild, user, vec![level1_role]);

    XpRoleSyncService::new(&harness.ctx)
        .resync_user(guild, user)
        .await
        .unwrap();

    let roles = harness.gateway.roles_of(guild, user);
    assert!(roles.contains(&level5_role));
    assert!(!roles.contains(&level1_role), "exclusive policy strips lower reward roles");
}

#[tokio::test]
async fn test_resync_guild_reports_progress() {
    let harness = TestHarness::new();
    let guild = unique_id();
    let reward_role = unique_id();
    harness.configure_guild(guild, |_| {}).await;
    seed_rewards(&harness, guild, &[(1, reward_role)]).await;

    for _ in 0..12 {
        let user = unique_id();
        seed_user(&harness, guild, user, 50);
        harness.gateway.add_member(guild, user, vec![]);
    }

    let updates: Mutex<Vec<(usize, usize)>> = Mutex::new(Vec::new());
    let progress = |done: usize, total: usize| {
        updates.lock().push((done, total));
    };

    let report = XpRoleSyncService::new(&harness.ctx)
        .resync_guild(guild, Some(&progress))
        .await
        .unwrap();
    assert_eq!(report.total, 12);
    assert_eq!(report.synced, 12);
    assert_eq!(report.failed, 0);
    assert_eq!(report.roles_added, 12);

    // Progress fires every ten users and at the end
    assert_eq!(updates.lock().as_slice(), &[(10, 12), (12, 12)]);
}
