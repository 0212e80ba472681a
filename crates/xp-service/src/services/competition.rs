//! XP competition manager
//!
//! Lifecycle: create -> start (snapshot + announce) -> live entry updates
//! driven by flushed XP gains -> finalize (rank, reward, announce,
//! deactivate). ReachLevel competitions record each entrant's first
//! achievement timestamp exactly once, and the very first achievement in
//! a competition triggers a single announcement.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info, instrument, warn};

use xp_core::{
    CompetitionKind, Snowflake, XpCompetition, XpCompetitionEntry, XpGainItem, XpGainSource,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Competition lifecycle and entry bookkeeping
pub struct XpCompetitionManager<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> XpCompetitionManager<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a competition in the scheduled state
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        guild_id: Snowflake,
        kind: CompetitionKind,
        target_level: Option<i64>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        announcement_channel_id: Option<Snowflake>,
    ) -> ServiceResult<XpCompetition> {
        if ends_at <= starts_at {
            return Err(ServiceError::validation("competition must end after it starts"));
        }
        if kind == CompetitionKind::ReachLevel && !target_level.is_some_and(|l| l >= 1) {
            return Err(ServiceError::validation(
                "reach-level competitions need a target level of at least 1",
            ));
        }

        let competition = XpCompetition {
            id: self.ctx.snowflake_generator().generate(),
            guild_id,
            kind,
            target_level,
            starts_at,
            ends_at,
            started: false,
            finalized: false,
            announcement_channel_id,
        };
        self.ctx.competition_repo().create(&competition).await?;
        info!(competition_id = %competition.id, %kind, "competition created");
        Ok(competition)
    }

    /// Start a competition: snapshot recently-active users and announce
    #[instrument(skip(self))]
    pub async fn start(&self, competition_id: Snowflake) -> ServiceResult<XpCompetition> {
        let mut competition = self.require(competition_id).await?;
        if competition.started {
            return Err(ServiceError::conflict("competition already started"));
        }
        if competition.finalized {
            return Err(ServiceError::conflict("competition already finalized"));
        }

        let cutoff =
            Utc::now() - ChronoDuration::days(self.ctx.config().competition_snapshot_days);
        let active = self
            .ctx
            .user_xp_repo()
            .find_active_since(competition.guild_id, cutoff)
            .await?;

        for record in &active {
            let entry =
                XpCompetitionEntry::new(competition.id, record.user_id, record.total_xp);
            self.ctx.competition_repo().upsert_entry(&entry).await?;
        }

        competition.started = true;
        self.ctx.competition_repo().update(&competition).await?;
        info!(
            competition_id = %competition.id,
            entrants = active.len(),
            "competition started"
        );

        self.announce(
            &competition,
            &format!("A {} XP competition has started!", competition.kind),
        )
        .await;
        Ok(competition)
    }

    /// Record a flushed XP gain against every live competition in the
    /// guild. Users first seen mid-competition enter with their current
    /// total, so only XP gained from here on counts for them.
    #[instrument(skip(self))]
    pub async fn record_gain(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        total_xp: i64,
        level: i64,
    ) -> ServiceResult<()> {
        let competitions = self.ctx.competition_repo().active_by_guild(guild_id).await?;
        let now = Utc::now();

        for competition in competitions {
            if !competition.is_live(now) {
                continue;
            }

            let mut entry = match self
                .ctx
                .competition_repo()
                .entry(competition.id, user_id)
                .await?
            {
                Some(entry) => entry,
                None => XpCompetitionEntry::new(competition.id, user_id, total_xp),
            };
            entry.current_xp = total_xp;

            let mut first_achievement = false;
            if competition.kind == CompetitionKind::ReachLevel && entry.achieved_at.is_none() {
                if let Some(target) = competition.target_level {
                    if level >= target {
                        first_achievement =
                            !self.ctx.competition_repo().any_achieved(competition.id).await?;
                        entry.achieved_at = Some(now);
                        debug!(
                            competition_id = %competition.id,
                            user_id = %user_id,
                            target,
                            "target level reached"
                        );
                    }
                }
            }

            self.ctx.competition_repo().upsert_entry(&entry).await?;

            if first_achievement {
                self.announce(
                    &competition,
                    &format!(
                        "<@{user_id}> is the first to reach level {}!",
                        competition.target_level.unwrap_or_default()
                    ),
                )
                .await;
            }
        }
        Ok(())
    }

    /// Finalize: rank entries, persist placements, dispatch placement
    /// rewards, announce the podium, and deactivate.
    #[instrument(skip(self))]
    pub async fn finalize(&self, competition_id: Snowflake) -> ServiceResult<Vec<XpCompetitionEntry>> {
        let mut competition = self.require(competition_id).await?;
        if !competition.started {
            return Err(ServiceError::conflict("competition never started"));
        }
        if competition.finalized {
            return Err(ServiceError::conflict("competition already finalized"));
        }

        let mut entries = self.ctx.competition_repo().entries(competition.id).await?;
        rank_entries(competition.kind, &mut entries);
        for entry in &entries {
            self.ctx.competition_repo().upsert_entry(entry).await?;
        }

        self.dispatch_rewards(&competition, &entries).await;

        competition.finalized = true;
        self.ctx.competition_repo().update(&competition).await?;
        info!(
            competition_id = %competition.id,
            entrants = entries.len(),
            "competition finalized"
        );

        self.announce(&competition, &podium_message(&competition, &entries))
            .await;
        Ok(entries)
    }

    async fn dispatch_rewards(
        &self,
        competition: &XpCompetition,
        entries: &[XpCompetitionEntry],
    ) {
        let rewards = match self.ctx.competition_repo().rewards(competition.id).await {
            Ok(rewards) => rewards,
            Err(e) => {
                warn!(competition_id = %competition.id, error = %e, "placement reward lookup failed");
                return;
            }
        };

        for reward in rewards {
            let Some(entry) = entries.iter().find(|e| e.placement == Some(reward.placement))
            else {
                continue;
            };
            let user_id = entry.user_id;

            if let Some(role_id) = reward.role_id {
                if let Err(e) = self
                    .ctx
                    .gateway()
                    .add_role(competition.guild_id, user_id, role_id)
                    .await
                {
                    warn!(user_id = %user_id, role_id = %role_id, error = %e, "placement role grant failed");
                }
            }
            if reward.xp > 0 {
                self.ctx.queue().enqueue(XpGainItem::new(
                    competition.guild_id,
                    user_id,
                    None,
                    reward.xp,
                    XpGainSource::Manual,
                ));
            }
            if reward.currency > 0 {
                if let Err(e) = self
                    .ctx
                    .ledger()
                    .credit(
                        competition.guild_id,
                        user_id,
                        reward.currency,
                        "competition placement reward",
                    )
                    .await
                {
                    warn!(user_id = %user_id, error = %e, "placement currency credit failed");
                }
            }
        }
    }

    async fn announce(&self, competition: &XpCompetition, content: &str) {
        let Some(channel) = competition.announcement_channel_id else {
            return;
        };
        if let Err(e) = self.ctx.gateway().send_channel_message(channel, content).await {
            warn!(competition_id = %competition.id, error = %e, "competition announcement failed");
        }
    }

    async fn require(&self, competition_id: Snowflake) -> ServiceResult<XpCompetition> {
        self.ctx
            .competition_repo()
            .find(competition_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Competition", competition_id.to_string()))
    }
}

/// Sort entries by the competition's ranking rule and assign 1-based
/// placements in place.
pub fn rank_entries(kind: CompetitionKind, entries: &mut [XpCompetitionEntry]) {
    match kind {
        CompetitionKind::MostGained => {
            entries.sort_by(|a, b| {
                b.gained()
                    .cmp(&a.gained())
                    .then(a.user_id.cmp(&b.user_id))
            });
        }
        CompetitionKind::HighestTotal => {
            entries.sort_by(|a, b| {
                b.current_xp
                    .cmp(&a.current_xp)
                    .then(a.user_id.cmp(&b.user_id))
            });
        }
        CompetitionKind::ReachLevel => {
            // Achievers first, ordered by when they got there; the rest
            // ranked by progress
            entries.sort_by(|a, b| match (a.achieved_at, b.achieved_at) {
                (Some(at_a), Some(at_b)) => at_a.cmp(&at_b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => b.gained().cmp(&a.gained()),
            });
        }
    }

    for (index, entry) in entries.iter_mut().enumerate() {
        entry.placement = Some(index as i32 + 1);
    }
}

fn podium_message(competition: &XpCompetition, entries: &[XpCompetitionEntry]) -> String {
    let mut message = format!("The {} competition has ended!", competition.kind);
    for entry in entries.iter().take(3) {
        if let Some(placement) = entry.placement {
            message.push_str(&format!("\n{placement}. <@{}>", entry.user_id));
        }
    }
    message
}
