//! PostgreSQL implementation of CompetitionRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use xp_core::entities::{XpCompetition, XpCompetitionEntry, XpCompetitionReward};
use xp_core::error::DomainError;
use xp_core::traits::{CompetitionRepository, RepoResult};
use xp_core::value_objects::Snowflake;

use crate::models::{XpCompetitionEntryModel, XpCompetitionModel, XpCompetitionRewardModel};

use super::error::{map_db_error, map_unique_violation};

/// PostgreSQL implementation of CompetitionRepository
#[derive(Clone)]
pub struct PgCompetitionRepository {
    pool: PgPool,
}

impl PgCompetitionRepository {
    /// Create a new PgCompetitionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COMPETITION_COLUMNS: &str = "id, guild_id, kind, target_level, starts_at, ends_at, \
    started, finalized, announcement_channel_id";

const ENTRY_COLUMNS: &str =
    "competition_id, user_id, starting_xp, current_xp, achieved_at, placement";

#[async_trait]
impl CompetitionRepository for PgCompetitionRepository {
    #[instrument(skip(self, competition), fields(id = %competition.id, guild_id = %competition.guild_id))]
    async fn create(&self, competition: &XpCompetition) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO xp_competitions (
                id, guild_id, kind, target_level, starts_at, ends_at,
                started, finalized, announcement_channel_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(competition.id.into_inner())
        .bind(competition.guild_id.into_inner())
        .bind(competition.kind.to_string())
        .bind(competition.target_level)
        .bind(competition.starts_at)
        .bind(competition.ends_at)
        .bind(competition.started)
        .bind(competition.finalized)
        .bind(
            competition
                .announcement_channel_id
                .map(Snowflake::into_inner),
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                DomainError::Conflict(format!("competition {} already exists", competition.id))
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, id: Snowflake) -> RepoResult<Option<XpCompetition>> {
        let result = sqlx::query_as::<_, XpCompetitionModel>(&format!(
            "SELECT {COMPETITION_COLUMNS} FROM xp_competitions WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(XpCompetition::from))
    }

    #[instrument(skip(self))]
    async fn active_by_guild(&self, guild_id: Snowflake) -> RepoResult<Vec<XpCompetition>> {
        let results = sqlx::query_as::<_, XpCompetitionModel>(&format!(
            "SELECT {COMPETITION_COLUMNS} FROM xp_competitions \
             WHERE guild_id = $1 AND started = TRUE AND finalized = FALSE \
             ORDER BY starts_at"
        ))
        .bind(guild_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(XpCompetition::from).collect())
    }

    #[instrument(skip(self, competition), fields(id = %competition.id))]
    async fn update(&self, competition: &XpCompetition) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE xp_competitions
            SET started = $2, finalized = $3, starts_at = $4, ends_at = $5,
                announcement_channel_id = $6
            WHERE id = $1
            "#,
        )
        .bind(competition.id.into_inner())
        .bind(competition.started)
        .bind(competition.finalized)
        .bind(competition.starts_at)
        .bind(competition.ends_at)
        .bind(
            competition
                .announcement_channel_id
                .map(Snowflake::into_inner),
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::CompetitionNotFound(competition.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn entries(&self, competition_id: Snowflake) -> RepoResult<Vec<XpCompetitionEntry>> {
        let results = sqlx::query_as::<_, XpCompetitionEntryModel>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM xp_competition_entries \
             WHERE competition_id = $1 \
             ORDER BY current_xp - starting_xp DESC"
        ))
        .bind(competition_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(XpCompetitionEntry::from).collect())
    }

    #[instrument(skip(self))]
    async fn entry(
        &self,
        competition_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<XpCompetitionEntry>> {
        let result = sqlx::query_as::<_, XpCompetitionEntryModel>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM xp_competition_entries \
             WHERE competition_id = $1 AND user_id = $2"
        ))
        .bind(competition_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(XpCompetitionEntry::from))
    }

    #[instrument(skip(self, entry), fields(competition_id = %entry.competition_id, user_id = %entry.user_id))]
    async fn upsert_entry(&self, entry: &XpCompetitionEntry) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO xp_competition_entries (
                competition_id, user_id, starting_xp, current_xp, achieved_at, placement
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (competition_id, user_id) DO UPDATE SET
                current_xp = EXCLUDED.current_xp,
                achieved_at = COALESCE(xp_competition_entries.achieved_at, EXCLUDED.achieved_at),
                placement = EXCLUDED.placement
            "#,
        )
        .bind(entry.competition_id.into_inner())
        .bind(entry.user_id.into_inner())
        .bind(entry.starting_xp)
        .bind(entry.current_xp)
        .bind(entry.achieved_at)
        .bind(entry.placement)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn any_achieved(&self, competition_id: Snowflake) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM xp_competition_entries
                WHERE competition_id = $1 AND achieved_at IS NOT NULL
            )
            "#,
        )
        .bind(competition_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn rewards(&self, competition_id: Snowflake) -> RepoResult<Vec<XpCompetitionReward>> {
        let results = sqlx::query_as::<_, XpCompetitionRewardModel>(
            r#"
            SELECT competition_id, placement, role_id, xp, currency
            FROM xp_competition_rewards
            WHERE competition_id = $1
            ORDER BY placement
            "#,
        )
        .bind(competition_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(XpCompetitionReward::from).collect())
    }

    #[instrument(skip(self, rewards), fields(competition_id = %competition_id, count = rewards.len()))]
    async fn set_rewards(
        &self,
        competition_id: Snowflake,
        rewards: &[XpCompetitionReward],
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query("DELETE FROM xp_competition_rewards WHERE competition_id = $1")
            .bind(competition_id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        for reward in rewards {
            sqlx::query(
                r#"
                INSERT INTO xp_competition_rewards (
                    competition_id, placement, role_id, xp, currency
                )
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(competition_id.into_inner())
            .bind(reward.placement)
            .bind(reward.role_id.map(Snowflake::into_inner))
            .bind(reward.xp)
            .bind(reward.currency)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }
}
