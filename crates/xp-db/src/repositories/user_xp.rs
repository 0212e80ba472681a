//! PostgreSQL implementation of UserXpRepository
//!
//! The flush path uses `update_conditional`: a compare-and-swap on
//! `total_xp` so two workers racing on the same record cannot silently
//! overwrite each other. A lost race surfaces as `DomainError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use xp_core::entities::GuildUserXp;
use xp_core::error::DomainError;
use xp_core::traits::{RepoResult, UserXpRepository};
use xp_core::value_objects::Snowflake;

use crate::models::GuildUserXpModel;

use super::error::{map_db_error, map_unique_violation};

/// PostgreSQL implementation of UserXpRepository
#[derive(Clone)]
pub struct PgUserXpRepository {
    pool: PgPool,
}

impl PgUserXpRepository {
    /// Create a new PgUserXpRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_XP_COLUMNS: &str =
    "guild_id, user_id, total_xp, bonus_xp, last_activity, last_level_up, notification_type";

#[async_trait]
impl UserXpRepository for PgUserXpRepository {
    #[instrument(skip(self))]
    async fn find(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<GuildUserXp>> {
        let result = sqlx::query_as::<_, GuildUserXpModel>(&format!(
            "SELECT {USER_XP_COLUMNS} FROM guild_user_xp WHERE guild_id = $1 AND user_id = $2"
        ))
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(GuildUserXp::from))
    }

    #[instrument(skip(self, record), fields(guild_id = %record.guild_id, user_id = %record.user_id))]
    async fn create(&self, record: &GuildUserXp) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO guild_user_xp (
                guild_id, user_id, total_xp, bonus_xp,
                last_activity, last_level_up, notification_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.guild_id.into_inner())
        .bind(record.user_id.into_inner())
        .bind(record.total_xp)
        .bind(record.bonus_xp)
        .bind(record.last_activity)
        .bind(record.last_level_up)
        .bind(record.notification_type.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                DomainError::Conflict(format!(
                    "XP record already exists for guild {} user {}",
                    record.guild_id, record.user_id
                ))
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self, record), fields(guild_id = %record.guild_id, user_id = %record.user_id))]
    async fn update_conditional(
        &self,
        record: &GuildUserXp,
        expected_total: i64,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE guild_user_xp
            SET total_xp = $3, bonus_xp = $4, last_activity = $5,
                last_level_up = $6, notification_type = $7
            WHERE guild_id = $1 AND user_id = $2 AND total_xp = $8
            "#,
        )
        .bind(record.guild_id.into_inner())
        .bind(record.user_id.into_inner())
        .bind(record.total_xp)
        .bind(record.bonus_xp)
        .bind(record.last_activity)
        .bind(record.last_level_up)
        .bind(record.notification_type.to_string())
        .bind(expected_total)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::Conflict(format!(
                "lost update race for guild {} user {} (expected total {})",
                record.guild_id, record.user_id, expected_total
            )));
        }

        Ok(())
    }

    #[instrument(skip(self, record), fields(guild_id = %record.guild_id, user_id = %record.user_id))]
    async fn upsert(&self, record: &GuildUserXp) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO guild_user_xp (
                guild_id, user_id, total_xp, bonus_xp,
                last_activity, last_level_up, notification_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (guild_id, user_id) DO UPDATE SET
                total_xp = EXCLUDED.total_xp,
                bonus_xp = EXCLUDED.bonus_xp,
                last_activity = EXCLUDED.last_activity,
                last_level_up = EXCLUDED.last_level_up,
                notification_type = EXCLUDED.notification_type
            "#,
        )
        .bind(record.guild_id.into_inner())
        .bind(record.user_id.into_inner())
        .bind(record.total_xp)
        .bind(record.bonus_xp)
        .bind(record.last_activity)
        .bind(record.last_level_up)
        .bind(record.notification_type.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn top_by_xp(
        &self,
        guild_id: Snowflake,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<GuildUserXp>> {
        let limit = limit.clamp(1, 100);
        let offset = offset.max(0);

        let results = sqlx::query_as::<_, GuildUserXpModel>(&format!(
            "SELECT {USER_XP_COLUMNS} FROM guild_user_xp \
             WHERE guild_id = $1 \
             ORDER BY total_xp DESC, user_id \
             LIMIT $2 OFFSET $3"
        ))
        .bind(guild_id.into_inner())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(GuildUserXp::from).collect())
    }

    #[instrument(skip(self))]
    async fn rank_of(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<i64>> {
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT rank FROM (
                SELECT user_id,
                       RANK() OVER (ORDER BY total_xp DESC) AS rank
                FROM guild_user_xp
                WHERE guild_id = $1
            ) ranked
            WHERE user_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn count(&self, guild_id: Snowflake) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM guild_user_xp WHERE guild_id = $1",
        )
        .bind(guild_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn find_inactive_since(
        &self,
        guild_id: Snowflake,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<Vec<GuildUserXp>> {
        let results = sqlx::query_as::<_, GuildUserXpModel>(&format!(
            "SELECT {USER_XP_COLUMNS} FROM guild_user_xp \
             WHERE guild_id = $1 AND last_activity < $2 AND total_xp > 0"
        ))
        .bind(guild_id.into_inner())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(GuildUserXp::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_active_since(
        &self,
        guild_id: Snowflake,
        cutoff: DateTime<Utc>,
    ) -> RepoResult<Vec<GuildUserXp>> {
        let results = sqlx::query_as::<_, GuildUserXpModel>(&format!(
            "SELECT {USER_XP_COLUMNS} FROM guild_user_xp \
             WHERE guild_id = $1 AND last_activity >= $2"
        ))
        .bind(guild_id.into_inner())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(GuildUserXp::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_with_xp(&self, guild_id: Snowflake) -> RepoResult<Vec<GuildUserXp>> {
        let results = sqlx::query_as::<_, GuildUserXpModel>(&format!(
            "SELECT {USER_XP_COLUMNS} FROM guild_user_xp \
             WHERE guild_id = $1 AND total_xp > 0 \
             ORDER BY total_xp DESC"
        ))
        .bind(guild_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(GuildUserXp::from).collect())
    }
}
