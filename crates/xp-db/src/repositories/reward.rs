//! PostgreSQL implementation of RewardRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use xp_core::entities::{XpCurrencyReward, XpRoleReward};
use xp_core::traits::{RepoResult, RewardRepository};
use xp_core::value_objects::Snowflake;

use crate::models::{XpCurrencyRewardModel, XpRoleRewardModel};

use super::error::map_db_error;

/// PostgreSQL implementation of RewardRepository
#[derive(Clone)]
pub struct PgRewardRepository {
    pool: PgPool,
}

impl PgRewardRepository {
    /// Create a new PgRewardRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RewardRepository for PgRewardRepository {
    #[instrument(skip(self))]
    async fn role_rewards(&self, guild_id: Snowflake) -> RepoResult<Vec<XpRoleReward>> {
        let results = sqlx::query_as::<_, XpRoleRewardModel>(
            r#"
            SELECT guild_id, level, role_id
            FROM xp_role_rewards
            WHERE guild_id = $1
            ORDER BY level
            "#,
        )
        .bind(guild_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(XpRoleReward::from).collect())
    }

    #[instrument(skip(self, reward), fields(guild_id = %reward.guild_id, level = reward.level))]
    async fn upsert_role_reward(&self, reward: &XpRoleReward) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO xp_role_rewards (guild_id, level, role_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (guild_id, level) DO UPDATE SET role_id = EXCLUDED.role_id
            "#,
        )
        .bind(reward.guild_id.into_inner())
        .bind(reward.level)
        .bind(reward.role_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_role_reward(&self, guild_id: Snowflake, level: i64) -> RepoResult<()> {
        sqlx::query("DELETE FROM xp_role_rewards WHERE guild_id = $1 AND level = $2")
            .bind(guild_id.into_inner())
            .bind(level)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn currency_rewards(&self, guild_id: Snowflake) -> RepoResult<Vec<XpCurrencyReward>> {
        let results = sqlx::query_as::<_, XpCurrencyRewardModel>(
            r#"
            SELECT guild_id, level, amount
            FROM xp_currency_rewards
            WHERE guild_id = $1
            ORDER BY level
            "#,
        )
        .bind(guild_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(XpCurrencyReward::from).collect())
    }

    #[instrument(skip(self, reward), fields(guild_id = %reward.guild_id, level = reward.level))]
    async fn upsert_currency_reward(&self, reward: &XpCurrencyReward) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO xp_currency_rewards (guild_id, level, amount)
            VALUES ($1, $2, $3)
            ON CONFLICT (guild_id, level) DO UPDATE SET amount = EXCLUDED.amount
            "#,
        )
        .bind(reward.guild_id.into_inner())
        .bind(reward.level)
        .bind(reward.amount)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_currency_reward(&self, guild_id: Snowflake, level: i64) -> RepoResult<()> {
        sqlx::query("DELETE FROM xp_currency_rewards WHERE guild_id = $1 AND level = $2")
            .bind(guild_id.into_inner())
            .bind(level)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }
}
