//! PostgreSQL implementation of ModifierRepository
//!
//! Multipliers, boost events, and exclusions. All guild-scoped and
//! read-mostly; the cache layer sits in front of every read here.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;

use xp_core::entities::{
    XpBoostEvent, XpChannelMultiplier, XpExcludedItem, XpRoleMultiplier,
};
use xp_core::traits::{ModifierRepository, RepoResult};
use xp_core::value_objects::Snowflake;

use crate::models::{
    XpBoostEventModel, XpChannelMultiplierModel, XpExcludedItemModel, XpRoleMultiplierModel,
};

use super::error::map_db_error;

/// PostgreSQL implementation of ModifierRepository
#[derive(Clone)]
pub struct PgModifierRepository {
    pool: PgPool,
}

impl PgModifierRepository {
    /// Create a new PgModifierRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModifierRepository for PgModifierRepository {
    #[instrument(skip(self))]
    async fn channel_multipliers(
        &self,
        guild_id: Snowflake,
    ) -> RepoResult<Vec<XpChannelMultiplier>> {
        let results = sqlx::query_as::<_, XpChannelMultiplierModel>(
            r#"
            SELECT guild_id, channel_id, multiplier
            FROM xp_channel_multipliers
            WHERE guild_id = $1
            "#,
        )
        .bind(guild_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(XpChannelMultiplier::from).collect())
    }

    #[instrument(skip(self, multiplier), fields(guild_id = %multiplier.guild_id, channel_id = %multiplier.channel_id))]
    async fn set_channel_multiplier(&self, multiplier: &XpChannelMultiplier) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO xp_channel_multipliers (guild_id, channel_id, multiplier)
            VALUES ($1, $2, $3)
            ON CONFLICT (guild_id, channel_id) DO UPDATE SET multiplier = EXCLUDED.multiplier
            "#,
        )
        .bind(multiplier.guild_id.into_inner())
        .bind(multiplier.channel_id.into_inner())
        .bind(multiplier.multiplier)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_channel_multiplier(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> RepoResult<()> {
        sqlx::query("DELETE FROM xp_channel_multipliers WHERE guild_id = $1 AND channel_id = $2")
            .bind(guild_id.into_inner())
            .bind(channel_id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn role_multipliers(&self, guild_id: Snowflake) -> RepoResult<Vec<XpRoleMultiplier>> {
        let results = sqlx::query_as::<_, XpRoleMultiplierModel>(
            r#"
            SELECT guild_id, role_id, multiplier
            FROM xp_role_multipliers
            WHERE guild_id = $1
            "#,
        )
        .bind(guild_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(XpRoleMultiplier::from).collect())
    }

    #[instrument(skip(self, multiplier), fields(guild_id = %multiplier.guild_id, role_id = %multiplier.role_id))]
    async fn set_role_multiplier(&self, multiplier: &XpRoleMultiplier) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO xp_role_multipliers (guild_id, role_id, multiplier)
            VALUES ($1, $2, $3)
            ON CONFLICT (guild_id, role_id) DO UPDATE SET multiplier = EXCLUDED.multiplier
            "#,
        )
        .bind(multiplier.guild_id.into_inner())
        .bind(multiplier.role_id.into_inner())
        .bind(multiplier.multiplier)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_role_multiplier(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
    ) -> RepoResult<()> {
        sqlx::query("DELETE FROM xp_role_multipliers WHERE guild_id = $1 AND role_id = $2")
            .bind(guild_id.into_inner())
            .bind(role_id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn boosts(&self, guild_id: Snowflake) -> RepoResult<Vec<XpBoostEvent>> {
        // Ended boosts are invisible; window-start filtering happens in
        // the multiplier resolution, which needs upcoming boosts too.
        let results = sqlx::query_as::<_, XpBoostEventModel>(
            r#"
            SELECT id, guild_id, multiplier, starts_at, ends_at, channel_ids, role_ids
            FROM xp_boost_events
            WHERE guild_id = $1 AND ends_at > $2
            ORDER BY starts_at
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(XpBoostEvent::from).collect())
    }

    #[instrument(skip(self, boost), fields(guild_id = %boost.guild_id, id = %boost.id))]
    async fn create_boost(&self, boost: &XpBoostEvent) -> RepoResult<()> {
        let channel_ids: Vec<i64> = boost.channel_ids.iter().map(|s| s.into_inner()).collect();
        let role_ids: Vec<i64> = boost.role_ids.iter().map(|s| s.into_inner()).collect();

        sqlx::query(
            r#"
            INSERT INTO xp_boost_events (
                id, guild_id, multiplier, starts_at, ends_at, channel_ids, role_ids
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(boost.id.into_inner())
        .bind(boost.guild_id.into_inner())
        .bind(boost.multiplier)
        .bind(boost.starts_at)
        .bind(boost.ends_at)
        .bind(channel_ids)
        .bind(role_ids)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_boost(&self, id: Snowflake) -> RepoResult<()> {
        sqlx::query("DELETE FROM xp_boost_events WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn exclusions(&self, guild_id: Snowflake) -> RepoResult<Vec<XpExcludedItem>> {
        let results = sqlx::query_as::<_, XpExcludedItemModel>(
            r#"
            SELECT guild_id, kind, item_id
            FROM xp_excluded_items
            WHERE guild_id = $1
            "#,
        )
        .bind(guild_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(XpExcludedItem::from).collect())
    }

    #[instrument(skip(self, item), fields(guild_id = %item.guild_id, kind = %item.kind, item_id = %item.item_id))]
    async fn add_exclusion(&self, item: &XpExcludedItem) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO xp_excluded_items (guild_id, kind, item_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (guild_id, kind, item_id) DO NOTHING
            "#,
        )
        .bind(item.guild_id.into_inner())
        .bind(item.kind.to_string())
        .bind(item.item_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, item), fields(guild_id = %item.guild_id, kind = %item.kind, item_id = %item.item_id))]
    async fn remove_exclusion(&self, item: &XpExcludedItem) -> RepoResult<()> {
        sqlx::query(
            "DELETE FROM xp_excluded_items WHERE guild_id = $1 AND kind = $2 AND item_id = $3",
        )
        .bind(item.guild_id.into_inner())
        .bind(item.kind.to_string())
        .bind(item.item_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}
