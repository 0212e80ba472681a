//! Profile card renderer port
//!
//! Card rendering itself is an external service; the public API resolves
//! the stats and hands this struct over.

use async_trait::async_trait;

use crate::value_objects::Snowflake;

/// Resolved stats for a profile card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCardData {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub username: String,
    pub level: i64,
    pub total_xp: i64,
    /// 1-based leaderboard rank
    pub rank: i64,
    /// XP accumulated within the current level
    pub xp_into_level: i64,
    /// Total XP span of the current level
    pub level_span: i64,
}

/// Renderer errors
#[derive(Debug, thiserror::Error)]
#[error("Card rendering failed: {0}")]
pub struct RendererError(pub String);

/// Image rendering capability for profile cards
#[async_trait]
pub trait CardRenderer: Send + Sync {
    /// Render a profile card, returning encoded image bytes
    async fn render_profile_card(&self, data: &ProfileCardData) -> Result<Vec<u8>, RendererError>;
}
