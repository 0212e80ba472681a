//! Chat gateway client port
//!
//! Lookup and side-effect operations against the chat platform. Failures
//! here are external-API failures: callers catch per operation, log with
//! contextual ids, and continue.

use async_trait::async_trait;

use crate::value_objects::Snowflake;

/// Gateway operation errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing permission: {0}")]
    MissingPermission(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Gateway API error: {0}")]
    Api(String),
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// A member currently in a voice channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceChannelMember {
    pub user_id: Snowflake,
    pub is_bot: bool,
    /// Muted in any form (self or server)
    pub muted: bool,
    /// Deafened in any form (self or server)
    pub deafened: bool,
}

impl VoiceChannelMember {
    /// Participating = audible and listening
    #[inline]
    pub fn is_participating(&self) -> bool {
        !self.muted && !self.deafened
    }

    /// Counts toward the voice eligibility quorum
    #[inline]
    pub fn counts_for_quorum(&self) -> bool {
        !self.is_bot && self.is_participating()
    }
}

/// Chat gateway client capability
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Guilds this process currently serves (cache cleanup scope)
    async fn connected_guilds(&self) -> GatewayResult<Vec<Snowflake>>;

    /// Guild display name
    async fn guild_name(&self, guild_id: Snowflake) -> GatewayResult<Option<String>>;

    /// Whether the member is still present in the guild
    async fn member_exists(&self, guild_id: Snowflake, user_id: Snowflake) -> GatewayResult<bool>;

    /// Role ids a member currently holds
    async fn member_roles(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> GatewayResult<Vec<Snowflake>>;

    /// Member display name (nickname or username)
    async fn member_display_name(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> GatewayResult<Option<String>>;

    /// Whether a channel still resolves in the guild
    async fn channel_exists(&self, guild_id: Snowflake, channel_id: Snowflake)
        -> GatewayResult<bool>;

    /// Members currently connected to a voice channel
    async fn voice_channel_members(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> GatewayResult<Vec<VoiceChannelMember>>;

    /// Grant a role to a member
    async fn add_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
    ) -> GatewayResult<()>;

    /// Remove a role from a member
    async fn remove_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
    ) -> GatewayResult<()>;

    /// Send a message to a channel
    async fn send_channel_message(&self, channel_id: Snowflake, content: &str)
        -> GatewayResult<()>;

    /// Send a direct message to a user
    async fn send_direct_message(&self, user_id: Snowflake, content: &str) -> GatewayResult<()>;
}
