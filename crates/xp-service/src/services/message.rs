//! Message XP entry point
//!
//! Called from the message-received event handler. This path must never
//! push an error back toward the gateway: every failure is logged and the
//! message simply earns nothing.

use tracing::{debug, instrument, warn};

use xp_core::{Snowflake, XpGainItem, XpGainSource};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Message-driven XP awards
pub struct XpMessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> XpMessageService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Process one message. Returns true when a gain was enqueued.
    #[instrument(skip(self, author_roles))]
    pub async fn handle_message(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
        author_id: Snowflake,
        author_is_bot: bool,
        author_roles: &[Snowflake],
    ) -> bool {
        if author_is_bot {
            return false;
        }

        match self
            .try_award(guild_id, channel_id, author_id, author_roles)
            .await
        {
            Ok(awarded) => awarded,
            Err(e) => {
                warn!(
                    guild_id = %guild_id,
                    channel_id = %channel_id,
                    user_id = %author_id,
                    error = %e,
                    "message XP processing failed"
                );
                false
            }
        }
    }

    async fn try_award(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
        author_id: Snowflake,
        author_roles: &[Snowflake],
    ) -> ServiceResult<bool> {
        let settings = self.ctx.cache().settings(guild_id).await?;
        if settings.xp_per_message <= 0 {
            return Ok(false);
        }

        if self
            .ctx
            .cache()
            .is_excluded(guild_id, Some(channel_id), author_id, author_roles)
            .await?
        {
            return Ok(false);
        }

        let cooldown_secs = settings.message_cooldown_secs.max(0) as u64;
        if !self
            .ctx
            .cache()
            .try_begin_cooldown(guild_id, author_id, cooldown_secs)
            .await
        {
            return Ok(false);
        }

        let mut amount = settings.xp_per_message;
        let mut source = XpGainSource::Message;
        if settings.first_message_bonus > 0 {
            let record = self.ctx.cache().user_xp(guild_id, author_id).await?;
            if record.is_none() {
                amount += settings.first_message_bonus;
                source = XpGainSource::FirstMessage;
            }
        }

        let multiplier = self
            .ctx
            .cache()
            .effective_multiplier(guild_id, author_id, Some(channel_id), author_roles)
            .await?;
        let amount = ((amount as f64) * multiplier).floor() as i64;
        if amount <= 0 {
            return Ok(false);
        }

        self.ctx.queue().enqueue(XpGainItem::new(
            guild_id,
            author_id,
            Some(channel_id),
            amount,
            source,
        ));
        debug!(guild_id = %guild_id, user_id = %author_id, amount, %source, "message XP enqueued");
        Ok(true)
    }
}
