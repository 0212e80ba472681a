//! Level-transition event
//!
//! Emitted by the background processor when a batch flush moves a user
//! across one or more level boundaries (in either direction), and by
//! administrative set/reset operations. Consumed by the reward manager.

use serde::{Deserialize, Serialize};

use crate::entities::NotificationType;
use crate::value_objects::Snowflake;

/// A user's level changed during a flush or admin operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub old_level: i64,
    pub new_level: i64,
    /// Channel the triggering gain came from, for channel-local announcements
    pub channel_id: Option<Snowflake>,
    pub notification_type: NotificationType,
}

impl LevelChange {
    #[inline]
    pub fn is_level_up(&self) -> bool {
        self.new_level > self.old_level
    }

    #[inline]
    pub fn is_level_down(&self) -> bool {
        self.new_level < self.old_level
    }
}
