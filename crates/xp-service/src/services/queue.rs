//! In-memory XP gain queue
//!
//! Unbounded multi-producer queue between the event handlers and the
//! background processor. Enqueue never blocks and never fails; losing
//! queued gains on process crash is an accepted tradeoff.

use std::collections::VecDeque;

use parking_lot::Mutex;

use xp_core::XpGainItem;

/// FIFO queue of pending XP gains
#[derive(Default)]
pub struct XpQueue {
    inner: Mutex<VecDeque<XpGainItem>>,
}

impl XpQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one gain item
    pub fn enqueue(&self, item: XpGainItem) {
        self.inner.lock().push_back(item);
    }

    /// Push several gain items preserving order
    pub fn enqueue_many(&self, items: impl IntoIterator<Item = XpGainItem>) {
        let mut queue = self.inner.lock();
        queue.extend(items);
    }

    /// Pop up to `max` items from the front
    pub fn dequeue_batch(&self, max: usize) -> Vec<XpGainItem> {
        let mut queue = self.inner.lock();
        let take = max.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Number of pending items
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl std::fmt::Debug for XpQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XpQueue").field("len", &self.len()).finish()
    }
}
