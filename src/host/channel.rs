//! In-process pub/sub channel carrying addon events.
//!
//! DESIGN
//! ======
//! A thin handle over `tokio::sync::broadcast`: every subscriber sees
//! every event in publish order, and emitting never blocks. Slow
//! subscribers lag rather than stall publishers; a lagged receiver skips
//! ahead and the bridge logs the gap.

use tokio::sync::broadcast;
use tracing::debug;

use events::Event;

/// Default event buffer per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Cloneable handle to the addon event channel. All clones publish into
/// and subscribe to the same stream.
#[derive(Clone, Debug)]
pub struct MemoryChannel {
    tx: broadcast::Sender<Event>,
}

impl MemoryChannel {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to every current subscriber. An event with no
    /// subscribers is dropped silently; the channel itself never errors.
    pub fn emit(&self, event: Event) {
        let receivers = self.tx.receiver_count();
        if self.tx.send(event).is_err() {
            debug!(receivers, "channel: event dropped, no subscribers");
        }
    }

    /// Open a new subscription starting at the next published event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
