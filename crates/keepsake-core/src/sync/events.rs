//! Engine event bus
//!
//! Change notifications and sync outcomes are published on a broadcast
//! channel. The UI layer, the pending-count indicator, and anything that
//! cares about unresolved data loss subscribe independently.

use tokio::sync::broadcast;

use crate::models::SyncOp;

/// Record kinds the store notifies changes for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Entry,
    Person,
    BucketItem,
    Settings,
}

/// Events published by the sync engine
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A local record was created, updated, or deleted
    RecordChanged { kind: RecordKind, id: String },
    /// A queued operation reached the remote (or was skipped as stale)
    QueueItemApplied { op: SyncOp },
    /// A queued operation was dropped: retry budget exhausted or terminal
    /// failure. This is the dead-letter signal; the data never reached the
    /// remote.
    QueueItemAbandoned {
        op: SyncOp,
        retries: u32,
        error: String,
    },
    /// An inline replication attempt hit a terminal failure and was not
    /// enqueued; retrying would fail identically
    ReplicationRejected { op: SyncOp, error: String },
    /// A drain pass finished
    DrainCompleted {
        applied: u64,
        failed: u64,
        remaining: u64,
    },
    /// A full reconciliation pass finished
    ReconcileCompleted { pushed: u64, pulled: u64 },
}

/// Broadcast bus for [`SyncEvent`]s.
///
/// Slow or absent subscribers never block the engine; they miss events
/// instead (broadcast semantics).
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Subscribe to all future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Publish an event, ignoring the no-subscriber case
    pub fn publish(&self, event: SyncEvent) {
        self.tx.send(event).ok();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryId;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_publish_and_receive() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SyncEvent::RecordChanged {
            kind: RecordKind::Entry,
            id: EntryId::new().to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            SyncEvent::RecordChanged {
                kind: RecordKind::Entry,
                ..
            }
        ));
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(SyncEvent::DrainCompleted {
            applied: 0,
            failed: 0,
            remaining: 0,
        });
    }
}
