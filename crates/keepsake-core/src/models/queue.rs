//! Sync queue item model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BucketItemId, EntryId, PersonId};

/// A unique identifier for a queued operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueItemId(Uuid);

impl QueueItemId {
    /// Create a new unique queue item ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for QueueItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A pending outbound operation.
///
/// Upsert variants carry only the record id: the current local state is
/// re-read at drain time, so a drain never overwrites a remote record with
/// a snapshot that predates later local edits. Delete variants carry the
/// target id, which is all the remote needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncOp {
    /// Replicate the current local state of an entry
    UpsertEntry { id: EntryId },
    /// Replicate the current local state of a person
    UpsertPerson { id: PersonId },
    /// Replicate the current local state of a bucket item
    UpsertBucketItem { id: BucketItemId },
    /// Delete an entry remotely
    DeleteEntry { id: EntryId },
    /// Delete a person remotely
    DeletePerson { id: PersonId },
    /// Delete a bucket item remotely
    DeleteBucketItem { id: BucketItemId },
    /// Upload an entry's inline photos and replicate the result
    MigratePhotos { entry_id: EntryId },
}

impl SyncOp {
    /// Short human-readable label for logs and events
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::UpsertEntry { id } => format!("upsert entry {id}"),
            Self::UpsertPerson { id } => format!("upsert person {id}"),
            Self::UpsertBucketItem { id } => format!("upsert bucket item {id}"),
            Self::DeleteEntry { id } => format!("delete entry {id}"),
            Self::DeletePerson { id } => format!("delete person {id}"),
            Self::DeleteBucketItem { id } => format!("delete bucket item {id}"),
            Self::MigratePhotos { entry_id } => format!("migrate photos for entry {entry_id}"),
        }
    }
}

/// A durable record of a pending operation.
///
/// Append-only until resolved: the only permitted mutation is bumping the
/// retry counter and last error after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// Unique identifier
    pub id: QueueItemId,
    /// The operation to replay
    pub op: SyncOp,
    /// Enqueue timestamp (Unix ms), the FIFO drain key
    pub enqueued_at: i64,
    /// Failed attempts so far
    pub retries: u32,
    /// Message from the most recent failure
    pub last_error: Option<String>,
}

impl SyncQueueItem {
    /// Wrap an operation as a fresh queue item
    #[must_use]
    pub fn new(op: SyncOp) -> Self {
        Self {
            id: QueueItemId::new(),
            op,
            enqueued_at: chrono::Utc::now().timestamp_millis(),
            retries: 0,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_op_serde_tagged() {
        let op = SyncOp::UpsertEntry { id: EntryId::new() };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "upsert_entry");

        let back: SyncOp = serde_json::from_value(json).unwrap();
        assert_eq!(op, back);
    }

    #[test]
    fn test_queue_item_new() {
        let item = SyncQueueItem::new(SyncOp::DeleteEntry { id: EntryId::new() });
        assert_eq!(item.retries, 0);
        assert!(item.last_error.is_none());
        assert!(item.enqueued_at > 0);
    }
}
