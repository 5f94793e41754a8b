//! Sync queue repository implementation
//!
//! The queue is an append-only log. Once enqueued, the only permitted
//! mutation is bumping the retry counter and last error; everything else is
//! insert or remove.

use crate::error::{Error, Result};
use crate::models::{QueueItemId, SyncOp, SyncQueueItem};
use libsql::{params, Connection, Row};

/// Trait for sync queue storage operations (async)
#[allow(async_fn_in_trait)]
pub trait QueueRepository {
    /// Append an operation to the queue
    async fn enqueue(&self, item: &SyncQueueItem) -> Result<()>;

    /// All pending items in enqueue order (FIFO)
    async fn list_pending(&self) -> Result<Vec<SyncQueueItem>>;

    /// Remove a resolved item (applied or abandoned)
    async fn remove(&self, id: &QueueItemId) -> Result<()>;

    /// Record a failed attempt: increment retries, store the error.
    /// Returns the new retry count.
    async fn record_failure(&self, id: &QueueItemId, error: &str) -> Result<u32>;

    /// Number of pending items
    async fn count(&self) -> Result<u64>;

    /// Drop every pending item (maintenance/reset)
    async fn clear(&self) -> Result<()>;
}

/// libSQL implementation of `QueueRepository`
pub struct LibSqlQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn item_from_row(row: &Row) -> Result<SyncQueueItem> {
        let id: String = row.get(0)?;
        let op: String = row.get(1)?;

        Ok(SyncQueueItem {
            id: id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid queue item id: {id}")))?,
            op: serde_json::from_str::<SyncOp>(&op)?,
            enqueued_at: row.get(2)?,
            retries: row.get::<u64>(3)?.try_into().unwrap_or(u32::MAX),
            last_error: row.get(4)?,
        })
    }
}

impl QueueRepository for LibSqlQueueRepository<'_> {
    async fn enqueue(&self, item: &SyncQueueItem) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_queue (id, op, enqueued_at, retries, last_error)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    item.id.as_str(),
                    serde_json::to_string(&item.op)?,
                    item.enqueued_at,
                    i64::from(item.retries),
                    item.last_error.clone()
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<SyncQueueItem>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, op, enqueued_at, retries, last_error
                 FROM sync_queue ORDER BY enqueued_at ASC, id ASC",
                (),
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::item_from_row(&row)?);
        }
        Ok(items)
    }

    async fn remove(&self, id: &QueueItemId) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_queue WHERE id = ?", params![id.as_str()])
            .await?;
        Ok(())
    }

    async fn record_failure(&self, id: &QueueItemId, error: &str) -> Result<u32> {
        self.conn
            .execute(
                "UPDATE sync_queue SET retries = retries + 1, last_error = ? WHERE id = ?",
                params![error, id.as_str()],
            )
            .await?;

        let mut rows = self
            .conn
            .query(
                "SELECT retries FROM sync_queue WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<u64>(0)?.try_into().unwrap_or(u32::MAX)),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM sync_queue", ())
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    async fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM sync_queue", ()).await?;
        Ok(())
    }
}
