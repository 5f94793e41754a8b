//! Bucket list repository implementation

use crate::error::{Error, Result};
use crate::models::{BucketItem, BucketItemId};
use libsql::{params, Connection, Row};

/// Trait for bucket list storage operations (async)
#[allow(async_fn_in_trait)]
pub trait BucketRepository {
    /// Insert or replace a bucket item, keyed by id
    async fn upsert(&self, item: &BucketItem) -> Result<()>;

    /// Get a bucket item by ID
    async fn get(&self, id: &BucketItemId) -> Result<Option<BucketItem>>;

    /// Remove a bucket item
    async fn delete(&self, id: &BucketItemId) -> Result<()>;

    /// All bucket items, oldest first
    async fn list_all(&self) -> Result<Vec<BucketItem>>;

    /// Bucket items filtered by completion state
    async fn list_by_completion(&self, completed: bool) -> Result<Vec<BucketItem>>;
}

/// libSQL implementation of `BucketRepository`
pub struct LibSqlBucketRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlBucketRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn item_from_row(row: &Row) -> Result<BucketItem> {
        let id: String = row.get(0)?;

        Ok(BucketItem {
            id: id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid bucket item id: {id}")))?,
            content: row.get(1)?,
            completed: row.get::<i32>(2)? != 0,
            created_at: row.get(3)?,
            completed_at: row.get(4)?,
        })
    }

    async fn collect(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<BucketItem>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::item_from_row(&row)?);
        }
        Ok(items)
    }
}

impl BucketRepository for LibSqlBucketRepository<'_> {
    async fn upsert(&self, item: &BucketItem) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO bucket_items
                 (id, content, completed, created_at, completed_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    item.id.as_str(),
                    item.content.clone(),
                    i32::from(item.completed),
                    item.created_at,
                    item.completed_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &BucketItemId) -> Result<Option<BucketItem>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, content, completed, created_at, completed_at
                 FROM bucket_items WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::item_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &BucketItemId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM bucket_items WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<BucketItem>> {
        self.collect(
            "SELECT id, content, completed, created_at, completed_at
             FROM bucket_items ORDER BY created_at ASC",
            (),
        )
        .await
    }

    async fn list_by_completion(&self, completed: bool) -> Result<Vec<BucketItem>> {
        self.collect(
            "SELECT id, content, completed, created_at, completed_at
             FROM bucket_items WHERE completed = ? ORDER BY created_at ASC",
            params![i32::from(completed)],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_and_get() {
        let db = setup().await;
        let repo = LibSqlBucketRepository::new(db.connection());

        let item = BucketItem::new("Visit Kyoto");
        repo.upsert(&item).await.unwrap();

        let fetched = repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_completion() {
        let db = setup().await;
        let repo = LibSqlBucketRepository::new(db.connection());

        let open = BucketItem::new("Learn the cello");
        let mut done = BucketItem::new("Run a marathon");
        done.toggle();

        repo.upsert(&open).await.unwrap();
        repo.upsert(&done).await.unwrap();

        let completed = repo.list_by_completion(true).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, done.id);

        let pending = repo.list_by_completion(false).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, open.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete() {
        let db = setup().await;
        let repo = LibSqlBucketRepository::new(db.connection());

        let item = BucketItem::new("Temporary");
        repo.upsert(&item).await.unwrap();
        repo.delete(&item.id).await.unwrap();

        assert!(repo.get(&item.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&item.id).await,
            Err(Error::NotFound(_))
        ));
    }
}
