//! Entry repository implementation

use crate::error::{Error, Result};
use crate::models::{Category, Entry, EntryId, PersonId, PhotoRef, Tone};
use libsql::{params, Connection, Row};

/// Trait for entry storage operations (async)
#[allow(async_fn_in_trait)]
pub trait EntryRepository {
    /// Insert or replace an entry, keyed by id
    async fn upsert(&self, entry: &Entry) -> Result<()>;

    /// Get an entry by ID
    async fn get(&self, id: &EntryId) -> Result<Option<Entry>>;

    /// Remove an entry
    async fn delete(&self, id: &EntryId) -> Result<()>;

    /// All entries, newest date first
    async fn list_all(&self) -> Result<Vec<Entry>>;

    /// All entries for a single day, oldest first
    async fn list_for_date(&self, date: chrono::NaiveDate) -> Result<Vec<Entry>>;

    /// All entries within a month given as `YYYY-MM`
    async fn list_for_month(&self, year_month: &str) -> Result<Vec<Entry>>;

    /// All entries referencing the given person
    async fn list_referencing_person(&self, person: &PersonId) -> Result<Vec<Entry>>;

    /// All entries that still carry inline photo payloads
    async fn list_with_inline_photos(&self) -> Result<Vec<Entry>>;
}

/// libSQL implementation of `EntryRepository`
pub struct LibSqlEntryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlEntryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn entry_from_row(row: &Row) -> Result<Entry> {
        let id: String = row.get(0)?;
        let entry_date: String = row.get(2)?;
        let category: String = row.get(3)?;
        let tone: String = row.get(5)?;
        let photos: String = row.get(6)?;
        let tags: String = row.get(7)?;
        let people: String = row.get(8)?;

        Ok(Entry {
            id: id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid entry id: {id}")))?,
            created_at: row.get(1)?,
            entry_date: entry_date
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid entry date: {entry_date}")))?,
            category: enum_from_str(&category),
            content: row.get(4)?,
            tone: enum_from_str(&tone),
            photos: serde_json::from_str::<Vec<PhotoRef>>(&photos)?,
            tags: serde_json::from_str(&tags)?,
            people: serde_json::from_str(&people)?,
            highlighted: row.get::<i32>(9)? != 0,
        })
    }

    async fn collect(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<Entry>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::entry_from_row(&row)?);
        }
        Ok(entries)
    }
}

const SELECT_COLUMNS: &str = "id, created_at, entry_date, category, content, tone, \
                              photos, tags, people, highlighted";

impl EntryRepository for LibSqlEntryRepository<'_> {
    async fn upsert(&self, entry: &Entry) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO entries
                 (id, created_at, entry_date, category, content, tone, photos, tags, people, highlighted)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    entry.id.as_str(),
                    entry.created_at,
                    entry.entry_date.to_string(),
                    enum_to_str(&entry.category),
                    entry.content.clone(),
                    enum_to_str(&entry.tone),
                    serde_json::to_string(&entry.photos)?,
                    serde_json::to_string(&entry.tags)?,
                    serde_json::to_string(&entry.people)?,
                    i32::from(entry.highlighted)
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &EntryId) -> Result<Option<Entry>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SELECT_COLUMNS} FROM entries WHERE id = ?"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::entry_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &EntryId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?", params![id.as_str()])
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Entry>> {
        self.collect(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM entries
                 ORDER BY entry_date DESC, created_at DESC"
            ),
            (),
        )
        .await
    }

    async fn list_for_date(&self, date: chrono::NaiveDate) -> Result<Vec<Entry>> {
        self.collect(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM entries
                 WHERE entry_date = ? ORDER BY created_at ASC"
            ),
            params![date.to_string()],
        )
        .await
    }

    async fn list_for_month(&self, year_month: &str) -> Result<Vec<Entry>> {
        self.collect(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM entries
                 WHERE entry_date LIKE ? ORDER BY entry_date ASC, created_at ASC"
            ),
            params![format!("{year_month}-%")],
        )
        .await
    }

    async fn list_referencing_person(&self, person: &PersonId) -> Result<Vec<Entry>> {
        // The people column is a JSON array of quoted ids
        self.collect(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM entries
                 WHERE people LIKE ? ORDER BY entry_date DESC"
            ),
            params![format!("%\"{person}\"%")],
        )
        .await
    }

    async fn list_with_inline_photos(&self) -> Result<Vec<Entry>> {
        self.collect(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM entries
                 WHERE photos LIKE '%data:%' ORDER BY created_at ASC"
            ),
            (),
        )
        .await
    }
}

/// Serialize an enum tag the way serde renames it (lowercase)
fn enum_to_str<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

/// Parse an enum tag, falling back to the default variant
fn enum_from_str<T: serde::de::DeserializeOwned + Default>(value: &str) -> T {
    serde_json::from_str(&format!("\"{value}\"")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Person;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_and_get() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let mut entry = Entry::new(Category::Win, "Ran 10k", Tone::Light);
        entry.tags.push("running".to_string());
        entry.photos.push(PhotoRef::new("data:image/jpeg;base64,abc"));

        repo.upsert(&entry).await.unwrap();
        let fetched = repo.get(&entry.id).await.unwrap().unwrap();
        assert_eq!(fetched, entry);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_is_idempotent_by_id() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let mut entry = Entry::new(Category::Moment, "First", Tone::Neutral);
        repo.upsert(&entry).await.unwrap();

        entry.content = "Edited".to_string();
        repo.upsert(&entry).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "Edited");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_missing_is_not_found() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let missing = EntryId::new();
        assert!(matches!(
            repo.delete(&missing).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_for_date() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let today = chrono::Utc::now().date_naive();
        let mut yesterday_entry = Entry::new(Category::Thought, "Older", Tone::Neutral);
        yesterday_entry.entry_date = today.pred_opt().unwrap();

        repo.upsert(&Entry::new(Category::Moment, "Today", Tone::Neutral))
            .await
            .unwrap();
        repo.upsert(&yesterday_entry).await.unwrap();

        let todays = repo.list_for_date(today).await.unwrap();
        assert_eq!(todays.len(), 1);
        assert_eq!(todays[0].content, "Today");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_referencing_person() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let ada = Person::new("Ada");
        let mut with_person = Entry::new(Category::Moment, "Lunch with Ada", Tone::Light);
        with_person.people.push(ada.id);
        let without = Entry::new(Category::Moment, "Alone", Tone::Neutral);

        repo.upsert(&with_person).await.unwrap();
        repo.upsert(&without).await.unwrap();

        let referencing = repo.list_referencing_person(&ada.id).await.unwrap();
        assert_eq!(referencing.len(), 1);
        assert_eq!(referencing[0].id, with_person.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_with_inline_photos() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let mut pending = Entry::new(Category::Moment, "Beach", Tone::Light);
        pending.photos.push(PhotoRef::new("data:image/png;base64,xyz"));
        let mut migrated = Entry::new(Category::Moment, "Hike", Tone::Light);
        migrated
            .photos
            .push(PhotoRef::new("https://blobs.example.com/h.jpg"));

        repo.upsert(&pending).await.unwrap();
        repo.upsert(&migrated).await.unwrap();

        let inline = repo.list_with_inline_photos().await.unwrap();
        assert_eq!(inline.len(), 1);
        assert_eq!(inline[0].id, pending.id);
    }
}
