//! Full-store JSON export and import
//!
//! The export is a single self-describing JSON document covering every
//! record plus settings. Import upserts by record id, so importing the same
//! archive twice (or into a store that already holds some of the records)
//! changes nothing the second time.

use serde::{Deserialize, Serialize};

use crate::db::{
    BucketRepository, Database, EntryRepository, LibSqlBucketRepository, LibSqlEntryRepository,
    LibSqlPersonRepository, LibSqlSettingsRepository, PersonRepository, SettingsRepository,
};
use crate::error::Result;
use crate::models::{BucketItem, Entry, Person, Settings};

/// Archive format version written by [`export_store`]
pub const ARCHIVE_VERSION: u32 = 1;

/// A complete snapshot of the local store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archive {
    pub version: u32,
    /// Export timestamp (Unix ms)
    pub exported_at: i64,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub bucket_items: Vec<BucketItem>,
    #[serde(default)]
    pub settings: Settings,
}

/// Counts of what an import touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub entries: usize,
    pub people: usize,
    pub bucket_items: usize,
}

/// Snapshot the entire local store into an [`Archive`]
pub async fn export_store(db: &Database) -> Result<Archive> {
    let entries = LibSqlEntryRepository::new(db.connection()).list_all().await?;
    let people = LibSqlPersonRepository::new(db.connection()).list_all().await?;
    let bucket_items = LibSqlBucketRepository::new(db.connection()).list_all().await?;
    let settings = LibSqlSettingsRepository::new(db.connection()).load().await?;

    Ok(Archive {
        version: ARCHIVE_VERSION,
        exported_at: chrono::Utc::now().timestamp_millis(),
        entries,
        people,
        bucket_items,
        settings,
    })
}

/// Serialize the store to pretty-printed JSON
pub async fn export_json(db: &Database) -> Result<String> {
    let archive = export_store(db).await?;
    Ok(serde_json::to_string_pretty(&archive)?)
}

/// Insert archive records whose ids are unknown to the local store.
///
/// Records are keyed by their client-assigned ids; ids already present are
/// left untouched, so re-importing an archive changes nothing and an import
/// never clobbers local edits. Settings are replaced wholesale.
pub async fn import_store(db: &Database, archive: &Archive) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    let entries = LibSqlEntryRepository::new(db.connection());
    for entry in &archive.entries {
        if entries.get(&entry.id).await?.is_none() {
            entries.upsert(entry).await?;
            summary.entries += 1;
        }
    }

    let people = LibSqlPersonRepository::new(db.connection());
    for person in &archive.people {
        if people.get(&person.id).await?.is_none() {
            people.upsert(person).await?;
            summary.people += 1;
        }
    }

    let bucket = LibSqlBucketRepository::new(db.connection());
    for item in &archive.bucket_items {
        if bucket.get(&item.id).await?.is_none() {
            bucket.upsert(item).await?;
            summary.bucket_items += 1;
        }
    }

    LibSqlSettingsRepository::new(db.connection())
        .save(&archive.settings)
        .await?;

    tracing::info!(
        entries = summary.entries,
        people = summary.people,
        bucket_items = summary.bucket_items,
        "archive imported"
    );
    Ok(summary)
}

/// Parse and import a JSON archive
pub async fn import_json(db: &Database, json: &str) -> Result<ImportSummary> {
    let archive: Archive = serde_json::from_str(json)?;
    import_store(db, &archive).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Tone};
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_export_import_round_trip() {
        let source = setup().await;
        let entries = LibSqlEntryRepository::new(source.connection());
        entries
            .upsert(&Entry::new(Category::Moment, "First snow", Tone::Light))
            .await
            .unwrap();
        let people = LibSqlPersonRepository::new(source.connection());
        people.upsert(&Person::new("June")).await.unwrap();

        let json = export_json(&source).await.unwrap();

        let target = setup().await;
        let summary = import_json(&target, &json).await.unwrap();
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.people, 1);

        let exported_again = export_store(&target).await.unwrap();
        assert_eq!(exported_again.entries.len(), 1);
        assert_eq!(exported_again.entries[0].content, "First snow");
        assert_eq!(exported_again.people[0].name, "June");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_import_twice_is_idempotent() {
        let db = setup().await;
        let entries = LibSqlEntryRepository::new(db.connection());
        entries
            .upsert(&Entry::new(Category::Win, "Ran 10k", Tone::Neutral))
            .await
            .unwrap();

        let json = export_json(&db).await.unwrap();
        let first = import_json(&db, &json).await.unwrap();
        let second = import_json(&db, &json).await.unwrap();

        assert_eq!(first.entries, 0);
        assert_eq!(second.entries, 0);
        assert_eq!(entries.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_import_never_clobbers_local_edits() {
        let db = setup().await;
        let entries = LibSqlEntryRepository::new(db.connection());
        let entry = Entry::new(Category::Moment, "original", Tone::Neutral);
        entries.upsert(&entry).await.unwrap();

        let json = export_json(&db).await.unwrap();

        let mut edited = entry.clone();
        edited.content = "edited afterwards".to_string();
        entries.upsert(&edited).await.unwrap();

        import_json(&db, &json).await.unwrap();

        let kept = entries.get(&entry.id).await.unwrap().unwrap();
        assert_eq!(kept.content, "edited afterwards");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_import_tolerates_missing_sections() {
        let db = setup().await;
        let summary = import_json(&db, r#"{"version":1,"exported_at":0}"#)
            .await
            .unwrap();
        assert_eq!(summary, ImportSummary::default());
    }
}
