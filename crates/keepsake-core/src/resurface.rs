//! Memory resurfacing
//!
//! Once per calendar day, surface one randomly chosen past entry to revisit.
//! The day stamp lives in settings so a restart (or a second device after
//! reconciliation) does not resurface twice on the same day.

use rand::seq::SliceRandom;

use crate::db::{
    Database, EntryRepository, LibSqlEntryRepository, LibSqlSettingsRepository, SettingsRepository,
};
use crate::error::Result;
use crate::models::Entry;

/// Pick today's resurfaced memory, if one is due.
///
/// Returns `None` when resurfacing is disabled, already happened today, or
/// there are no past entries to choose from. Only entries dated before
/// today are candidates; an entry from this same day in a past year is
/// preferred when one exists.
pub async fn resurface_memory(db: &Database) -> Result<Option<Entry>> {
    let settings_repo = LibSqlSettingsRepository::new(db.connection());
    let mut settings = settings_repo.load().await?;

    if !settings.resurfacing_enabled {
        return Ok(None);
    }

    let today = chrono::Utc::now().date_naive();
    if settings.last_resurfaced_date == Some(today) {
        return Ok(None);
    }

    let entries = LibSqlEntryRepository::new(db.connection());
    let candidates: Vec<Entry> = entries
        .list_all()
        .await?
        .into_iter()
        .filter(|e| e.entry_date < today)
        .collect();

    let anniversaries: Vec<&Entry> = candidates
        .iter()
        .filter(|e| is_anniversary(e.entry_date, today))
        .collect();

    let mut rng = rand::thread_rng();
    let chosen = if anniversaries.is_empty() {
        candidates.choose(&mut rng).cloned()
    } else {
        anniversaries.choose(&mut rng).map(|e| (*e).clone())
    };
    let Some(chosen) = chosen else {
        return Ok(None);
    };

    settings.last_resurfaced_date = Some(today);
    settings_repo.save(&settings).await?;

    tracing::debug!(entry_id = %chosen.id, entry_date = %chosen.entry_date, "resurfaced memory");
    Ok(Some(chosen))
}

/// Same calendar day in an earlier year
fn is_anniversary(past: chrono::NaiveDate, today: chrono::NaiveDate) -> bool {
    use chrono::Datelike;
    past.month() == today.month() && past.day() == today.day() && past.year() < today.year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Tone};

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn enable_resurfacing(db: &Database) {
        let repo = LibSqlSettingsRepository::new(db.connection());
        let mut settings = repo.load().await.unwrap();
        settings.resurfacing_enabled = true;
        repo.save(&settings).await.unwrap();
    }

    async fn insert_past_entry(db: &Database, days_ago: i64) -> Entry {
        let mut entry = Entry::new(Category::Moment, "A while back", Tone::Neutral);
        entry.entry_date = chrono::Utc::now().date_naive() - chrono::Duration::days(days_ago);
        LibSqlEntryRepository::new(db.connection())
            .upsert(&entry)
            .await
            .unwrap();
        entry
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_disabled_returns_none() {
        let db = setup().await;
        insert_past_entry(&db, 30).await;

        assert!(resurface_memory(&db).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_resurfaces_a_past_entry_once_per_day() {
        let db = setup().await;
        enable_resurfacing(&db).await;
        let past = insert_past_entry(&db, 30).await;

        let first = resurface_memory(&db).await.unwrap();
        assert_eq!(first.unwrap().id, past.id);

        // Same day again: nothing
        assert!(resurface_memory(&db).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prefers_same_day_in_a_past_year() {
        use chrono::Datelike;

        let db = setup().await;
        enable_resurfacing(&db).await;

        insert_past_entry(&db, 10).await;
        let today = chrono::Utc::now().date_naive();
        let last_year = today
            .with_year(today.year() - 1)
            .unwrap_or_else(|| today - chrono::Duration::days(365));
        let mut anniversary = Entry::new(Category::Moment, "One year ago", Tone::Light);
        anniversary.entry_date = last_year;
        LibSqlEntryRepository::new(db.connection())
            .upsert(&anniversary)
            .await
            .unwrap();

        let chosen = resurface_memory(&db).await.unwrap().unwrap();
        assert_eq!(chosen.id, anniversary.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_todays_entries_are_not_candidates() {
        let db = setup().await;
        enable_resurfacing(&db).await;

        let today = Entry::new(Category::Moment, "Just now", Tone::Neutral);
        LibSqlEntryRepository::new(db.connection())
            .upsert(&today)
            .await
            .unwrap();

        assert!(resurface_memory(&db).await.unwrap().is_none());

        // And the day stamp was not consumed by the empty pass
        let settings = LibSqlSettingsRepository::new(db.connection())
            .load()
            .await
            .unwrap();
        assert!(settings.last_resurfaced_date.is_none());
    }
}
