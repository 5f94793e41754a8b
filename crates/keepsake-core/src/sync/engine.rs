//! The sync engine: local-first mutation routing and queue draining
//!
//! Every mutation writes to the local store first; that write's success is
//! the operation's result. Remote replication happens after the fact and is
//! best-effort: failures land in the durable sync queue and are replayed by
//! `drain_queue`, which is triggered by connectivity regained, app start, a
//! periodic tick, or an explicit request.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::db::{
    BucketRepository, Database, EntryRepository, LibSqlBucketRepository, LibSqlEntryRepository,
    LibSqlPersonRepository, LibSqlQueueRepository, LibSqlSettingsRepository, PersonRepository,
    QueueRepository, SettingsRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    BucketItem, BucketItemId, Category, Entry, EntryId, Person, PersonId, PhotoRef, Settings,
    SyncOp, SyncQueueItem, Tone, MAX_CONTENT_LENGTH,
};

use super::photos::{migrate_entry_photos, MigrationOutcome};
use super::{
    Connectivity, EventBus, RecordKind, RemoteError, RemoteResult, RemoteStore, RetryPolicy,
    SyncEvent, SyncSession,
};

/// Maximum entries captured per day
pub const MAX_ENTRIES_PER_DAY: usize = 3;
/// Maximum gratitude entries per day
pub const MAX_GRATITUDE_PER_DAY: usize = 1;
/// Maximum photos on a single entry
pub const MAX_PHOTOS_PER_ENTRY: usize = 9;

/// Fields for a new entry; id and timestamps are assigned by the engine
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    pub category: Category,
    pub content: String,
    pub tone: Tone,
    pub photos: Vec<PhotoRef>,
    pub tags: Vec<String>,
    pub people: Vec<PersonId>,
}

/// Result of a drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Items that reached the remote (or were skipped as stale)
    pub applied: u64,
    /// Items abandoned after exhausting their budget or failing terminally
    pub failed: u64,
    /// Items still pending after the pass
    pub remaining: u64,
}

/// The local record an operation resolved to at drain time
enum Prepared {
    Entry(Box<Entry>, MigrationOutcome),
    Person(Box<Person>),
    BucketItem(Box<BucketItem>),
    DeleteEntry(EntryId),
    DeletePerson(PersonId),
    DeleteBucketItem(BucketItemId),
    /// The record no longer exists locally; nothing to replay
    Stale,
}

/// Offline-resilient sync engine over a local store and a remote backend
pub struct SyncEngine<R> {
    pub(crate) db: Arc<Database>,
    pub(crate) remote: R,
    pub(crate) session: SyncSession,
    pub(crate) connectivity: Connectivity,
    pub(crate) events: EventBus,
    pub(crate) inline_retry: RetryPolicy,
    pub(crate) drain_retry: RetryPolicy,
    pub(crate) reconciling: AtomicBool,
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Create an engine with the default retry budgets and a fresh
    /// (online) connectivity handle
    pub fn new(db: Arc<Database>, remote: R, session: SyncSession) -> Self {
        Self {
            db,
            remote,
            session,
            connectivity: Connectivity::default(),
            events: EventBus::new(),
            inline_retry: RetryPolicy::inline(),
            drain_retry: RetryPolicy::drain(),
            reconciling: AtomicBool::new(false),
        }
    }

    /// Use an externally shared connectivity handle
    #[must_use]
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Override the retry budgets (inline replication, queue draining)
    #[must_use]
    pub const fn with_retry_policies(mut self, inline: RetryPolicy, drain: RetryPolicy) -> Self {
        self.inline_retry = inline;
        self.drain_retry = drain;
        self
    }

    /// The engine's event bus
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// The connectivity signal this engine consults
    pub const fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// The underlying database
    pub fn database(&self) -> &Database {
        &self.db
    }

    // ---- Entries ----------------------------------------------------------

    /// Capture a new entry dated today.
    ///
    /// Enforces the daily limits and the content cap; the local write is the
    /// operation's result, replication is best-effort afterwards.
    pub async fn create_entry(&self, draft: EntryDraft) -> Result<Entry> {
        let content = validate_content(&draft.content)?;

        let repo = LibSqlEntryRepository::new(self.db.connection());
        let today = chrono::Utc::now().date_naive();
        let todays = repo.list_for_date(today).await?;

        if todays.len() >= MAX_ENTRIES_PER_DAY {
            return Err(Error::DailyLimit(format!(
                "maximum {MAX_ENTRIES_PER_DAY} entries per day"
            )));
        }
        if draft.category == Category::Gratitude {
            let gratitude = todays
                .iter()
                .filter(|e| e.category == Category::Gratitude)
                .count();
            if gratitude >= MAX_GRATITUDE_PER_DAY {
                return Err(Error::DailyLimit(format!(
                    "maximum {MAX_GRATITUDE_PER_DAY} gratitude entry per day"
                )));
            }
        }

        let mut entry = Entry::new(draft.category, content, draft.tone);
        entry.photos = truncate_photos(draft.photos);
        entry.tags = draft.tags;
        entry.people = draft.people;

        repo.upsert(&entry).await?;
        self.record_changed(RecordKind::Entry, entry.id.to_string());

        self.replicate(SyncOp::UpsertEntry { id: entry.id }).await?;
        Ok(entry)
    }

    /// Capture a highlight for a past date, bypassing the daily limits
    pub async fn create_backdated_highlight(
        &self,
        entry_date: chrono::NaiveDate,
        draft: EntryDraft,
    ) -> Result<Entry> {
        let content = validate_content(&draft.content)?;

        let mut entry = Entry::new(draft.category, content, draft.tone);
        entry.entry_date = entry_date;
        entry.highlighted = true;
        entry.photos = truncate_photos(draft.photos);
        entry.tags = draft.tags;
        entry.people = draft.people;

        let repo = LibSqlEntryRepository::new(self.db.connection());
        repo.upsert(&entry).await?;
        self.record_changed(RecordKind::Entry, entry.id.to_string());

        self.replicate(SyncOp::UpsertEntry { id: entry.id }).await?;
        Ok(entry)
    }

    /// Replace an entry with an edited version (whole-record, last write wins)
    pub async fn update_entry(&self, mut entry: Entry) -> Result<Entry> {
        entry.content = validate_content(&entry.content)?;
        entry.photos = truncate_photos(entry.photos);

        let repo = LibSqlEntryRepository::new(self.db.connection());
        let stored = repo
            .get(&entry.id)
            .await?
            .ok_or_else(|| Error::NotFound(entry.id.to_string()))?;

        if entry.category == Category::Gratitude && stored.category != Category::Gratitude {
            let same_day = repo.list_for_date(entry.entry_date).await?;
            let gratitude = same_day
                .iter()
                .filter(|e| e.category == Category::Gratitude && e.id != entry.id)
                .count();
            if gratitude >= MAX_GRATITUDE_PER_DAY {
                return Err(Error::DailyLimit(format!(
                    "maximum {MAX_GRATITUDE_PER_DAY} gratitude entry per day"
                )));
            }
        }

        repo.upsert(&entry).await?;
        self.record_changed(RecordKind::Entry, entry.id.to_string());

        self.replicate(SyncOp::UpsertEntry { id: entry.id }).await?;
        Ok(entry)
    }

    /// Flip an entry's highlight flag
    pub async fn toggle_highlight(&self, id: &EntryId) -> Result<Entry> {
        let repo = LibSqlEntryRepository::new(self.db.connection());
        let mut entry = repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        entry.highlighted = !entry.highlighted;

        repo.upsert(&entry).await?;
        self.record_changed(RecordKind::Entry, entry.id.to_string());

        self.replicate(SyncOp::UpsertEntry { id: entry.id }).await?;
        Ok(entry)
    }

    /// Delete an entry locally and replicate the delete
    pub async fn delete_entry(&self, id: &EntryId) -> Result<()> {
        let repo = LibSqlEntryRepository::new(self.db.connection());
        repo.delete(id).await?;
        self.record_changed(RecordKind::Entry, id.to_string());

        self.replicate(SyncOp::DeleteEntry { id: *id }).await
    }

    // ---- People -----------------------------------------------------------

    /// Add a person
    pub async fn create_person(
        &self,
        name: &str,
        photo: Option<PhotoRef>,
        notes: Option<String>,
    ) -> Result<Person> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("name must not be empty".to_string()));
        }

        let mut person = Person::new(name);
        person.photo = photo;
        person.notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        let repo = LibSqlPersonRepository::new(self.db.connection());
        repo.upsert(&person).await?;
        self.record_changed(RecordKind::Person, person.id.to_string());

        self.replicate(SyncOp::UpsertPerson { id: person.id })
            .await?;
        Ok(person)
    }

    /// Replace a person with an edited version
    pub async fn update_person(&self, mut person: Person) -> Result<Person> {
        let repo = LibSqlPersonRepository::new(self.db.connection());
        repo.get(&person.id)
            .await?
            .ok_or_else(|| Error::NotFound(person.id.to_string()))?;

        person.updated_at = chrono::Utc::now().timestamp_millis();
        repo.upsert(&person).await?;
        self.record_changed(RecordKind::Person, person.id.to_string());

        self.replicate(SyncOp::UpsertPerson { id: person.id })
            .await?;
        Ok(person)
    }

    /// Delete a person, detaching them from every entry that references
    /// them first. Each rewritten entry is itself replicated.
    pub async fn delete_person(&self, id: &PersonId) -> Result<()> {
        let entries = LibSqlEntryRepository::new(self.db.connection());
        let referencing = entries.list_referencing_person(id).await?;

        for mut entry in referencing {
            entry.people.retain(|p| p != id);
            entries.upsert(&entry).await?;
            self.record_changed(RecordKind::Entry, entry.id.to_string());
            self.replicate(SyncOp::UpsertEntry { id: entry.id }).await?;
        }

        let people = LibSqlPersonRepository::new(self.db.connection());
        people.delete(id).await?;
        self.record_changed(RecordKind::Person, id.to_string());

        self.replicate(SyncOp::DeletePerson { id: *id }).await
    }

    // ---- Bucket list ------------------------------------------------------

    /// Add a bucket list item
    pub async fn add_bucket_item(&self, content: &str) -> Result<BucketItem> {
        let content = validate_content(content)?;
        let item = BucketItem::new(content);

        let repo = LibSqlBucketRepository::new(self.db.connection());
        repo.upsert(&item).await?;
        self.record_changed(RecordKind::BucketItem, item.id.to_string());

        self.replicate(SyncOp::UpsertBucketItem { id: item.id })
            .await?;
        Ok(item)
    }

    /// Replace a bucket item with an edited version
    pub async fn update_bucket_item(&self, mut item: BucketItem) -> Result<BucketItem> {
        item.content = validate_content(&item.content)?;

        let repo = LibSqlBucketRepository::new(self.db.connection());
        repo.get(&item.id)
            .await?
            .ok_or_else(|| Error::NotFound(item.id.to_string()))?;

        repo.upsert(&item).await?;
        self.record_changed(RecordKind::BucketItem, item.id.to_string());

        self.replicate(SyncOp::UpsertBucketItem { id: item.id })
            .await?;
        Ok(item)
    }

    /// Flip a bucket item's completion
    pub async fn toggle_bucket_item(&self, id: &BucketItemId) -> Result<BucketItem> {
        let repo = LibSqlBucketRepository::new(self.db.connection());
        let mut item = repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        item.toggle();

        repo.upsert(&item).await?;
        self.record_changed(RecordKind::BucketItem, item.id.to_string());

        self.replicate(SyncOp::UpsertBucketItem { id: item.id })
            .await?;
        Ok(item)
    }

    /// Delete a bucket item locally and replicate the delete
    pub async fn delete_bucket_item(&self, id: &BucketItemId) -> Result<()> {
        let repo = LibSqlBucketRepository::new(self.db.connection());
        repo.delete(id).await?;
        self.record_changed(RecordKind::BucketItem, id.to_string());

        self.replicate(SyncOp::DeleteBucketItem { id: *id }).await
    }

    // ---- Settings ---------------------------------------------------------

    /// Load the settings record (always present, missing fields defaulted)
    pub async fn load_settings(&self) -> Result<Settings> {
        LibSqlSettingsRepository::new(self.db.connection())
            .load()
            .await
    }

    /// Save settings and replicate best-effort.
    ///
    /// Settings have no queue operation; they also converge through the
    /// reconciler.
    pub async fn update_settings(&self, settings: &Settings) -> Result<()> {
        LibSqlSettingsRepository::new(self.db.connection())
            .save(settings)
            .await?;
        self.record_changed(RecordKind::Settings, "settings".to_string());

        if self.connectivity.is_online() {
            if let Err(error) = self
                .inline_retry
                .run(|| self.remote.upsert_settings(settings, &self.session))
                .await
            {
                tracing::warn!(%error, "settings replication failed");
            }
        }
        Ok(())
    }

    // ---- Queue ------------------------------------------------------------

    /// Number of operations waiting to reach the remote
    pub async fn pending_sync_count(&self) -> Result<u64> {
        LibSqlQueueRepository::new(self.db.connection())
            .count()
            .await
    }

    /// Drop every pending operation (maintenance/reset)
    pub async fn clear_queue(&self) -> Result<()> {
        LibSqlQueueRepository::new(self.db.connection())
            .clear()
            .await
    }

    /// Mark the device online and drain whatever accumulated while offline
    pub async fn connectivity_regained(&self) -> Result<DrainSummary> {
        self.connectivity.set_online(true);
        self.drain_queue().await
    }

    /// Replay all pending operations in enqueue order.
    ///
    /// Each item re-reads the current local state, so a drain never pushes
    /// a snapshot that predates later local edits. Failed attempts bump the
    /// item's persisted retry counter; the item is abandoned (removed, error
    /// recorded, dead-letter event) exactly when the counter reaches the
    /// drain budget, or immediately on a terminal failure.
    pub async fn drain_queue(&self) -> Result<DrainSummary> {
        let queue = LibSqlQueueRepository::new(self.db.connection());
        let items = queue.list_pending().await?;

        let mut summary = DrainSummary::default();

        for item in items {
            match self.drain_item(&queue, &item).await? {
                Ok(()) => summary.applied += 1,
                Err(()) => summary.failed += 1,
            }
        }

        summary.remaining = queue.count().await?;
        self.events.publish(SyncEvent::DrainCompleted {
            applied: summary.applied,
            failed: summary.failed,
            remaining: summary.remaining,
        });
        tracing::info!(
            applied = summary.applied,
            failed = summary.failed,
            remaining = summary.remaining,
            "queue drain finished"
        );
        Ok(summary)
    }

    /// Process one queue item to resolution. `Ok(Ok(()))` applied,
    /// `Ok(Err(()))` abandoned; outer errors are local-store failures that
    /// abort the whole drain.
    async fn drain_item(
        &self,
        queue: &LibSqlQueueRepository<'_>,
        item: &SyncQueueItem,
    ) -> Result<std::result::Result<(), ()>> {
        loop {
            match self.attempt_op(&item.op).await? {
                Ok(()) => {
                    queue.remove(&item.id).await?;
                    self.events.publish(SyncEvent::QueueItemApplied {
                        op: item.op.clone(),
                    });
                    return Ok(Ok(()));
                }
                Err(error) => {
                    let retries = queue.record_failure(&item.id, &error.to_string()).await?;
                    let exhausted = retries >= self.drain_retry.max_attempts;

                    if exhausted || !error.is_retryable() {
                        queue.remove(&item.id).await?;
                        tracing::error!(
                            op = %item.op.describe(),
                            retries,
                            %error,
                            "abandoning queued operation"
                        );
                        self.events.publish(SyncEvent::QueueItemAbandoned {
                            op: item.op.clone(),
                            retries,
                            error: error.to_string(),
                        });
                        return Ok(Err(()));
                    }

                    tokio::time::sleep(self.drain_retry.delay_for(retries - 1)).await;
                }
            }
        }
    }

    /// One replay attempt: re-read local state, then one remote call
    pub(super) async fn attempt_op(&self, op: &SyncOp) -> Result<RemoteResult<()>> {
        let prepared = self.prepare_op(op).await?;

        if matches!(prepared, Prepared::Stale) {
            // Deleted locally between enqueue and drain; the delete op (if
            // any) speaks for itself
            tracing::debug!(op = %op.describe(), "skipping stale queued operation");
            return Ok(Ok(()));
        }

        let sent = self.send_prepared(&prepared).await;
        if sent.is_err() {
            return Ok(sent);
        }

        // An entry replicated with unresolved photos still needs a later
        // migration pass
        if let Prepared::Entry(entry, outcome) = &prepared {
            if outcome.incomplete() {
                match op {
                    SyncOp::MigratePhotos { .. } => {
                        return Ok(Err(RemoteError::Network(
                            "one or more photo uploads failed".to_string(),
                        )));
                    }
                    _ => {
                        self.enqueue(SyncOp::MigratePhotos { entry_id: entry.id })
                            .await?;
                    }
                }
            }
        }

        Ok(Ok(()))
    }

    /// Resolve an operation against the current local state, running blob
    /// migration for entry upserts
    async fn prepare_op(&self, op: &SyncOp) -> Result<Prepared> {
        match op {
            SyncOp::UpsertEntry { id } | SyncOp::MigratePhotos { entry_id: id } => {
                let repo = LibSqlEntryRepository::new(self.db.connection());
                let Some(mut entry) = repo.get(id).await? else {
                    return Ok(Prepared::Stale);
                };

                let outcome = migrate_entry_photos(&mut entry, &self.remote, &self.session).await;
                if outcome.changed() {
                    repo.upsert(&entry).await?;
                    self.record_changed(RecordKind::Entry, entry.id.to_string());
                }
                Ok(Prepared::Entry(Box::new(entry), outcome))
            }
            SyncOp::UpsertPerson { id } => {
                let repo = LibSqlPersonRepository::new(self.db.connection());
                match repo.get(id).await? {
                    Some(person) => Ok(Prepared::Person(Box::new(person))),
                    None => Ok(Prepared::Stale),
                }
            }
            SyncOp::UpsertBucketItem { id } => {
                let repo = LibSqlBucketRepository::new(self.db.connection());
                match repo.get(id).await? {
                    Some(item) => Ok(Prepared::BucketItem(Box::new(item))),
                    None => Ok(Prepared::Stale),
                }
            }
            SyncOp::DeleteEntry { id } => Ok(Prepared::DeleteEntry(*id)),
            SyncOp::DeletePerson { id } => Ok(Prepared::DeletePerson(*id)),
            SyncOp::DeleteBucketItem { id } => Ok(Prepared::DeleteBucketItem(*id)),
        }
    }

    /// The single remote call for a prepared operation
    async fn send_prepared(&self, prepared: &Prepared) -> RemoteResult<()> {
        match prepared {
            Prepared::Entry(entry, _) => self.remote.upsert_entry(entry, &self.session).await,
            Prepared::Person(person) => self.remote.upsert_person(person, &self.session).await,
            Prepared::BucketItem(item) => {
                self.remote.upsert_bucket_item(item, &self.session).await
            }
            Prepared::DeleteEntry(id) => self.remote.delete_entry(id, &self.session).await,
            Prepared::DeletePerson(id) => self.remote.delete_person(id, &self.session).await,
            Prepared::DeleteBucketItem(id) => {
                self.remote.delete_bucket_item(id, &self.session).await
            }
            Prepared::Stale => Ok(()),
        }
    }

    /// Run a migration pass over every entry still holding inline photos.
    /// Returns the number of entries processed.
    pub async fn migrate_pending_photos(&self) -> Result<usize> {
        let repo = LibSqlEntryRepository::new(self.db.connection());
        let pending = repo.list_with_inline_photos().await?;
        let count = pending.len();

        for entry in pending {
            self.replicate(SyncOp::UpsertEntry { id: entry.id }).await?;
        }
        Ok(count)
    }

    // ---- Replication ------------------------------------------------------

    /// Attempt replication after a local write: skip straight to the queue
    /// when offline, otherwise retry inline within the small budget and
    /// enqueue on transient failure. Terminal failures are not enqueued.
    async fn replicate(&self, op: SyncOp) -> Result<()> {
        if !self.connectivity.is_online() {
            return self.enqueue(op).await;
        }

        let prepared = self.prepare_op(&op).await?;
        if matches!(prepared, Prepared::Stale) {
            return Ok(());
        }

        match self
            .inline_retry
            .run(|| self.send_prepared(&prepared))
            .await
        {
            Ok(()) => {
                if let Prepared::Entry(entry, outcome) = &prepared {
                    if outcome.incomplete() {
                        self.enqueue(SyncOp::MigratePhotos { entry_id: entry.id })
                            .await?;
                    }
                }
                Ok(())
            }
            Err(error) if error.is_retryable() => {
                tracing::warn!(op = %op.describe(), %error, "replication failed, enqueueing");
                self.enqueue(op).await
            }
            Err(error) => {
                tracing::error!(op = %op.describe(), %error, "replication rejected");
                self.events.publish(SyncEvent::ReplicationRejected {
                    op,
                    error: error.to_string(),
                });
                Ok(())
            }
        }
    }

    pub(super) async fn enqueue(&self, op: SyncOp) -> Result<()> {
        let item = SyncQueueItem::new(op);
        LibSqlQueueRepository::new(self.db.connection())
            .enqueue(&item)
            .await?;
        tracing::debug!(op = %item.op.describe(), "operation enqueued");
        Ok(())
    }

    pub(super) fn record_changed(&self, kind: RecordKind, id: String) {
        self.events.publish(SyncEvent::RecordChanged { kind, id });
    }
}

fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("content must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_CONTENT_LENGTH {
        return Err(Error::InvalidInput(format!(
            "content must be {MAX_CONTENT_LENGTH} characters or less"
        )));
    }
    Ok(trimmed.to_string())
}

fn truncate_photos(mut photos: Vec<PhotoRef>) -> Vec<PhotoRef> {
    photos.truncate(MAX_PHOTOS_PER_ENTRY);
    photos
}
