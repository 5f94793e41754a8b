//! Bidirectional reconciliation
//!
//! A full pass over both stores: drain the queue, push records only the
//! local store has, pull records only the remote has. Records present on
//! both sides are left untouched. Used on first sign-in on a new device and
//! as a periodic safety net behind the incremental replication path.

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use crate::db::{
    BucketRepository, EntryRepository, LibSqlBucketRepository, LibSqlEntryRepository,
    LibSqlPersonRepository, LibSqlSettingsRepository, PersonRepository, SettingsRepository,
};
use crate::error::{Error, Result};
use crate::models::SyncOp;

use super::engine::SyncEngine;
use super::{RecordKind, RemoteStore, SyncEvent};

/// Result of a reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Local-only records that reached the remote
    pub pushed: u64,
    /// Remote-only records adopted into the local store
    pub pulled: u64,
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Run a full reconciliation pass.
    ///
    /// Single-flight: a second call while one is running returns
    /// [`Error::SyncInProgress`] instead of starting a concurrent pass.
    /// When offline the pass is a no-op.
    pub async fn reconcile(&self) -> Result<ReconcileSummary> {
        if self
            .reconciling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::SyncInProgress);
        }

        let result = self.reconcile_inner().await;
        self.reconciling.store(false, Ordering::Release);
        result
    }

    async fn reconcile_inner(&self) -> Result<ReconcileSummary> {
        if !self.connectivity.is_online() {
            tracing::debug!("offline, skipping reconciliation");
            return Ok(ReconcileSummary::default());
        }

        // Replay queued mutations first so pending edits reach the remote
        // before the two sides are diffed
        self.drain_queue().await?;

        let mut summary = ReconcileSummary::default();

        self.reconcile_entries(&mut summary).await?;
        self.reconcile_people(&mut summary).await?;
        self.reconcile_bucket_items(&mut summary).await?;
        self.reconcile_settings(&mut summary).await?;

        self.events.publish(SyncEvent::ReconcileCompleted {
            pushed: summary.pushed,
            pulled: summary.pulled,
        });
        tracing::info!(
            pushed = summary.pushed,
            pulled = summary.pulled,
            "reconciliation finished"
        );
        Ok(summary)
    }

    /// Push one local-only record; transient failures fall back to the
    /// queue, terminal failures are surfaced and dropped
    async fn push_op(&self, op: SyncOp, summary: &mut ReconcileSummary) -> Result<()> {
        match self.attempt_op(&op).await? {
            Ok(()) => summary.pushed += 1,
            Err(error) if error.is_retryable() => {
                tracing::warn!(op = %op.describe(), %error, "push failed, enqueueing");
                self.enqueue(op).await?;
            }
            Err(error) => {
                tracing::error!(op = %op.describe(), %error, "push rejected");
                self.events.publish(SyncEvent::ReplicationRejected {
                    op,
                    error: error.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn reconcile_entries(&self, summary: &mut ReconcileSummary) -> Result<()> {
        let remote_entries = self.remote.list_entries(&self.session).await?;
        let remote_ids: HashSet<_> = remote_entries.iter().map(|e| e.id).collect();
        let repo = LibSqlEntryRepository::new(self.db.connection());

        for entry in repo.list_all().await? {
            if !remote_ids.contains(&entry.id) {
                self.push_op(SyncOp::UpsertEntry { id: entry.id }, summary)
                    .await?;
            }
        }

        for entry in remote_entries {
            if repo.get(&entry.id).await?.is_none() {
                repo.upsert(&entry).await?;
                self.record_changed(RecordKind::Entry, entry.id.to_string());
                summary.pulled += 1;
            }
        }
        Ok(())
    }

    async fn reconcile_people(&self, summary: &mut ReconcileSummary) -> Result<()> {
        let remote_people = self.remote.list_people(&self.session).await?;
        let remote_ids: HashSet<_> = remote_people.iter().map(|p| p.id).collect();
        let repo = LibSqlPersonRepository::new(self.db.connection());

        for person in repo.list_all().await? {
            if !remote_ids.contains(&person.id) {
                self.push_op(SyncOp::UpsertPerson { id: person.id }, summary)
                    .await?;
            }
        }

        for person in remote_people {
            if repo.get(&person.id).await?.is_none() {
                repo.upsert(&person).await?;
                self.record_changed(RecordKind::Person, person.id.to_string());
                summary.pulled += 1;
            }
        }
        Ok(())
    }

    async fn reconcile_bucket_items(&self, summary: &mut ReconcileSummary) -> Result<()> {
        let remote_items = self.remote.list_bucket_items(&self.session).await?;
        let remote_ids: HashSet<_> = remote_items.iter().map(|i| i.id).collect();
        let repo = LibSqlBucketRepository::new(self.db.connection());

        for item in repo.list_all().await? {
            if !remote_ids.contains(&item.id) {
                self.push_op(SyncOp::UpsertBucketItem { id: item.id }, summary)
                    .await?;
            }
        }

        for item in remote_items {
            if repo.get(&item.id).await?.is_none() {
                repo.upsert(&item).await?;
                self.record_changed(RecordKind::BucketItem, item.id.to_string());
                summary.pulled += 1;
            }
        }
        Ok(())
    }

    /// Settings converge remote-first: inline replication keeps the remote
    /// copy current, so an existing remote record wins; otherwise the local
    /// record seeds it.
    async fn reconcile_settings(&self, summary: &mut ReconcileSummary) -> Result<()> {
        let repo = LibSqlSettingsRepository::new(self.db.connection());

        match self.remote.fetch_settings(&self.session).await {
            Ok(Some(remote)) => {
                repo.save(&remote).await?;
                self.record_changed(RecordKind::Settings, "settings".to_string());
                summary.pulled += 1;
            }
            Ok(None) => {
                let local = repo.load().await?;
                match self.remote.upsert_settings(&local, &self.session).await {
                    Ok(()) => summary.pushed += 1,
                    Err(error) => tracing::warn!(%error, "settings push failed"),
                }
            }
            Err(error) => tracing::warn!(%error, "settings fetch failed"),
        }
        Ok(())
    }
}
