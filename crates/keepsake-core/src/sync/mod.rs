//! Offline-resilient synchronization
//!
//! Local writes are authoritative and succeed without the network; the
//! modules here handle everything after: inline replication with bounded
//! retries, the durable fallback queue and its drain loop, blob migration
//! for inline photos, and the full bidirectional reconciler.

mod engine;
mod events;
mod photos;
mod reconcile;
mod remote;
mod retry;
mod session;

pub use engine::{
    DrainSummary, EntryDraft, SyncEngine, MAX_ENTRIES_PER_DAY, MAX_GRATITUDE_PER_DAY,
    MAX_PHOTOS_PER_ENTRY,
};
pub use events::{EventBus, RecordKind, SyncEvent};
pub use photos::{migrate_entry_photos, MigrationOutcome};
pub use reconcile::ReconcileSummary;
pub use remote::{HttpRemoteStore, RemoteError, RemoteResult, RemoteStore};
pub use retry::RetryPolicy;
pub use session::{Connectivity, SyncSession};
