//! Data models for keepsake-core

mod bucket;
mod entry;
mod person;
mod queue;
mod settings;

pub use bucket::{BucketItem, BucketItemId};
pub use entry::{Category, Entry, EntryId, PhotoRef, Tone, MAX_CONTENT_LENGTH};
pub use person::{Person, PersonId};
pub use queue::{QueueItemId, SyncOp, SyncQueueItem};
pub use settings::Settings;
