//! keepsake-core - Core library for Keepsake
//!
//! This crate contains the shared models, the local libSQL store, and the
//! offline-resilient sync engine used by all Keepsake interfaces.

pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod resurface;
pub mod sync;

pub use error::{Error, Result};
pub use models::{BucketItem, BucketItemId, Entry, EntryId, Person, PersonId, Settings};
pub use sync::{SyncEngine, SyncSession};
