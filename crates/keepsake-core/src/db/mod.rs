//! Database layer: connection management, migrations, and repositories

mod bucket_repository;
mod connection;
mod entry_repository;
mod migrations;
mod person_repository;
mod queue_repository;
mod settings_repository;

pub use bucket_repository::{BucketRepository, LibSqlBucketRepository};
pub use connection::Database;
pub use entry_repository::{EntryRepository, LibSqlEntryRepository};
pub use person_repository::{LibSqlPersonRepository, PersonRepository};
pub use queue_repository::{LibSqlQueueRepository, QueueRepository};
pub use settings_repository::{LibSqlSettingsRepository, SettingsRepository};
