//! Keepsake CLI - capture memories from the terminal
//!
//! Every command works offline; anything that could not reach the remote
//! waits in the sync queue until `keepsake sync` (or connectivity) drains it.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

use keepsake_core::db::{Database, EntryRepository, LibSqlEntryRepository};
use keepsake_core::export::{export_json, import_json};
use keepsake_core::models::{Category, Entry, Tone};
use keepsake_core::resurface::resurface_memory;
use keepsake_core::sync::{Connectivity, EntryDraft, HttpRemoteStore, SyncEngine};
use keepsake_core::{EntryId, PersonId, SyncSession};

#[derive(Parser)]
#[command(name = "keepsake")]
#[command(about = "A local-first memory journal that syncs across devices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,

    /// Quick capture: keepsake "what just happened"
    #[arg(trailing_var_arg = true)]
    memory: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a new entry dated today
    #[command(alias = "new")]
    Add {
        /// Entry content
        content: Vec<String>,
        /// What kind of memory this is
        #[arg(long, value_enum, default_value_t = CliCategory::Moment)]
        category: CliCategory,
        /// Mood tag
        #[arg(long, value_enum, default_value_t = CliTone::Neutral)]
        tone: CliTone,
        /// Free-form tags
        #[arg(long)]
        tag: Vec<String>,
    },
    /// Capture a highlight for a past date
    Highlight {
        /// The date the memory belongs to (YYYY-MM-DD)
        date: NaiveDate,
        /// Entry content
        content: Vec<String>,
    },
    /// List entries
    List {
        /// Only entries for this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry
    Delete {
        /// Entry ID
        id: String,
    },
    /// Manage people
    #[command(subcommand)]
    Person(PersonCommands),
    /// Manage the bucket list
    #[command(subcommand)]
    Bucket(BucketCommands),
    /// Show today's resurfaced memory, if one is due
    Resurface,
    /// Export the whole store as JSON
    Export {
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import a JSON archive
    Import {
        /// Archive path
        path: PathBuf,
    },
    /// Run a full reconciliation against the remote
    Sync,
    /// Show how many operations are waiting to sync
    Status,
    /// Manage the sync queue
    #[command(subcommand)]
    Queue(QueueCommands),
}

#[derive(Subcommand)]
enum PersonCommands {
    /// Add a person
    Add {
        /// Their name
        name: String,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List everyone
    List,
    /// Delete a person, detaching them from entries
    Delete {
        /// Person ID
        id: String,
    },
}

#[derive(Subcommand)]
enum BucketCommands {
    /// Add a bucket list item
    Add {
        /// What to do someday
        content: Vec<String>,
    },
    /// List bucket items
    List,
    /// Toggle an item's completion
    Toggle {
        /// Item ID
        id: String,
    },
    /// Delete an item
    Delete {
        /// Item ID
        id: String,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// Drain pending operations now
    Drain,
    /// Drop every pending operation
    Clear,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum CliCategory {
    Moment,
    Thought,
    Win,
    Gratitude,
}

impl From<CliCategory> for Category {
    fn from(value: CliCategory) -> Self {
        match value {
            CliCategory::Moment => Self::Moment,
            CliCategory::Thought => Self::Thought,
            CliCategory::Win => Self::Win,
            CliCategory::Gratitude => Self::Gratitude,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum CliTone {
    Neutral,
    Light,
    Heavy,
}

impl From<CliTone> for Tone {
    fn from(value: CliTone) -> Self {
        match value {
            CliTone::Neutral => Self::Neutral,
            CliTone::Light => Self::Light,
            CliTone::Heavy => Self::Heavy,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] keepsake_core::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("No content provided")]
    EmptyContent,
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(
        "Sync is not configured. Set KEEPSAKE_REMOTE_URL and KEEPSAKE_OWNER to enable `keepsake sync`."
    )]
    SyncNotConfigured,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("keepsake=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let engine = open_engine(&db_path).await?;

    match cli.command {
        Some(Commands::Add {
            content,
            category,
            tone,
            tag,
        }) => run_add(&engine, &content, category.into(), tone.into(), tag).await?,
        Some(Commands::Highlight { date, content }) => {
            run_highlight(&engine, date, &content).await?;
        }
        Some(Commands::List { date, json }) => run_list(&engine, date, json).await?,
        Some(Commands::Delete { id }) => {
            let id: EntryId = parse_id(&id)?;
            engine.delete_entry(&id).await?;
            println!("{id}");
        }
        Some(Commands::Person(command)) => run_person(&engine, command).await?,
        Some(Commands::Bucket(command)) => run_bucket(&engine, command).await?,
        Some(Commands::Resurface) => run_resurface(&engine).await?,
        Some(Commands::Export { output }) => run_export(&engine, output.as_deref()).await?,
        Some(Commands::Import { path }) => run_import(&engine, &path).await?,
        Some(Commands::Sync) => run_sync(&engine).await?,
        Some(Commands::Status) => {
            let pending = engine.pending_sync_count().await?;
            println!("{pending} operation(s) waiting to sync");
        }
        Some(Commands::Queue(QueueCommands::Drain)) => {
            let summary = engine.drain_queue().await?;
            println!(
                "applied {}, abandoned {}, remaining {}",
                summary.applied, summary.failed, summary.remaining
            );
        }
        Some(Commands::Queue(QueueCommands::Clear)) => {
            engine.clear_queue().await?;
            println!("queue cleared");
        }
        None => {
            // Quick capture mode: keepsake "what just happened"
            if cli.memory.is_empty() {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                println!();
            } else {
                run_add(
                    &engine,
                    &cli.memory,
                    Category::Moment,
                    Tone::Neutral,
                    Vec::new(),
                )
                .await?;
            }
        }
    }

    Ok(())
}

async fn run_add(
    engine: &SyncEngine<HttpRemoteStore>,
    content_parts: &[String],
    category: Category,
    tone: Tone,
    tags: Vec<String>,
) -> Result<(), CliError> {
    let draft = EntryDraft {
        category,
        content: join_content(content_parts)?,
        tone,
        tags,
        ..EntryDraft::default()
    };

    let entry = engine.create_entry(draft).await?;
    println!("{}", entry.id);
    Ok(())
}

async fn run_highlight(
    engine: &SyncEngine<HttpRemoteStore>,
    date: NaiveDate,
    content_parts: &[String],
) -> Result<(), CliError> {
    let draft = EntryDraft {
        content: join_content(content_parts)?,
        ..EntryDraft::default()
    };

    let entry = engine.create_backdated_highlight(date, draft).await?;
    println!("{}", entry.id);
    Ok(())
}

async fn run_list(
    engine: &SyncEngine<HttpRemoteStore>,
    date: Option<NaiveDate>,
    as_json: bool,
) -> Result<(), CliError> {
    let repo = LibSqlEntryRepository::new(engine.database().connection());
    let entries = match date {
        Some(date) => repo.list_for_date(date).await?,
        None => repo.list_all().await?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries).map_err(keepsake_core::Error::from)?);
    } else {
        for entry in &entries {
            println!("{}", format_entry_line(entry));
        }
    }
    Ok(())
}

async fn run_person(
    engine: &SyncEngine<HttpRemoteStore>,
    command: PersonCommands,
) -> Result<(), CliError> {
    use keepsake_core::db::{LibSqlPersonRepository, PersonRepository};

    match command {
        PersonCommands::Add { name, notes } => {
            let person = engine.create_person(&name, None, notes).await?;
            println!("{}", person.id);
        }
        PersonCommands::List => {
            let repo = LibSqlPersonRepository::new(engine.database().connection());
            for person in repo.list_all().await? {
                println!("{}  {}", person.id, person.name);
            }
        }
        PersonCommands::Delete { id } => {
            let id: PersonId = parse_id(&id)?;
            engine.delete_person(&id).await?;
            println!("{id}");
        }
    }
    Ok(())
}

async fn run_bucket(
    engine: &SyncEngine<HttpRemoteStore>,
    command: BucketCommands,
) -> Result<(), CliError> {
    use keepsake_core::db::{BucketRepository, LibSqlBucketRepository};

    match command {
        BucketCommands::Add { content } => {
            let item = engine.add_bucket_item(&join_content(&content)?).await?;
            println!("{}", item.id);
        }
        BucketCommands::List => {
            let repo = LibSqlBucketRepository::new(engine.database().connection());
            for item in repo.list_all().await? {
                let mark = if item.completed { "x" } else { " " };
                println!("[{mark}] {}  {}", item.id, item.content);
            }
        }
        BucketCommands::Toggle { id } => {
            let id = parse_id(&id)?;
            let item = engine.toggle_bucket_item(&id).await?;
            println!("{}", item.id);
        }
        BucketCommands::Delete { id } => {
            let id = parse_id(&id)?;
            engine.delete_bucket_item(&id).await?;
            println!("{id}");
        }
    }
    Ok(())
}

async fn run_resurface(engine: &SyncEngine<HttpRemoteStore>) -> Result<(), CliError> {
    match resurface_memory(engine.database()).await? {
        Some(entry) => println!("{}", format_entry_line(&entry)),
        None => println!("Nothing to resurface today"),
    }
    Ok(())
}

async fn run_export(
    engine: &SyncEngine<HttpRemoteStore>,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let rendered = export_json(engine.database()).await?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }
    Ok(())
}

async fn run_import(engine: &SyncEngine<HttpRemoteStore>, path: &Path) -> Result<(), CliError> {
    let json = std::fs::read_to_string(path)?;
    let summary = import_json(engine.database(), &json).await?;
    println!(
        "imported {} entries, {} people, {} bucket items",
        summary.entries, summary.people, summary.bucket_items
    );
    Ok(())
}

async fn run_sync(engine: &SyncEngine<HttpRemoteStore>) -> Result<(), CliError> {
    if !engine.connectivity().is_online() {
        return Err(CliError::SyncNotConfigured);
    }

    let summary = engine.reconcile().await?;
    println!("pushed {}, pulled {}", summary.pushed, summary.pulled);
    Ok(())
}

fn join_content(parts: &[String]) -> Result<String, CliError> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyContent);
    }
    Ok(trimmed.to_string())
}

fn parse_id<T: std::str::FromStr>(raw: &str) -> Result<T, CliError> {
    raw.parse().map_err(|_| CliError::InvalidId(raw.to_string()))
}

fn format_entry_line(entry: &Entry) -> String {
    let highlight = if entry.highlighted { " *" } else { "" };
    format!(
        "{}  {}  [{:?}] {}{highlight}",
        entry.entry_date,
        entry.id,
        entry.category,
        entry.content
    )
}

fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("KEEPSAKE_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keepsake")
        .join("keepsake.db")
}

struct RemoteConfig {
    url: String,
    owner: String,
}

fn remote_config_from_env() -> Option<RemoteConfig> {
    let url = env::var("KEEPSAKE_REMOTE_URL").ok()?;
    let owner = env::var("KEEPSAKE_OWNER").ok()?;

    if url.is_empty() || owner.is_empty() {
        return None;
    }

    Some(RemoteConfig { url, owner })
}

/// Open the store and build the engine.
///
/// Without remote configuration the engine starts with connectivity off:
/// every mutation still succeeds locally and waits in the queue.
async fn open_engine(path: &Path) -> Result<SyncEngine<HttpRemoteStore>, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Arc::new(Database::open(path).await?);

    match remote_config_from_env() {
        Some(config) => {
            let remote = HttpRemoteStore::new(config.url).map_err(keepsake_core::Error::from)?;
            Ok(SyncEngine::new(db, remote, SyncSession::new(config.owner)))
        }
        None => {
            tracing::debug!("no remote configured, staying offline");
            let remote =
                HttpRemoteStore::new("https://keepsake.invalid").map_err(keepsake_core::Error::from)?;
            Ok(SyncEngine::new(db, remote, SyncSession::new("local"))
                .with_connectivity(Connectivity::new(false)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_content() {
        let parts = vec!["coffee".to_string(), "with".to_string(), "june".to_string()];
        assert_eq!(join_content(&parts).unwrap(), "coffee with june");
        assert!(join_content(&[]).is_err());
        assert!(join_content(&["   ".to_string()]).is_err());
    }

    #[test]
    fn test_resolve_db_path_prefers_cli_flag() {
        let path = resolve_db_path(Some(PathBuf::from("/tmp/test.db")));
        assert_eq!(path, PathBuf::from("/tmp/test.db"));
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id::<EntryId>("not-a-uuid").is_err());
    }
}
