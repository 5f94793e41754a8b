//! Settings repository implementation

use crate::error::Result;
use crate::models::Settings;
use libsql::Connection;

/// Trait for settings storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Load settings from the database, defaulting any missing field
    async fn load(&self) -> Result<Settings>;

    /// Save settings to the database
    async fn save(&self, settings: &Settings) -> Result<()>;
}

/// libSQL implementation of `SettingsRepository`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for LibSqlSettingsRepository<'_> {
    async fn load(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        // Fields persisted by older versions simply stay at their defaults
        if let Ok(value) = self.get_setting("resurfacing_enabled").await {
            settings.resurfacing_enabled = parse_bool(&value);
        }

        if let Ok(value) = self.get_setting("last_resurfaced_date").await {
            settings.last_resurfaced_date = value.parse().ok();
        }

        if let Ok(value) = self.get_setting("notifications_enabled").await {
            settings.notifications_enabled = parse_bool(&value);
        }

        if let Ok(value) = self.get_setting("morning_reminder_time").await {
            settings.morning_reminder_time = Some(value);
        }

        if let Ok(value) = self.get_setting("evening_reminder_time").await {
            settings.evening_reminder_time = Some(value);
        }

        Ok(settings)
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        self.set_setting(
            "resurfacing_enabled",
            if settings.resurfacing_enabled {
                "true"
            } else {
                "false"
            },
        )
        .await?;

        match &settings.last_resurfaced_date {
            Some(date) => {
                self.set_setting("last_resurfaced_date", &date.to_string())
                    .await?;
            }
            None => self.remove_setting("last_resurfaced_date").await?,
        }

        self.set_setting(
            "notifications_enabled",
            if settings.notifications_enabled {
                "true"
            } else {
                "false"
            },
        )
        .await?;

        match &settings.morning_reminder_time {
            Some(time) => self.set_setting("morning_reminder_time", time).await?,
            None => self.remove_setting("morning_reminder_time").await?,
        }

        match &settings.evening_reminder_time {
            Some(time) => self.set_setting("evening_reminder_time", time).await?,
            None => self.remove_setting("evening_reminder_time").await?,
        }

        Ok(())
    }
}

impl LibSqlSettingsRepository<'_> {
    async fn get_setting(&self, key: &str) -> Result<String> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(value)
        } else {
            Err(crate::error::Error::NotFound(key.to_string()))
        }
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn remove_setting(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", [key])
            .await?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
