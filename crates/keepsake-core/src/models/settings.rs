//! Application settings model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Application settings.
///
/// A single well-known record: always present after initialization, never
/// user-deletable. New fields must be additive with serde defaults so that
/// records persisted by older versions load cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether past memories are resurfaced
    pub resurfacing_enabled: bool,
    /// The last day a memory was resurfaced (at most one per day)
    pub last_resurfaced_date: Option<NaiveDate>,
    /// Whether reminder notifications are enabled
    pub notifications_enabled: bool,
    /// Morning reminder time, "HH:MM"
    pub morning_reminder_time: Option<String>,
    /// Evening reminder time, "HH:MM"
    pub evening_reminder_time: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resurfacing_enabled: false,
            last_resurfaced_date: None,
            notifications_enabled: false,
            morning_reminder_time: Some("08:00".to_string()),
            evening_reminder_time: Some("20:00".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert!(!settings.resurfacing_enabled);
        assert!(!settings.notifications_enabled);
        assert_eq!(settings.morning_reminder_time.as_deref(), Some("08:00"));
    }

    #[test]
    fn test_settings_merge_unknown_fields() {
        // Records written before a field existed must load with defaults
        let partial = serde_json::json!({ "resurfacing_enabled": true });
        let settings: Settings = serde_json::from_value(partial).unwrap();
        assert!(settings.resurfacing_enabled);
        assert_eq!(settings.evening_reminder_time.as_deref(), Some("20:00"));
    }
}
