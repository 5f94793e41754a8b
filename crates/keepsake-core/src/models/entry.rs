//! Memory entry model

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PersonId;

/// Maximum entry content length in characters
pub const MAX_CONTENT_LENGTH: usize = 240;

/// A unique identifier for an entry, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Create a new unique entry ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Mood attached to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Neither light nor heavy
    #[default]
    Neutral,
    /// A light, easy memory
    Light,
    /// A heavy or difficult memory
    Heavy,
}

/// What kind of memory an entry captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A moment worth keeping
    #[default]
    Moment,
    /// A passing thought
    Thought,
    /// A small win
    Win,
    /// Something to be grateful for
    Gratitude,
}

/// A photo reference attached to an entry.
///
/// Either an inline `data:` URL captured on-device and pending migration,
/// or a durable `http(s)` URL returned by the blob endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(String);

impl PhotoRef {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Whether this reference still holds inline payload data
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Whether this reference points at durable remote storage
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A memory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier, assigned on-device at creation time
    pub id: EntryId,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// The day this entry logically belongs to
    pub entry_date: NaiveDate,
    /// What kind of memory this is
    pub category: Category,
    /// Free text, capped at [`MAX_CONTENT_LENGTH`] characters
    pub content: String,
    /// Mood tag
    pub tone: Tone,
    /// Attached photos
    #[serde(default)]
    pub photos: Vec<PhotoRef>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// People referenced by this entry
    #[serde(default)]
    pub people: Vec<PersonId>,
    /// Marked as a highlight
    #[serde(default)]
    pub highlighted: bool,
}

impl Entry {
    /// Create a new entry dated today (UTC)
    #[must_use]
    pub fn new(category: Category, content: impl Into<String>, tone: Tone) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: EntryId::new(),
            created_at: now.timestamp_millis(),
            entry_date: now.date_naive(),
            category,
            content: content.into(),
            tone,
            photos: Vec::new(),
            tags: Vec::new(),
            people: Vec::new(),
            highlighted: false,
        }
    }

    /// Whether any attached photo still carries inline payload data
    #[must_use]
    pub fn has_inline_photos(&self) -> bool {
        self.photos.iter().any(PhotoRef::is_inline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_unique() {
        let id1 = EntryId::new();
        let id2 = EntryId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_entry_id_parse() {
        let id = EntryId::new();
        let parsed: EntryId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_entry_new() {
        let entry = Entry::new(Category::Moment, "Coffee on the balcony", Tone::Light);
        assert_eq!(entry.content, "Coffee on the balcony");
        assert_eq!(entry.category, Category::Moment);
        assert!(!entry.highlighted);
        assert!(entry.created_at > 0);
        assert!(entry.photos.is_empty());
    }

    #[test]
    fn test_photo_ref_inline() {
        let inline = PhotoRef::new("data:image/jpeg;base64,/9j/4AAQ");
        assert!(inline.is_inline());
        assert!(!inline.is_durable());

        let durable = PhotoRef::new("https://blobs.example.com/abc.jpg");
        assert!(durable.is_durable());
        assert!(!durable.is_inline());
    }

    #[test]
    fn test_has_inline_photos() {
        let mut entry = Entry::new(Category::Moment, "Sunset", Tone::Neutral);
        assert!(!entry.has_inline_photos());

        entry.photos.push(PhotoRef::new("https://blobs.example.com/a.jpg"));
        assert!(!entry.has_inline_photos());

        entry.photos.push(PhotoRef::new("data:image/png;base64,iVBOR"));
        assert!(entry.has_inline_photos());
    }

    #[test]
    fn test_entry_serde_round_trip() {
        let mut entry = Entry::new(Category::Gratitude, "Thanks", Tone::Neutral);
        entry.tags.push("family".to_string());

        let json = serde_json::to_string(&entry).unwrap();
        let back: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn test_entry_deserialize_ignores_server_fields() {
        // Remote records carry owner/synced-at fields the local store never sees
        let entry = Entry::new(Category::Win, "Shipped it", Tone::Light);
        let mut value = serde_json::to_value(&entry).unwrap();
        value["owner_id"] = serde_json::json!("owner-1");
        value["synced_at"] = serde_json::json!(1_700_000_000_000_i64);

        let back: Entry = serde_json::from_value(value).unwrap();
        assert_eq!(entry, back);
    }
}
