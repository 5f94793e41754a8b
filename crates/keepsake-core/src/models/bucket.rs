//! Bucket list item model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for a bucket list item, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketItemId(Uuid);

impl BucketItemId {
    /// Create a new unique bucket item ID using UUID v7
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

impl Default for BucketItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BucketItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BucketItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Something to do before it's too late
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketItem {
    /// Unique identifier
    pub id: BucketItemId,
    /// What to do
    pub content: String,
    /// Whether it has been done
    pub completed: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// When it was completed (Unix ms)
    #[serde(default)]
    pub completed_at: Option<i64>,
}

impl BucketItem {
    /// Create a new, not-yet-completed bucket list item
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: BucketItemId::new(),
            content: content.into().trim().to_string(),
            completed: false,
            created_at: chrono::Utc::now().timestamp_millis(),
            completed_at: None,
        }
    }

    /// Flip completion, stamping or clearing the completion time
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
        self.completed_at = self
            .completed
            .then(|| chrono::Utc::now().timestamp_millis());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_item_new() {
        let item = BucketItem::new("See the northern lights");
        assert!(!item.completed);
        assert!(item.completed_at.is_none());
    }

    #[test]
    fn test_toggle_stamps_completion() {
        let mut item = BucketItem::new("Learn to sail");
        item.toggle();
        assert!(item.completed);
        assert!(item.completed_at.is_some());

        item.toggle();
        assert!(!item.completed);
        assert!(item.completed_at.is_none());
    }
}
