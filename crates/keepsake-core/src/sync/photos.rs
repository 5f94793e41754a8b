//! Blob migration: inline photo payloads to durable remote URLs
//!
//! Photos are captured as inline `data:` URLs for immediate responsiveness
//! and migrated opportunistically whenever the owning entry is replicated.
//! Already-durable references are skipped, so re-running migration on a
//! migrated entry issues zero upload calls.

use base64::Engine as _;

use crate::models::{Entry, PhotoRef};

use super::{RemoteStore, SyncSession};

/// What a migration pass did to an entry's photo list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Inline references replaced with durable URLs
    pub uploaded: usize,
    /// Inline references left in place after a failed upload
    pub failed: usize,
}

impl MigrationOutcome {
    /// Whether the entry's photo list changed and needs re-saving
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.uploaded > 0
    }

    /// Whether unresolved inline payloads remain for a later retry pass
    #[must_use]
    pub const fn incomplete(&self) -> bool {
        self.failed > 0
    }
}

/// Upload every inline photo reference on the entry, rewriting each to the
/// durable URL the blob endpoint returns. A failed upload keeps the inline
/// payload so nothing is lost; the entry can still be replicated with
/// whatever is resolved.
pub async fn migrate_entry_photos<R: RemoteStore>(
    entry: &mut Entry,
    remote: &R,
    session: &SyncSession,
) -> MigrationOutcome {
    let mut outcome = MigrationOutcome::default();

    for photo in &mut entry.photos {
        if !photo.is_inline() {
            continue;
        }

        let Some((content_type, bytes)) = decode_data_url(photo.as_str()) else {
            tracing::warn!(entry_id = %entry.id, "undecodable inline photo, leaving as-is");
            outcome.failed += 1;
            continue;
        };

        match remote.upload_blob(&bytes, &content_type, session).await {
            Ok(url) => {
                *photo = PhotoRef::new(url);
                outcome.uploaded += 1;
            }
            Err(error) => {
                tracing::warn!(entry_id = %entry.id, %error, "photo upload failed, keeping inline payload");
                outcome.failed += 1;
            }
        }
    }

    outcome
}

/// Split a base64 `data:` URL into its content type and decoded bytes
fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;

    let content_type = if media_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        media_type.to_string()
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    Some((content_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url() {
        let (content_type, bytes) = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(content_type, "image/png");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_rejects_non_base64_urls() {
        assert!(decode_data_url("https://example.com/a.png").is_none());
        assert!(decode_data_url("data:text/plain,plain-not-base64").is_none());
        assert!(decode_data_url("data:image/png;base64,!!!").is_none());
    }
}
