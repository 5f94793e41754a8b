//! Remote backend client
//!
//! A thin, idempotent wrapper over the multi-device backend. Every write is
//! keyed by the client-assigned record id plus the session's owner id, so
//! replaying any operation converges to the same remote state.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::{BucketItem, BucketItemId, Entry, EntryId, Person, PersonId, Settings};

use super::SyncSession;

/// Failure taxonomy for remote operations.
///
/// Transient failures are worth retrying with backoff; terminal failures
/// will fail identically on every attempt and must fail fast instead of
/// consuming the retry budget.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Backend-side failure (5xx)
    #[error("server error ({status})")]
    Server { status: u16 },

    /// Backend asked us to slow down
    #[error("rate limited")]
    RateLimited,

    /// Authentication was rejected
    #[error("unauthorized")]
    Unauthorized,

    /// The backend rejected the request itself (4xx)
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be understood
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl RemoteError {
    /// Whether retrying this failure could possibly succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout | Self::Server { .. } | Self::RateLimited => true,
            Self::Unauthorized | Self::Rejected { .. } | Self::InvalidPayload(_) => false,
        }
    }
}

/// Result type alias for remote operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Operations the engine needs from the remote backend.
///
/// Upserts are keyed by record id and replay-safe; deletes are no-ops when
/// the record is already absent; lists are used only by the reconciler;
/// `upload_blob` only by blob migration.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn upsert_entry(&self, entry: &Entry, session: &SyncSession) -> RemoteResult<()>;
    async fn upsert_person(&self, person: &Person, session: &SyncSession) -> RemoteResult<()>;
    async fn upsert_bucket_item(&self, item: &BucketItem, session: &SyncSession)
        -> RemoteResult<()>;
    async fn upsert_settings(&self, settings: &Settings, session: &SyncSession)
        -> RemoteResult<()>;

    async fn delete_entry(&self, id: &EntryId, session: &SyncSession) -> RemoteResult<()>;
    async fn delete_person(&self, id: &PersonId, session: &SyncSession) -> RemoteResult<()>;
    async fn delete_bucket_item(
        &self,
        id: &BucketItemId,
        session: &SyncSession,
    ) -> RemoteResult<()>;

    async fn list_entries(&self, session: &SyncSession) -> RemoteResult<Vec<Entry>>;
    async fn list_people(&self, session: &SyncSession) -> RemoteResult<Vec<Person>>;
    async fn list_bucket_items(&self, session: &SyncSession) -> RemoteResult<Vec<BucketItem>>;
    async fn fetch_settings(&self, session: &SyncSession) -> RemoteResult<Option<Settings>>;

    /// Upload blob bytes, returning the durable URL they are now served from
    async fn upload_blob(
        &self,
        bytes: &[u8],
        content_type: &str,
        session: &SyncSession,
    ) -> RemoteResult<String>;
}

/// Default per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP implementation of [`RemoteStore`]
#[derive(Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    /// Create a client against the given backend endpoint
    pub fn new(base_url: impl Into<String>) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self { base_url, client })
    }

    fn record_url(&self, kind: &str, id: &str) -> String {
        format!("{}/{kind}/{id}", self.base_url)
    }

    fn kind_url(&self, kind: &str) -> String {
        format!("{}/{kind}", self.base_url)
    }

    async fn put_record<T: Serialize>(
        &self,
        kind: &str,
        id: &str,
        record: &T,
        session: &SyncSession,
    ) -> RemoteResult<()> {
        let response = self
            .client
            .put(self.record_url(kind, id))
            .query(&[("owner_id", session.owner_id.as_str())])
            .json(record)
            .send()
            .await
            .map_err(map_transport_error)?;
        check_status(response).await.map(|_| ())
    }

    async fn delete_record(
        &self,
        kind: &str,
        id: &str,
        session: &SyncSession,
    ) -> RemoteResult<()> {
        let response = self
            .client
            .delete(self.record_url(kind, id))
            .query(&[("owner_id", session.owner_id.as_str())])
            .send()
            .await
            .map_err(map_transport_error)?;

        // Deleting an absent record is success by contract
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(response).await.map(|_| ())
    }

    async fn list_records<T: DeserializeOwned>(
        &self,
        kind: &str,
        session: &SyncSession,
    ) -> RemoteResult<Vec<T>> {
        let response = self
            .client
            .get(self.kind_url(kind))
            .query(&[("owner_id", session.owner_id.as_str())])
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| RemoteError::InvalidPayload(e.to_string()))
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn upsert_entry(&self, entry: &Entry, session: &SyncSession) -> RemoteResult<()> {
        self.put_record("entries", &entry.id.as_str(), entry, session)
            .await
    }

    async fn upsert_person(&self, person: &Person, session: &SyncSession) -> RemoteResult<()> {
        self.put_record("people", &person.id.as_str(), person, session)
            .await
    }

    async fn upsert_bucket_item(
        &self,
        item: &BucketItem,
        session: &SyncSession,
    ) -> RemoteResult<()> {
        self.put_record("bucket-items", &item.id.as_str(), item, session)
            .await
    }

    async fn upsert_settings(
        &self,
        settings: &Settings,
        session: &SyncSession,
    ) -> RemoteResult<()> {
        let response = self
            .client
            .put(self.kind_url("settings"))
            .query(&[("owner_id", session.owner_id.as_str())])
            .json(settings)
            .send()
            .await
            .map_err(map_transport_error)?;
        check_status(response).await.map(|_| ())
    }

    async fn delete_entry(&self, id: &EntryId, session: &SyncSession) -> RemoteResult<()> {
        self.delete_record("entries", &id.as_str(), session).await
    }

    async fn delete_person(&self, id: &PersonId, session: &SyncSession) -> RemoteResult<()> {
        self.delete_record("people", &id.as_str(), session).await
    }

    async fn delete_bucket_item(
        &self,
        id: &BucketItemId,
        session: &SyncSession,
    ) -> RemoteResult<()> {
        self.delete_record("bucket-items", &id.as_str(), session)
            .await
    }

    async fn list_entries(&self, session: &SyncSession) -> RemoteResult<Vec<Entry>> {
        self.list_records("entries", session).await
    }

    async fn list_people(&self, session: &SyncSession) -> RemoteResult<Vec<Person>> {
        self.list_records("people", session).await
    }

    async fn list_bucket_items(&self, session: &SyncSession) -> RemoteResult<Vec<BucketItem>> {
        self.list_records("bucket-items", session).await
    }

    async fn fetch_settings(&self, session: &SyncSession) -> RemoteResult<Option<Settings>> {
        let response = self
            .client
            .get(self.kind_url("settings"))
            .query(&[("owner_id", session.owner_id.as_str())])
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status(response).await?;
        response
            .json::<Settings>()
            .await
            .map(Some)
            .map_err(|e| RemoteError::InvalidPayload(e.to_string()))
    }

    async fn upload_blob(
        &self,
        bytes: &[u8],
        content_type: &str,
        session: &SyncSession,
    ) -> RemoteResult<String> {
        #[derive(serde::Deserialize)]
        struct BlobResponse {
            url: String,
        }

        let response = self
            .client
            .post(self.kind_url("blobs"))
            .query(&[("owner_id", session.owner_id.as_str())])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response).await?;
        let payload: BlobResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidPayload(e.to_string()))?;
        Ok(payload.url)
    }
}

fn map_transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Network(error.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    match code {
        401 | 403 => Err(RemoteError::Unauthorized),
        429 => Err(RemoteError::RateLimited),
        400..=499 => {
            let message = response.text().await.unwrap_or_default();
            Err(RemoteError::Rejected {
                status: code,
                message: message.trim().to_string(),
            })
        }
        _ => Err(RemoteError::Server { status: code }),
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RemoteError::InvalidPayload(
            "endpoint must not be empty".to_string(),
        ));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidPayload(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}
