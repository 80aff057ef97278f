//! Durable-store facade.
//!
//! ARCHITECTURAL RULE: this module is the single point of contact with the
//! external durable store. No other module issues raw storage I/O — the
//! pipeline, reader and wipe paths all go through these traits.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod redis_kv;
pub mod s3;

/// Key prefix for persisted audit records. Prefix-scans over this namespace
/// back the inventory listing and the bulk wipe.
pub const RECORD_PREFIX: &str = "record:";

#[derive(Debug, Error)]
pub enum StorageError {
    /// The addressed object/key does not exist. Distinct from transport
    /// failure so callers can map it to a 404 rather than a retryable error.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage transport failure: {0}")]
    Transport(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// A file accepted for upload: original filename, content type and bytes.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Durable locator returned by a successful blob upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFileRef {
    pub path: String,
}

/// A blob read back from the store, carrying the content type it was
/// stored under so downstream serving can't mislabel it.
#[derive(Debug, Clone)]
pub struct BlobObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// One key-value entry from a prefix scan.
#[derive(Debug, Clone)]
pub struct KeyValueEntry {
    pub key: String,
    pub value: String,
}

/// Binary object storage (uploaded documents and rendered previews).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persists the file under a store-chosen path and returns its locator.
    async fn upload(&self, file: &UploadFile) -> Result<StoredFileRef, StorageError>;

    /// Reads a blob back by its locator. `NotFound` if the path does not
    /// exist, `Transport` for connectivity failures.
    async fn read(&self, path: &str) -> Result<BlobObject, StorageError>;

    /// Deletes a blob. Used only by the bulk wipe, never by the audit
    /// pipeline (committed uploads are not rolled back on failure).
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Key-value metadata storage for serialized audit records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Returns `None` when the key is absent; `Err(Transport)` only for
    /// connectivity failures.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<KeyValueEntry>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Builds the key-value key for an audit record id.
pub fn record_key(id: &uuid::Uuid) -> String {
    format!("{RECORD_PREFIX}{id}")
}
