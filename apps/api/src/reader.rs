//! Record reconstitution: turn a persisted audit back into something a view
//! can display.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::record::AuditRecord;
use crate::resources::{ResourceHandle, ResourceManager};
use crate::storage::{record_key, BlobStore, RecordStore, StorageError};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("no audit record for id {0}")]
    NotFound(Uuid),

    /// The persisted value is not a valid record. Fatal for this id only;
    /// other records are unaffected.
    #[error("audit record {id} is corrupt: {source}")]
    CorruptRecord {
        id: Uuid,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Everything a view needs for one audit: the record plus locally staged
/// handles for both binaries. The caller owns both handles and must release
/// them when the view goes away.
pub struct ReconstitutedView {
    pub record: AuditRecord,
    pub source_handle: ResourceHandle,
    pub preview_handle: ResourceHandle,
}

pub struct AuditReader {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    resources: ResourceManager,
}

impl AuditReader {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        resources: ResourceManager,
    ) -> Self {
        Self {
            records,
            blobs,
            resources,
        }
    }

    /// Loads an audit by id and stages its binaries for display.
    ///
    /// A record whose feedback is still absent loads fine — pending is a
    /// presentation state, not an error.
    pub async fn load(&self, id: Uuid) -> Result<ReconstitutedView, ReadError> {
        let raw = self
            .records
            .get(&record_key(&id))
            .await?
            .ok_or(ReadError::NotFound(id))?;

        let record: AuditRecord =
            serde_json::from_str(&raw).map_err(|source| ReadError::CorruptRecord { id, source })?;

        let source = self.blobs.read(&record.source_document_path).await?;
        let preview = self.blobs.read(&record.preview_image_path).await?;

        let source_handle = self.resources.acquire(
            &record.source_document_path,
            source.bytes,
            &source.content_type,
        );
        let preview_handle = self.resources.acquire(
            &record.preview_image_path,
            preview.bytes,
            &preview.content_type,
        );

        debug!(id = %id, pending = record.is_pending(), "Audit reconstituted");

        Ok(ReconstitutedView {
            record,
            source_handle,
            preview_handle,
        })
    }
}
