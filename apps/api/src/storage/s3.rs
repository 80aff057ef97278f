//! S3 / MinIO blob store.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, info};
use uuid::Uuid;

use crate::storage::{BlobObject, BlobStore, StorageError, StoredFileRef, UploadFile};

pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: S3Client, bucket: String) -> Self {
        info!(bucket = %bucket, "S3 blob store initialized");
        Self { client, bucket }
    }

    /// Generates the object key for an upload.
    /// Format: `uploads/{uuid}/{sanitized_filename}` — the uuid keeps
    /// concurrent uploads of identically named files from colliding.
    fn object_key(file: &UploadFile) -> String {
        format!(
            "uploads/{}/{}",
            Uuid::new_v4(),
            sanitize_filename(&file.filename)
        )
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, file: &UploadFile) -> Result<StoredFileRef, StorageError> {
        let key = Self::object_key(file);

        debug!(key = %key, size_bytes = file.bytes.len(), "Uploading blob");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes.to_vec()))
            .content_type(&file.content_type)
            .send()
            .await
            .map_err(|e| StorageError::Transport(format!("put_object failed: {e}")))?;

        info!(key = %key, size_bytes = file.bytes.len(), "Blob uploaded");

        Ok(StoredFileRef { path: key })
    }

    async fn read(&self, path: &str) -> Result<BlobObject, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false)
                {
                    StorageError::NotFound(path.to_string())
                } else {
                    StorageError::Transport(format!("get_object failed: {e}"))
                }
            })?;

        let content_type = response
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Transport(format!("body read failed: {e}")))?;

        Ok(BlobObject {
            bytes: data.into_bytes(),
            content_type,
        })
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::Transport(format!("delete_object failed: {e}")))?;

        debug!(key = %path, "Blob deleted");
        Ok(())
    }
}

/// Sanitizes a client-supplied filename for use as a key component.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();
    if cleaned.is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}
