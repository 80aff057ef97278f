//! In-memory storage backends for tests, with a shared call log so tests can
//! assert the exact order of durable-store side effects.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::storage::{
    BlobObject, BlobStore, KeyValueEntry, RecordStore, StorageError, StoredFileRef, UploadFile,
};

/// Records every facade call as a short label, e.g. `upload(resume.pdf)` or
/// `set(record:<id>)`.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, (Bytes, String)>>>,
    log: CallLog,
}

impl MemoryBlobStore {
    pub fn with_log(log: CallLog) -> Self {
        Self {
            blobs: Arc::default(),
            log,
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, file: &UploadFile) -> Result<StoredFileRef, StorageError> {
        self.log.push(format!("upload({})", file.filename));
        let path = format!("uploads/{}/{}", Uuid::new_v4(), file.filename);
        self.blobs.lock().unwrap().insert(
            path.clone(),
            (file.bytes.clone(), file.content_type.clone()),
        );
        Ok(StoredFileRef { path })
    }

    async fn read(&self, path: &str) -> Result<BlobObject, StorageError> {
        self.log.push(format!("read({path})"));
        self.blobs
            .lock()
            .unwrap()
            .get(path)
            .map(|(bytes, content_type)| BlobObject {
                bytes: bytes.clone(),
                content_type: content_type.clone(),
            })
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.log.push(format!("delete({path})"));
        self.blobs.lock().unwrap().remove(path);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<HashMap<String, String>>>,
    log: CallLog,
}

impl MemoryRecordStore {
    pub fn with_log(log: CallLog) -> Self {
        Self {
            records: Arc::default(),
            log,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.log.push(format!("set({key})"));
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.log.push(format!("get({key})"));
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<KeyValueEntry>, StorageError> {
        self.log.push(format!("list({prefix})"));
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| KeyValueEntry {
                key: k.clone(),
                value: v.clone(),
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.log.push(format!("del({key})"));
        self.records.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_missing_blob_is_not_found() {
        let store = MemoryBlobStore::default();
        let err = store.read("uploads/nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_prefix_listing_only_matches_prefix() {
        let store = MemoryRecordStore::default();
        store.set("record:a", "1").await.unwrap();
        store.set("record:b", "2").await.unwrap();
        store.set("session:x", "3").await.unwrap();

        let entries = store.list_by_prefix("record:").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.key.starts_with("record:")));
    }
}
