//! Process-local resource manager.
//!
//! Blobs pulled out of the durable store are parked here under a fresh handle
//! id and dereferenced by the view through `GET /assets/:id`. The table never
//! frees anything on its own: whoever acquired a handle owns it and releases
//! it, either explicitly or by acquiring a replacement for the same stored
//! path (the old handle is released as the new one is installed, so repeated
//! loads of one record can't grow the table).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

/// A releasable reference to one staged blob. Cloneable and cheap; releasing
/// any clone releases the underlying entry, further releases are no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    id: Uuid,
}

impl ResourceHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Path the handle is served at.
    pub fn url(&self) -> String {
        format!("/assets/{}", self.id)
    }
}

#[derive(Clone)]
pub struct StagedResource {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Default)]
struct ResourceTable {
    by_id: HashMap<Uuid, (StagedResource, String)>,
    by_path: HashMap<String, Uuid>,
}

#[derive(Clone, Default)]
pub struct ResourceManager {
    table: Arc<Mutex<ResourceTable>>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a blob and returns its handle. If a handle already exists for
    /// `stored_path` it is superseded: the old entry is dropped before the
    /// new handle is returned.
    pub fn acquire(&self, stored_path: &str, bytes: Bytes, content_type: &str) -> ResourceHandle {
        let mut table = self.table.lock().unwrap();

        if let Some(old_id) = table.by_path.remove(stored_path) {
            table.by_id.remove(&old_id);
            debug!(path = %stored_path, handle = %old_id, "Superseded stale resource handle");
        }

        let id = Uuid::new_v4();
        table.by_id.insert(
            id,
            (
                StagedResource {
                    bytes,
                    content_type: content_type.to_string(),
                },
                stored_path.to_string(),
            ),
        );
        table.by_path.insert(stored_path.to_string(), id);

        ResourceHandle { id }
    }

    /// Releases a handle. Idempotent: releasing a handle that is already
    /// gone (or was superseded) does nothing.
    pub fn release(&self, handle: &ResourceHandle) {
        self.release_id(handle.id);
    }

    /// Release by raw id, for the HTTP surface where only the id travels.
    pub fn release_id(&self, id: Uuid) {
        let mut table = self.table.lock().unwrap();
        if let Some((_, path)) = table.by_id.remove(&id) {
            // Only unmap the path if it still points at this handle; a
            // superseding acquire may have remapped it already.
            if table.by_path.get(&path) == Some(&id) {
                table.by_path.remove(&path);
            }
            debug!(handle = %id, "Resource handle released");
        }
    }

    /// Releases whatever handle is currently staged for a stored path.
    /// No-op when nothing is staged. Used by the bulk wipe so a deleted
    /// blob stops being served immediately.
    pub fn release_path(&self, stored_path: &str) {
        let mut table = self.table.lock().unwrap();
        if let Some(id) = table.by_path.remove(stored_path) {
            table.by_id.remove(&id);
            debug!(path = %stored_path, handle = %id, "Resource handle released for path");
        }
    }

    /// Dereferences a handle. `None` once released.
    pub fn fetch(&self, id: Uuid) -> Option<StagedResource> {
        self.table
            .lock()
            .unwrap()
            .by_id
            .get(&id)
            .map(|(resource, _)| resource.clone())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().unwrap().by_id.len()
    }
}
