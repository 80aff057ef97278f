use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::AuditPipeline;
use crate::reader::AuditReader;
use crate::resources::ResourceManager;
use crate::storage::{BlobStore, RecordStore};

/// Shared application state injected into all route handlers via Axum
/// extractors. Collaborators are constructed once in `main` and passed in;
/// nothing here is reached through ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AuditPipeline>,
    pub reader: Arc<AuditReader>,
    /// Direct facade access for the listing and wipe surfaces.
    pub blobs: Arc<dyn BlobStore>,
    pub records: Arc<dyn RecordStore>,
    pub resources: ResourceManager,
    pub config: Config,
}
