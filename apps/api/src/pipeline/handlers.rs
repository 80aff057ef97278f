//! Axum route handlers for the audit API.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::ScoreTier;
use crate::models::record::{AuditRecord, JobContext};
use crate::state::AppState;
use crate::storage::{record_key, BlobStore, RecordStore, UploadFile, RECORD_PREFIX};

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RunAuditResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedAsset {
    pub handle: Uuid,
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditViewResponse {
    pub record: AuditRecord,
    /// "pending" until feedback has been written, "scored" after.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_tier: Option<ScoreTier>,
    pub source: StagedAsset,
    pub preview: StagedAsset,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub id: Uuid,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WipeResponse {
    pub records_deleted: usize,
    pub blobs_deleted: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/audits
///
/// Multipart form: `file` (the PDF) plus `job_description` and optional
/// `company_name` / `job_title`. Runs the full audit pipeline and returns the
/// new record id. Failures carry the failed stage in the error body.
pub async fn handle_run_audit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RunAuditResponse>, AppError> {
    let mut file: Option<UploadFile> = None;
    let mut company_name: Option<String> = None;
    let mut job_title: Option<String> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .unwrap_or("resume.pdf")
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read file: {e}")))?;
                file = Some(UploadFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            "company_name" => company_name = Some(read_text(field).await?),
            "job_title" => job_title = Some(read_text(field).await?),
            "job_description" => job_description = Some(read_text(field).await?),
            other => {
                warn!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    if file.bytes.is_empty() {
        return Err(AppError::Validation("file is empty".to_string()));
    }
    if file.content_type != "application/pdf" {
        return Err(AppError::Validation(format!(
            "file must be a PDF, got '{}'",
            file.content_type
        )));
    }
    let job_description = job_description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| AppError::Validation("job_description cannot be empty".to_string()))?;

    let ctx = JobContext {
        company_name: company_name.filter(|s| !s.trim().is_empty()),
        job_title: job_title.filter(|s| !s.trim().is_empty()),
        job_description,
    };

    let id = state.pipeline.run(file, ctx).await?;

    Ok(Json(RunAuditResponse { id }))
}

/// GET /api/v1/audits/:id
///
/// Reconstitutes one audit: the record plus `/assets/...` URLs for the
/// source document and preview image. A record still waiting on feedback
/// reports `status: "pending"` — it is not an error.
pub async fn handle_get_audit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditViewResponse>, AppError> {
    let view = state.reader.load(id).await?;

    let status = if view.record.is_pending() {
        "pending"
    } else {
        "scored"
    };
    let overall_tier = view
        .record
        .feedback
        .as_ref()
        .map(|f| ScoreTier::for_score(f.overall_score));

    Ok(Json(AuditViewResponse {
        status,
        overall_tier,
        source: StagedAsset {
            handle: view.source_handle.id(),
            url: view.source_handle.url(),
        },
        preview: StagedAsset {
            handle: view.preview_handle.id(),
            url: view.preview_handle.url(),
        },
        record: view.record,
    }))
}

/// GET /api/v1/audits
///
/// Inventory listing over the record namespace. A corrupt entry is skipped
/// with a warning; it must not take the whole listing down.
pub async fn handle_list_audits(
    State(state): State<AppState>,
) -> Result<Json<Vec<AuditSummary>>, AppError> {
    let entries = state.records.list_by_prefix(RECORD_PREFIX).await?;

    let mut summaries = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_str::<AuditRecord>(&entry.value) {
            Ok(record) => summaries.push(AuditSummary {
                id: record.id,
                company_name: record.job_context.company_name,
                job_title: record.job_context.job_title,
                status: if record.feedback.is_none() {
                    "pending"
                } else {
                    "scored"
                },
                overall_score: record.feedback.map(|f| f.overall_score),
            }),
            Err(e) => {
                warn!(key = %entry.key, "Skipping corrupt audit record: {e}");
            }
        }
    }

    Ok(Json(summaries))
}

/// DELETE /api/v1/audits
///
/// Bulk wipe: removes every audit record and its blobs. The only deletion
/// path in the service — the pipeline itself never deletes anything.
pub async fn handle_wipe(State(state): State<AppState>) -> Result<Json<WipeResponse>, AppError> {
    let entries = state.records.list_by_prefix(RECORD_PREFIX).await?;

    let mut records_deleted = 0;
    let mut blobs_deleted = 0;

    for entry in entries {
        if let Ok(record) = serde_json::from_str::<AuditRecord>(&entry.value) {
            for path in [&record.source_document_path, &record.preview_image_path] {
                match state.blobs.delete(path).await {
                    Ok(()) => blobs_deleted += 1,
                    Err(e) => warn!(path = %path, "Blob delete failed during wipe: {e}"),
                }
                // A staged handle for a wiped blob must stop serving it.
                state.resources.release_path(path);
            }
            state.records.delete(&record_key(&record.id)).await?;
        } else {
            // Corrupt entries still get their key removed.
            state.records.delete(&entry.key).await?;
        }
        records_deleted += 1;
    }

    info!(records_deleted, blobs_deleted, "Audit store wiped");

    Ok(Json(WipeResponse {
        records_deleted,
        blobs_deleted,
    }))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Could not read form field: {e}")))
}
