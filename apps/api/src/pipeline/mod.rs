//! The upload-and-audit pipeline.
//!
//! A linear six-stage run: persist the source document, render and persist a
//! first-page preview, write the record in pending state, score, write the
//! record again with feedback. Stages execute strictly in order and each is
//! attempted exactly once — on failure the run halts with a stage-labeled
//! error and nothing already committed is rolled back. The operator sees
//! which stage failed and can tell from that what was durably written.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::feedback::{FeedbackPayload, SchemaError};
use crate::models::record::{AuditRecord, JobContext};
use crate::pipeline::preview::{PreviewRenderer, RenderError};
use crate::scoring::{llm::LlmError, ScoreSource, Scorer};
use crate::storage::{record_key, BlobStore, RecordStore, StorageError, UploadFile};

pub mod handlers;
pub mod preview;

/// The six pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    UploadingSource,
    RenderingPreview,
    UploadingPreview,
    WritingInitialRecord,
    Scoring,
    WritingFinalRecord,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::UploadingSource => "uploading_source",
            Stage::RenderingPreview => "rendering_preview",
            Stage::UploadingPreview => "uploading_preview",
            Stage::WritingInitialRecord => "writing_initial_record",
            Stage::Scoring => "scoring",
            Stage::WritingFinalRecord => "writing_final_record",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("source upload failed: {0}")]
    SourceUpload(StorageError),

    #[error("preview render failed: {0}")]
    PreviewRender(#[from] RenderError),

    #[error("preview upload failed: {0}")]
    PreviewUpload(StorageError),

    #[error("initial record write failed: {0}")]
    InitialRecordWrite(StorageError),

    #[error("scoring failed: {0}")]
    Scoring(#[from] LlmError),

    #[error("scoring response rejected: {0}")]
    ScoringParse(#[from] SchemaError),

    #[error("final record write failed: {0}")]
    FinalRecordWrite(StorageError),
}

impl AuditError {
    /// The stage the run halted at.
    pub fn stage(&self) -> Stage {
        match self {
            AuditError::SourceUpload(_) => Stage::UploadingSource,
            AuditError::PreviewRender(_) => Stage::RenderingPreview,
            AuditError::PreviewUpload(_) => Stage::UploadingPreview,
            AuditError::InitialRecordWrite(_) => Stage::WritingInitialRecord,
            AuditError::Scoring(_) => Stage::Scoring,
            AuditError::ScoringParse(_) => Stage::WritingFinalRecord,
            AuditError::FinalRecordWrite(_) => Stage::WritingFinalRecord,
        }
    }
}

/// Drives one audit end to end. All collaborators are injected; the pipeline
/// itself holds no connection state.
pub struct AuditPipeline {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    renderer: Arc<dyn PreviewRenderer>,
    scorer: Arc<dyn Scorer>,
}

impl AuditPipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        renderer: Arc<dyn PreviewRenderer>,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        Self {
            blobs,
            records,
            renderer,
            scorer,
        }
    }

    /// Runs the full pipeline for one uploaded file. Returns the new record
    /// id on success. Concurrent runs never contend: each generates a fresh
    /// id and writes only its own keys.
    pub async fn run(&self, file: UploadFile, ctx: JobContext) -> Result<Uuid, AuditError> {
        // Stage 1: persist the original document.
        let source_ref = self
            .blobs
            .upload(&file)
            .await
            .map_err(AuditError::SourceUpload)?;
        info!(path = %source_ref.path, "Source document uploaded");

        // Stage 2: render the first page.
        let preview = self.renderer.render_first_page(&file.bytes).await?;

        // Stage 3: persist the preview image.
        let preview_ref = self
            .blobs
            .upload(&UploadFile {
                filename: "preview.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: preview.png,
            })
            .await
            .map_err(AuditError::PreviewUpload)?;
        info!(path = %preview_ref.path, "Preview image uploaded");

        // Stage 4: write the record in pending state. From here the audit is
        // visible to the listing even if scoring never completes.
        let id = Uuid::new_v4();
        let mut record = AuditRecord {
            id,
            source_document_path: source_ref.path.clone(),
            preview_image_path: preview_ref.path,
            job_context: ctx,
            feedback: None,
        };
        self.write_record(&record, AuditError::InitialRecordWrite)
            .await?;
        info!(id = %id, "Audit record created (pending)");

        // Stage 5: score.
        let instructions = crate::scoring::prompts::audit_instructions(&record.job_context);
        let raw = self
            .scorer
            .score(
                &ScoreSource {
                    path: &source_ref.path,
                    bytes: &file.bytes,
                },
                &instructions,
            )
            .await?;

        // Stage 6: validate and persist the feedback. A response that fails
        // schema validation is never written; the record stays pending.
        let feedback = FeedbackPayload::parse(&raw).map_err(|e| {
            warn!(id = %id, "Scoring response failed validation: {e}");
            e
        })?;
        record.feedback = Some(feedback);
        self.write_record(&record, AuditError::FinalRecordWrite)
            .await?;
        info!(id = %id, "Audit record finalized");

        Ok(id)
    }

    async fn write_record(
        &self,
        record: &AuditRecord,
        wrap: fn(StorageError) -> AuditError,
    ) -> Result<(), AuditError> {
        let value = serde_json::to_string(record)
            .map_err(|e| wrap(StorageError::Transport(format!("serialize: {e}"))))?;
        self.records
            .set(&record_key(&record.id), &value)
            .await
            .map_err(wrap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::pipeline::preview::RenderedPreview;
    use crate::storage::memory::{CallLog, MemoryBlobStore, MemoryRecordStore};

    const VALID_FEEDBACK: &str = r#"{
        "overallScore": 82,
        "ATS": {"score": 80, "tips": [{"type": "good", "tip": "Standard section names"}]},
        "toneAndStyle": {"score": 75, "tips": []},
        "content": {"score": 82, "tips": []},
        "structure": {"score": 90, "tips": []},
        "skills": {"score": 70, "tips": [{"type": "improve", "tip": "Add metrics", "explanation": "Numbers read better"}]}
    }"#;

    struct StubScorer {
        response: Result<String, ()>,
        log: CallLog,
    }

    #[async_trait]
    impl Scorer for StubScorer {
        async fn score(
            &self,
            _source: &ScoreSource<'_>,
            instructions: &str,
        ) -> Result<String, LlmError> {
            assert!(instructions.contains("OUTPUT SCHEMA"));
            self.log.push("score".to_string());
            self.response
                .clone()
                .map_err(|_| LlmError::EmptyContent)
        }
    }

    struct StubRenderer {
        fail: bool,
    }

    #[async_trait]
    impl PreviewRenderer for StubRenderer {
        async fn render_first_page(
            &self,
            _document: &Bytes,
        ) -> Result<RenderedPreview, RenderError> {
            if self.fail {
                Err(RenderError::EmptyOutput)
            } else {
                Ok(RenderedPreview {
                    png: Bytes::from_static(b"\x89PNG fake"),
                })
            }
        }
    }

    struct Fixture {
        pipeline: AuditPipeline,
        records: Arc<MemoryRecordStore>,
        log: CallLog,
    }

    fn fixture(scorer_response: Result<String, ()>, renderer_fails: bool) -> Fixture {
        let log = CallLog::default();
        let records = Arc::new(MemoryRecordStore::with_log(log.clone()));
        let pipeline = AuditPipeline::new(
            Arc::new(MemoryBlobStore::with_log(log.clone())),
            records.clone(),
            Arc::new(StubRenderer {
                fail: renderer_fails,
            }),
            Arc::new(StubScorer {
                response: scorer_response,
                log: log.clone(),
            }),
        );
        Fixture {
            pipeline,
            records,
            log,
        }
    }

    fn resume_file() -> UploadFile {
        UploadFile {
            filename: "resume.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.4 one page"),
        }
    }

    fn engineer_context() -> JobContext {
        JobContext {
            company_name: None,
            job_title: Some("Engineer".to_string()),
            job_description: "Build systems".to_string(),
        }
    }

    async fn stored_record(records: &MemoryRecordStore, id: Uuid) -> AuditRecord {
        let raw = records.get(&record_key(&id)).await.unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_successful_run_calls_stores_in_pipeline_order() {
        let fx = fixture(Ok(VALID_FEEDBACK.to_string()), false);

        let id = fx
            .pipeline
            .run(resume_file(), engineer_context())
            .await
            .unwrap();

        let calls = fx.log.entries();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], "upload(resume.pdf)");
        assert_eq!(calls[1], "upload(preview.png)");
        assert_eq!(calls[2], format!("set(record:{id})"));
        assert_eq!(calls[3], "score");
        assert_eq!(calls[4], format!("set(record:{id})"));
    }

    #[tokio::test]
    async fn test_successful_run_persists_feedback() {
        let fx = fixture(Ok(VALID_FEEDBACK.to_string()), false);

        let id = fx
            .pipeline
            .run(resume_file(), engineer_context())
            .await
            .unwrap();

        let record = stored_record(&fx.records, id).await;
        assert!(!record.is_pending());
        assert_eq!(record.job_context, engineer_context());
        let feedback = record.feedback.unwrap();
        assert_eq!(feedback.overall_score, 82.0);
        assert!(record.source_document_path.ends_with("resume.pdf"));
        assert!(record.preview_image_path.ends_with("preview.png"));
    }

    #[tokio::test]
    async fn test_malformed_scoring_response_leaves_record_pending() {
        let fx = fixture(Ok("Sorry, I can't help with that.".to_string()), false);

        let err = fx
            .pipeline
            .run(resume_file(), engineer_context())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::WritingFinalRecord);
        assert!(matches!(err, AuditError::ScoringParse(_)));

        // Exactly one record write happened and it holds no feedback.
        let calls = fx.log.entries();
        assert_eq!(
            calls.iter().filter(|c| c.starts_with("set(")).count(),
            1,
            "malformed feedback must never be persisted"
        );
        let entries = fx.records.list_by_prefix("record:").await.unwrap();
        assert_eq!(entries.len(), 1);
        let record: AuditRecord = serde_json::from_str(&entries[0].value).unwrap();
        assert!(record.is_pending());
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_rejected_like_malformed_json() {
        let bad = VALID_FEEDBACK.replace("\"overallScore\": 82", "\"overallScore\": 182");
        let fx = fixture(Ok(bad), false);

        let err = fx
            .pipeline
            .run(resume_file(), engineer_context())
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::ScoringParse(_)));

        let entries = fx.records.list_by_prefix("record:").await.unwrap();
        let record: AuditRecord = serde_json::from_str(&entries[0].value).unwrap();
        assert!(record.is_pending());
    }

    #[tokio::test]
    async fn test_scorer_outage_halts_after_initial_write() {
        let fx = fixture(Err(()), false);

        let err = fx
            .pipeline
            .run(resume_file(), engineer_context())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Scoring);

        // Both uploads and the pending write stay committed; no rollback.
        let calls = fx.log.entries();
        assert_eq!(calls.iter().filter(|c| c.starts_with("upload(")).count(), 2);
        assert_eq!(calls.iter().filter(|c| c.starts_with("set(")).count(), 1);
        assert!(!calls.iter().any(|c| c.starts_with("delete(")));
    }

    #[tokio::test]
    async fn test_scored_audit_reconstitutes_end_to_end() {
        use crate::reader::AuditReader;
        use crate::resources::ResourceManager;

        let log = CallLog::default();
        let blobs = Arc::new(MemoryBlobStore::with_log(log.clone()));
        let records = Arc::new(MemoryRecordStore::with_log(log.clone()));
        let pipeline = AuditPipeline::new(
            blobs.clone(),
            records.clone(),
            Arc::new(StubRenderer { fail: false }),
            Arc::new(StubScorer {
                response: Ok(VALID_FEEDBACK.to_string()),
                log: log.clone(),
            }),
        );

        let id = pipeline
            .run(resume_file(), engineer_context())
            .await
            .unwrap();

        let resources = ResourceManager::new();
        let reader = AuditReader::new(records, blobs, resources.clone());
        let view = reader.load(id).await.unwrap();

        assert_eq!(view.record.job_context, engineer_context());
        assert_eq!(view.record.feedback.unwrap().overall_score, 82.0);

        let preview = resources.fetch(view.preview_handle.id()).unwrap();
        assert!(!preview.bytes.is_empty());
        assert_eq!(preview.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_render_failure_halts_before_any_record_write() {
        let fx = fixture(Ok(VALID_FEEDBACK.to_string()), true);

        let err = fx
            .pipeline
            .run(resume_file(), engineer_context())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::RenderingPreview);
        assert_eq!(err.stage().label(), "rendering_preview");

        let calls = fx.log.entries();
        // Source upload already happened and is not rolled back.
        assert_eq!(calls, vec!["upload(resume.pdf)".to_string()]);
    }
}
