use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::feedback::FeedbackPayload;

/// Caller-supplied job context an upload is audited against. Immutable once
/// the record is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    pub job_description: String,
}

/// One durable audit: identity, blob locators, job context, and (once
/// scoring has succeeded) the feedback payload.
///
/// `feedback` transitions absent → present at most once, by the pipeline's
/// final record write. A record with `feedback: None` is pending, which is a
/// valid long-lived state — scoring failures leave it that way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    pub source_document_path: String,
    pub preview_image_path: String,
    pub job_context: JobContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackPayload>,
}

impl AuditRecord {
    pub fn is_pending(&self) -> bool {
        self.feedback.is_none()
    }
}
