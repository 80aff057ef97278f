//! First-page preview rendering.
//!
//! Rasterization is delegated to a sidecar service over HTTP: the pipeline
//! POSTs the PDF bytes and gets a PNG of page one back.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("rasterizer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rasterizer returned status {0}")]
    Status(u16),

    #[error("rasterizer produced no image")]
    EmptyOutput,
}

/// PNG of the document's first page.
pub struct RenderedPreview {
    pub png: Bytes,
}

#[async_trait]
pub trait PreviewRenderer: Send + Sync {
    async fn render_first_page(&self, document: &Bytes) -> Result<RenderedPreview, RenderError>;
}

pub struct HttpPreviewRenderer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPreviewRenderer {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint,
        }
    }
}

#[async_trait]
impl PreviewRenderer for HttpPreviewRenderer {
    async fn render_first_page(&self, document: &Bytes) -> Result<RenderedPreview, RenderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/pdf")
            .body(document.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status(status.as_u16()));
        }

        let png = response.bytes().await?;
        if png.is_empty() {
            return Err(RenderError::EmptyOutput);
        }

        debug!(size_bytes = png.len(), "First page rendered");
        Ok(RenderedPreview { png })
    }
}
