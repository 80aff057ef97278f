mod config;
mod errors;
mod models;
mod pipeline;
mod reader;
mod resources;
mod routes;
mod scoring;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::pipeline::preview::HttpPreviewRenderer;
use crate::pipeline::AuditPipeline;
use crate::reader::AuditReader;
use crate::resources::ResourceManager;
use crate::routes::build_router;
use crate::scoring::LlmScorer;
use crate::state::AppState;
use crate::storage::redis_kv::RedisRecordStore;
use crate::storage::s3::S3BlobStore;
use crate::storage::{BlobStore, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("audit_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Audit API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize S3 / MinIO blob store
    let s3 = build_s3_client(&config).await;
    let blobs: Arc<dyn BlobStore> = Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone()));

    // Initialize Redis record store
    let redis = redis::Client::open(config.redis_url.clone())?;
    let records: Arc<dyn RecordStore> = Arc::new(RedisRecordStore::connect(&redis).await?);

    // Initialize scoring client
    let scorer = Arc::new(LlmScorer::new(config.anthropic_api_key.clone()));
    info!("Scorer initialized (model: {})", scoring::llm::MODEL);

    // Initialize preview rasterizer client
    let renderer = Arc::new(HttpPreviewRenderer::new(config.rasterizer_url.clone()));
    info!("Rasterizer client initialized ({})", config.rasterizer_url);

    // Staged-asset table for reconstituted views
    let resources = ResourceManager::new();

    let pipeline = Arc::new(AuditPipeline::new(
        blobs.clone(),
        records.clone(),
        renderer,
        scorer,
    ));
    let reader = Arc::new(AuditReader::new(
        records.clone(),
        blobs.clone(),
        resources.clone(),
    ));

    let state = AppState {
        pipeline,
        reader,
        blobs,
        records,
        resources,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "audit-api-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
