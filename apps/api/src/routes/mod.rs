pub mod assets;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Audit API
        .route(
            "/api/v1/audits",
            post(handlers::handle_run_audit)
                .get(handlers::handle_list_audits)
                .delete(handlers::handle_wipe),
        )
        .route("/api/v1/audits/:id", get(handlers::handle_get_audit))
        // Staged assets (resource handles)
        .route(
            "/assets/:id",
            get(assets::handle_fetch_asset).delete(assets::handle_release_asset),
        )
        .with_state(state)
}
