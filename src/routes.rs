use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{cors_layer, preflight};
use crate::state::AppState;

/// Build the application router. The preflight short-circuit is the
/// outermost layer so `OPTIONS` never reaches routing or body extraction.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/fetch-metadata", post(handlers::metadata::fetch_metadata))
        .route("/generate-summary", post(handlers::summary::create_summary))
        .route("/bookmarks/draft", post(handlers::draft::create_draft))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(preflight))
        .with_state(state)
}
