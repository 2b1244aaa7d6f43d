use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::{MetadataProvider, RecommenderModel};

pub mod movies;
pub mod recommendations;

/// Shared application state
///
/// The model is immutable after load, so handlers share it without locks.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<RecommenderModel>,
    pub provider: Arc<dyn MetadataProvider>,
}

impl AppState {
    pub fn new(model: RecommenderModel, provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            model: Arc::new(model),
            provider,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations", get(recommendations::recommend))
        .route("/movies/search", get(movies::search))
        .route("/movies/genres", get(movies::genres))
        .route("/movies/languages", get(movies::languages))
        .route("/movies/browse", get(movies::browse))
        .route("/movies/random", get(movies::random))
        .route("/movies/trending", get(movies::trending))
        .route("/movies/details", get(movies::details))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
