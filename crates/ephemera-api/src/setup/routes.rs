//! Route configuration and setup

use crate::constants::API_PREFIX;
use crate::handlers::{files, health};
use crate::state::AppState;
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use ephemera_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let file_routes = Router::new()
        .route("/files", get(files::list_files).post(files::upload_file))
        .route(
            "/files/{id}",
            get(files::download_file).delete(files::delete_file),
        );

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest(API_PREFIX, file_routes)
        .layer(DefaultBodyLimit::max(config.max_file_size_bytes()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors_origins().iter().any(|origin| origin == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        return Ok(base.allow_origin(Any));
    }

    let origins = config
        .cors_origins()
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin '{}'", origin))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(base.allow_origin(origins))
}
