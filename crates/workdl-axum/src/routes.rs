//! Route definitions and router construction.
//!
//! Axum 0.8 uses brace syntax for path parameters: `{id}`.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bootstrap::{AxumContext, CorsConfig};
use crate::handlers;
use crate::state::AppState;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// All API routes without the `/api` prefix; the caller nests them.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        // Single download
        .route("/download", post(handlers::download::start))
        .route("/download/stop", post(handlers::download::stop))
        .route("/download/status", get(handlers::download::status))
        // Queue
        .route(
            "/queue",
            get(handlers::queue::list)
                .post(handlers::queue::add)
                .delete(handlers::queue::clear),
        )
        .route("/queue/process", post(handlers::queue::process))
        .route("/queue/{id}", delete(handlers::queue::remove))
        // Library
        .route("/library", get(handlers::library::list))
        .route("/library/mismatches", get(handlers::library::mismatches))
        .route(
            "/library/fix-compatibility",
            post(handlers::library::fix),
        )
        .route("/library/{id}", delete(handlers::library::remove))
        // Settings
        .route(
            "/settings",
            get(handlers::settings::get)
                .put(handlers::settings::update)
                .patch(handlers::settings::update),
        )
        // Workshop details and game
        .route("/workshop/{id}", get(handlers::workshop::info))
        .route("/game/launch", post(handlers::game::launch))
        // Events (SSE)
        .route("/events", get(handlers::events::stream))
}

/// Create the main Axum router with all API routes.
pub fn create_router(ctx: AxumContext, cors_config: &CorsConfig) -> Router {
    let state: AppState = Arc::new(ctx);
    let cors = build_cors_layer(cors_config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes().with_state(state).layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
pub(crate) async fn health_check() -> &'static str {
    "OK"
}
