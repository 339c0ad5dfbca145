//! HTTP API layer for pulse.
//!
//! JSON-over-POST endpoints for the follow graph, the activity feed,
//! reactions, and the user directory. Callers authenticate with a bearer
//! token; successful responses are wrapped in `{"data": ...}` and failures
//! in `{"error": {"code", "message"}}`.
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::Router;

pub use endpoints::router;
pub use middleware::AppState;

/// The API mounted under `/api`, with authentication applied.
///
/// Transport layers (tracing, CORS) are left to the caller.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}
