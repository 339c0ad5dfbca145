//! API endpoints.

mod feed;
mod following;
mod reactions;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/following", following::router())
        .nest("/users", users::router())
        .nest("/feed", feed::router())
        .nest("/reactions", reactions::router())
}
