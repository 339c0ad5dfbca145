//! API middleware and shared state.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use pulse_common::config::SocialConfig;
use pulse_core::{
    ActivityFeedService, DirectoryService, FollowGraphService, ReactionLedgerService,
};
use pulse_db::repositories::{
    ActivityRepository, FollowEdgeRepository, ReactionRepository, UserRepository,
};
use sea_orm::DatabaseConnection;
use tracing::warn;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_repo: UserRepository,
    pub follow_graph_service: FollowGraphService,
    pub activity_feed_service: ActivityFeedService,
    pub reaction_ledger_service: ReactionLedgerService,
    pub directory_service: DirectoryService,
    pub social: SocialConfig,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, social: SocialConfig) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let follow_graph_service =
            FollowGraphService::new(FollowEdgeRepository::new(Arc::clone(&db)));
        let reaction_ledger_service =
            ReactionLedgerService::new(ReactionRepository::new(Arc::clone(&db)));
        let activity_feed_service = ActivityFeedService::new(
            follow_graph_service.clone(),
            user_repo.clone(),
            ActivityRepository::new(db),
            reaction_ledger_service.clone(),
            social.placeholder_name.clone(),
        );
        let directory_service = DirectoryService::new(
            user_repo.clone(),
            follow_graph_service.clone(),
            social.placeholder_name.clone(),
        );

        Self {
            user_repo,
            follow_graph_service,
            activity_feed_service,
            reaction_ledger_service,
            directory_service,
            social,
        }
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to a user and stores it in the
/// request extensions for [`crate::extractors::AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.user_repo.find_by_token(token).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Token lookup failed"),
        }
    }

    next.run(req).await
}
