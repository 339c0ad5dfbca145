//! Following endpoints.

use axum::{Json, Router, extract::State, routing::post};
use pulse_common::AppResult;
use pulse_core::RelationEntry;
use pulse_db::entities::{FollowStatus, follow_edge};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Follow request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    #[validate(length(min = 1, max = 32))]
    pub user_id: String,
}

/// Request addressing one edge.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRequest {
    #[validate(length(min = 1, max = 32))]
    pub edge_id: String,
}

/// Follow edge response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeResponse {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub status: FollowStatus,
    pub created_at: String,
}

impl From<follow_edge::Model> for EdgeResponse {
    fn from(e: follow_edge::Model) -> Self {
        Self {
            id: e.id,
            follower_id: e.follower_id,
            following_id: e.following_id,
            status: e.status,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

/// Pending count response.
#[derive(Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Ask to follow a user.
async fn follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ApiResponse<EdgeResponse>> {
    req.validate()?;

    let edge = state
        .follow_graph_service
        .request_follow(&user.id, &req.user_id)
        .await?;

    Ok(ApiResponse::ok(edge.into()))
}

/// Unfollow a user.
async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EdgeRequest>,
) -> AppResult<ApiResponse<()>> {
    req.validate()?;

    state
        .follow_graph_service
        .unfollow(&user.id, &req.edge_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Accept a follow request.
async fn accept(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EdgeRequest>,
) -> AppResult<ApiResponse<EdgeResponse>> {
    req.validate()?;

    let edge = state
        .follow_graph_service
        .accept_request(&user.id, &req.edge_id)
        .await?;
    Ok(ApiResponse::ok(edge.into()))
}

/// Reject a follow request.
async fn reject(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EdgeRequest>,
) -> AppResult<ApiResponse<()>> {
    req.validate()?;

    state
        .follow_graph_service
        .decline_request(&user.id, &req.edge_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Cancel a follow request.
async fn cancel(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EdgeRequest>,
) -> AppResult<ApiResponse<()>> {
    req.validate()?;

    state
        .follow_graph_service
        .cancel_request(&user.id, &req.edge_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// List incoming follow requests.
async fn list_pending(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<RelationEntry>>> {
    let requests = state.directory_service.incoming_requests(&user.id).await?;

    // Opening the request list resyncs the badge
    if let Err(e) = state.follow_graph_service.refresh_pending(&user.id).await {
        warn!(error = %e, user_id = %user.id, "Failed to refresh pending count");
    }

    Ok(ApiResponse::ok(requests))
}

/// Count incoming follow requests.
async fn count_pending(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CountResponse>> {
    let count = state
        .follow_graph_service
        .pending_counter()
        .pending_count(&user.id)
        .await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}

/// List users the caller follows.
async fn list_following(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<RelationEntry>>> {
    let following = state.directory_service.following(&user.id).await?;
    Ok(ApiResponse::ok(following))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(follow))
        .route("/delete", post(unfollow))
        .route("/requests/accept", post(accept))
        .route("/requests/reject", post(reject))
        .route("/requests/cancel", post(cancel))
        .route("/requests/list", post(list_pending))
        .route("/requests/count", post(count_pending))
        .route("/list", post(list_following))
}
