//! User directory endpoints.

use axum::{Json, Router, extract::State, routing::post};
use pulse_common::AppResult;
use pulse_core::Candidate;
use serde::Deserialize;
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Explore request.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExploreRequest {
    #[validate(length(max = 100))]
    pub query: Option<String>,
    #[validate(range(min = 1))]
    pub limit: Option<u64>,
}

/// List users the caller could follow, with their relationship status.
async fn explore(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ExploreRequest>,
) -> AppResult<ApiResponse<Vec<Candidate>>> {
    req.validate()?;

    let max = state.social.directory_limit;
    let limit = req.limit.unwrap_or(max).min(max);

    let candidates = state
        .directory_service
        .list_candidates(&user.id, req.query.as_deref(), limit)
        .await?;
    Ok(ApiResponse::ok(candidates))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/explore", post(explore))
}
