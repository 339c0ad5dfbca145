//! Activity feed endpoints.

use axum::{Json, Router, extract::State, routing::post};
use pulse_common::AppResult;
use pulse_core::FeedItem;
use serde::Deserialize;
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Timeline request.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRequest {
    /// Records per activity kind
    #[validate(range(min = 1))]
    pub limit: Option<u64>,
}

/// Recent activity of the users the caller follows.
async fn timeline(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TimelineRequest>,
) -> AppResult<ApiResponse<Vec<FeedItem>>> {
    req.validate()?;

    let window = req
        .limit
        .unwrap_or(state.social.feed_window)
        .min(state.social.max_feed_window);

    let items = state
        .activity_feed_service
        .build_feed(&user.id, window)
        .await?;
    Ok(ApiResponse::ok(items))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/timeline", post(timeline))
}
