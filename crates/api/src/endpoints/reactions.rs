//! Reaction endpoints.

use std::collections::HashMap;

use axum::{Json, Router, extract::State, routing::post};
use pulse_common::AppResult;
use pulse_core::ReactionTally;
use pulse_db::entities::{ReactionKind, TargetType};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Toggle reaction request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    #[validate(length(min = 1, max = 32))]
    pub target_id: String,
    pub target_type: TargetType,
    pub kind: ReactionKind,
}

/// Toggle reaction response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub my_reaction: Option<ReactionKind>,
}

/// Tally request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TallyRequest {
    pub target_type: TargetType,
    #[validate(length(max = 100))]
    pub target_ids: Vec<String>,
}

/// Toggle a reaction on an activity record.
async fn toggle(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> AppResult<ApiResponse<ToggleResponse>> {
    req.validate()?;

    let my_reaction = state
        .reaction_ledger_service
        .toggle_reaction(&user.id, &req.target_id, req.target_type, req.kind)
        .await?;
    Ok(ApiResponse::ok(ToggleResponse { my_reaction }))
}

/// Reaction tallies for a set of activity records of one type.
async fn tally(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TallyRequest>,
) -> AppResult<ApiResponse<HashMap<String, ReactionTally>>> {
    req.validate()?;

    let tallies = state
        .reaction_ledger_service
        .tally(req.target_type, &req.target_ids)
        .await?;
    Ok(ApiResponse::ok(tallies))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/toggle", post(toggle))
        .route("/tally", post(tally))
}
