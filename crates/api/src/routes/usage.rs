//! Render usage accounting endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use slidereel_db::repositories::UsageRepo;

use crate::error::AppResult;
use crate::identity::UserId;
use crate::state::AppState;

#[derive(Serialize)]
pub struct UsageResponse {
    renders_completed: i64,
}

/// `GET /api/v1/usage` -- the caller's completed-render count.
pub async fn usage(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<Json<UsageResponse>> {
    let renders_completed = UsageRepo::renders_completed(&state.pool, user_id).await?;
    Ok(Json(UsageResponse { renders_completed }))
}
