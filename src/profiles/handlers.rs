use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use super::repo_types::CallerContext;
use crate::{auth::AuthUser, error::ApiError, media::QuotaStatus, state::AppState};

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitView {
    pub limit: u32,
    pub window_secs: u64,
    pub reset_in_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub profile: CallerContext,
    pub quota: QuotaStatus,
    pub rate_limit: RateLimitView,
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let profile = state
        .profiles
        .load(user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to load profile", e))?
        .ok_or(ApiError::ProfileNotFound)?;

    let quota = state.media.check_quota(user_id, profile.tier).await;
    let limit = state.config.rate_limits.for_tier(profile.tier);
    let reset_in = state.limiter.remaining_time(user_id).await;

    Ok(Json(MeResponse {
        success: true,
        quota,
        rate_limit: RateLimitView {
            limit: limit.max_requests,
            window_secs: limit.window.as_secs(),
            reset_in_secs: reset_in.as_secs(),
        },
        profile,
    }))
}
