use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use super::dto::{AnalyzeRequest, AnalyzeResponse};
use super::services;
use crate::{error::ApiError, state::AppState};

pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze_meal))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// POST /analyze { image: "data:image/...;base64,...", mode?: "health" }
#[instrument(skip(state, headers, body))]
pub async fn analyze_meal(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    services::analyze(&state, &headers, req).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::Tier;
    use crate::state::testing::Harness;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;
    use uuid::Uuid;

    const TINY_GIF: &str = "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

    async fn send(state: AppState, token: Option<String>, body: &str) -> (u16, Option<String>, serde_json::Value) {
        let mut req = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-type", "application/json");
        if let Some(t) = token {
            req = req.header("Authorization", format!("Bearer {}", t));
        }
        let res = analyze_routes()
            .with_state(state)
            .oneshot(req.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = res.status().as_u16();
        let retry = res
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, retry, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn analyze_round_trip_over_http() {
        let user = Uuid::new_v4();
        let h = Harness::new().with_profile(user, Tier::Free, 0);
        let token = h.token_for(user);
        let body = serde_json::json!({ "image": TINY_GIF, "mode": "health" }).to_string();

        let (status, _, json) = send(h.state, Some(token), &body).await;
        assert_eq!(status, 200);
        assert_eq!(json["success"], true);
        assert_eq!(json["analysis"]["tier"], "free");
        assert!(json["analysis"].get("premiumAnalysis").is_none());
        assert_eq!(json["metadata"]["cached"], false);
        assert!(json["mealId"].as_str().is_some());
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let (status, _, json) = send(AppState::fake(), None, "{not json").await;
        assert_eq!(status, 400);
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn rate_limited_response_has_retry_header() {
        let user = Uuid::new_v4();
        let h = Harness::new()
            .with_profile(user, Tier::Free, 0)
            .with_rate_limits(crate::config::RateLimitConfig {
                free: 1,
                ..Default::default()
            });
        let token = h.token_for(user);
        let body = serde_json::json!({ "image": TINY_GIF }).to_string();

        let (status, _, _) = send(h.state.clone(), Some(token.clone()), &body).await;
        assert_eq!(status, 200);
        let (status, retry, json) = send(h.state, Some(token), &body).await;
        assert_eq!(status, 429);
        assert_eq!(json["code"], "RATE_LIMITED");
        assert!(json["retryAfter"].as_u64().unwrap() > 0);
        assert_eq!(retry.unwrap(), json["retryAfter"].to_string());
    }
}
