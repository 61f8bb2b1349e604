use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::media::QuotaStatus;

/// Seconds clients are told to wait when the vision model is overloaded.
pub const UPSTREAM_RETRY_AFTER_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("User profile not found")]
    ProfileNotFound,

    #[error("Rate limit exceeded, try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("AI service is busy, please try again shortly")]
    UpstreamRateLimited,

    #[error("Storage quota exceeded")]
    QuotaExceeded(QuotaStatus),

    #[error("Meal not found")]
    MealNotFound,

    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn internal(message: &'static str, source: anyhow::Error) -> Self {
        ApiError::Internal { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ProfileNotFound | ApiError::MealNotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamRateLimited => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::QuotaExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::ProfileNotFound => "PROFILE_NOT_FOUND",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::UpstreamRateLimited => "AI_BUSY",
            ApiError::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            ApiError::MealNotFound => "MEAL_NOT_FOUND",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            ApiError::UpstreamRateLimited => Some(UPSTREAM_RETRY_AFTER_SECS),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaStatus>,
}

impl From<&ApiError> for ErrorBody {
    fn from(e: &ApiError) -> Self {
        Self {
            success: false,
            error: e.to_string(),
            code: e.code(),
            retry_after: e.retry_after(),
            quota: match e {
                ApiError::QuotaExceeded(q) => Some(q.clone()),
                _ => None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal { message, source } = &self {
            tracing::error!(error = ?source, "{}", message);
        }

        let status = self.status();
        let body = ErrorBody::from(&self);
        let mut res = (status, Json(body)).into_response();
        if let Some(secs) = self.retry_after() {
            if let Ok(v) = HeaderValue::from_str(&secs.to_string()) {
                res.headers_mut().insert(header::RETRY_AFTER, v);
            }
        }
        res
    }
}
