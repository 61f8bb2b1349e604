use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;
use uuid::Uuid;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::error::ApiError;

/// Resolves the `Authorization: Bearer <token>` header to a user id.
pub fn authenticate(keys: &JwtKeys, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))?;

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        ApiError::Unauthorized("Invalid or expired token".into())
    })?;

    if claims.kind != TokenKind::Access {
        return Err(ApiError::Unauthorized("Access token required".into()));
    }
    Ok(claims.sub)
}

/// Extracts and validates the bearer token, returning the user id.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        authenticate(&keys, &parts.headers).map(AuthUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use axum::http::HeaderValue;

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "s".into(),
            issuer: "i".into(),
            audience: "a".into(),
        })
    }

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_token_resolves_to_subject() {
        let keys = keys();
        let user = Uuid::new_v4();
        let token = keys.sign_access(user);
        assert_eq!(authenticate(&keys, &headers(&format!("Bearer {}", token))).unwrap(), user);
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        let keys = keys();
        assert!(matches!(authenticate(&keys, &HeaderMap::new()), Err(ApiError::Unauthorized(_))));
        assert!(matches!(authenticate(&keys, &headers("Basic abc")), Err(ApiError::Unauthorized(_))));
        assert!(matches!(authenticate(&keys, &headers("Bearer ")), Err(ApiError::Unauthorized(_))));
        assert!(matches!(
            authenticate(&keys, &headers("Bearer not.a.jwt")),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn refresh_token_is_rejected() {
        let keys = keys();
        let token = keys.sign(Uuid::new_v4(), TokenKind::Refresh, 300);
        let err = authenticate(&keys, &headers(&format!("Bearer {}", token))).unwrap_err();
        assert_eq!(err.to_string(), "Access token required");
    }
}
