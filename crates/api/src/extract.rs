//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use club_core::Actor;

use crate::error::ApiError;
use crate::router::AppState;

/// The resolved caller of a request.
///
/// No `Authorization` header means [`Actor::Anonymous`]; a header that is
/// present but not a live bearer token is rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

/// Returns the bearer token carried by `headers`, if any.
///
/// # Errors
///
/// Returns `ApiError::Unauthorized` when the header is not `Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".to_string()))?;
    Ok(Some(token))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers)? else {
            return Ok(Caller(Actor::Anonymous));
        };
        let actor = state.services.auth().resolve(token).await?;
        Ok(Caller(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_reads_scheme_and_rejects_others() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers).unwrap(), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert!(matches!(
            bearer_token(&headers),
            Err(ApiError::Unauthorized(_))
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());
    }
}
