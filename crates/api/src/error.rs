use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use club_core::model::ParseIdError;
use club_core::{AccessError, ParseEnumError};
use services::{
    AuthError, CatalogError, ContentServiceError, ProgressError, QueryServiceError,
    UserServiceError,
};
use storage::StorageError;

/// Failure of a request, rendered as `{"error": "..."}` with a matching status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn bad_request(err: impl ToString) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => ApiError::Unauthorized(err.to_string()),
            _ => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ApiError::NotFound,
            StorageError::Conflict => {
                ApiError::Conflict("request conflicts with existing data".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ParseIdError> for ApiError {
    fn from(err: ParseIdError) -> Self {
        ApiError::bad_request(err)
    }
}

impl From<ParseEnumError> for ApiError {
    fn from(err: ParseEnumError) -> Self {
        ApiError::bad_request(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Access(e) => e.into(),
            CatalogError::Storage(e) => e.into(),
            CatalogError::Resource(e) => ApiError::bad_request(e),
            CatalogError::Pathway(e) => ApiError::bad_request(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ProgressError> for ApiError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::Access(e) => e.into(),
            ProgressError::Storage(e) => e.into(),
            e @ ProgressError::NotInPathway { .. } => ApiError::bad_request(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Invalid(e) => ApiError::bad_request(e),
            e @ AuthError::EmailTaken => ApiError::Conflict(e.to_string()),
            e @ (AuthError::InvalidCredentials | AuthError::InvalidSession) => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Access(e) => e.into(),
            e @ UserServiceError::SelfRoleChange => ApiError::Forbidden(e.to_string()),
            UserServiceError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<QueryServiceError> for ApiError {
    fn from(err: QueryServiceError) -> Self {
        match err {
            QueryServiceError::Access(e) => e.into(),
            QueryServiceError::Query(e) => ApiError::bad_request(e),
            QueryServiceError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ContentServiceError> for ApiError {
    fn from(err: ContentServiceError) -> Self {
        match err {
            ContentServiceError::Access(e) => e.into(),
            ContentServiceError::Content(e) => ApiError::bad_request(e),
            ContentServiceError::Storage(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use club_core::Permission;

    #[test]
    fn access_errors_split_401_and_403() {
        assert_eq!(
            ApiError::from(AccessError::Unauthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AccessError::Forbidden(Permission::ManageCatalog)).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn storage_details_stay_out_of_the_message() {
        let err = ApiError::from(StorageError::Connection("disk I/O error".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_failures_map_to_expected_statuses() {
        assert_eq!(
            ApiError::from(AuthError::EmailTaken).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(UserServiceError::SelfRoleChange).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(CatalogError::Storage(StorageError::NotFound)).status(),
            StatusCode::NOT_FOUND
        );
    }
}
