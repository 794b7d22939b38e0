//! Shared error types for the services crate.

use thiserror::Error;

use club_core::AccessError;
use club_core::model::{
    ContentError, PathwayError, PathwayId, QueryError, ResourceError, ResourceId, UserError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Pathway(#[from] PathwayError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("resource {resource} is not part of pathway {pathway}")]
    NotInPathway {
        pathway: PathwayId,
        resource: ResourceId,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error(transparent)]
    Invalid(#[from] UserError),
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("session is invalid or has expired")]
    InvalidSession,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `UserService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("admins cannot change their own role")]
    SelfRoleChange,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QueryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QueryServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `EventService` and `BlogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by image host adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImageStoreError {
    #[error("no public id in image url {0:?}")]
    UnrecognizedUrl(String),
    #[error("image host responded with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}
