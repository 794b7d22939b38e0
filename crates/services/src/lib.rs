#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod blog_service;
pub mod catalog_service;
pub mod error;
pub mod event_service;
pub mod image_store;
pub mod progress_service;
pub mod query_service;
pub mod seed;
pub mod user_service;

pub use club_core::Clock;

pub use app_services::{AppServices, ServiceSettings};
pub use auth_service::{AuthService, IssuedSession};
pub use blog_service::BlogService;
pub use catalog_service::CatalogService;
pub use error::{
    AppServicesError, AuthError, CatalogError, ContentServiceError, ImageStoreError,
    ProgressError, QueryServiceError, UserServiceError,
};
pub use event_service::EventService;
pub use image_store::{HttpImageStore, ImageHostConfig, ImageStore, NoopImageStore};
pub use progress_service::{
    EntryDetail, OverviewItem, PathwayCompletion, PathwaySummary, ProgressService, RosterMember,
};
pub use query_service::QueryService;
pub use user_service::UserService;
