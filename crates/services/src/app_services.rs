use std::sync::Arc;

use chrono::Duration;
use storage::repository::Storage;

use crate::Clock;
use crate::auth_service::{AuthService, DEFAULT_SESSION_TTL_HOURS};
use crate::blog_service::BlogService;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::event_service::EventService;
use crate::image_store::{HttpImageStore, ImageHostConfig, ImageStore, NoopImageStore};
use crate::progress_service::ProgressService;
use crate::query_service::QueryService;
use crate::user_service::UserService;

/// Knobs the binary passes through from its configuration.
#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub session_ttl: Duration,
    pub image_host: Option<ImageHostConfig>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            image_host: None,
        }
    }
}

/// Assembles every service over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    auth: Arc<AuthService>,
    users: Arc<UserService>,
    catalog: Arc<CatalogService>,
    progress: Arc<ProgressService>,
    queries: Arc<QueryService>,
    events: Arc<EventService>,
    blogs: Arc<BlogService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: ServiceSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let services = Self::from_storage(&storage, clock, settings);
        services.auth.purge_expired().await?;
        Ok(services)
    }

    /// Build services over an existing backend, e.g. `Storage::in_memory()`.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, settings: ServiceSettings) -> Self {
        let images: Arc<dyn ImageStore> = match settings.image_host {
            Some(config) => {
                tracing::info!(base_url = %config.base_url, "image host cleanup enabled");
                Arc::new(HttpImageStore::new(config))
            }
            None => Arc::new(NoopImageStore),
        };

        Self {
            auth: Arc::new(AuthService::new(
                clock,
                settings.session_ttl,
                Arc::clone(&storage.users),
                Arc::clone(&storage.sessions),
            )),
            users: Arc::new(UserService::new(Arc::clone(&storage.users))),
            catalog: Arc::new(CatalogService::new(
                clock,
                Arc::clone(&storage.resources),
                Arc::clone(&storage.pathways),
            )),
            progress: Arc::new(ProgressService::new(
                clock,
                Arc::clone(&storage.users),
                Arc::clone(&storage.resources),
                Arc::clone(&storage.pathways),
                Arc::clone(&storage.progress),
            )),
            queries: Arc::new(QueryService::new(clock, Arc::clone(&storage.queries))),
            events: Arc::new(EventService::new(
                clock,
                Arc::clone(&storage.events),
                Arc::clone(&images),
            )),
            blogs: Arc::new(BlogService::new(clock, Arc::clone(&storage.blogs), images)),
        }
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn users(&self) -> Arc<UserService> {
        Arc::clone(&self.users)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn queries(&self) -> Arc<QueryService> {
        Arc::clone(&self.queries)
    }

    #[must_use]
    pub fn events(&self) -> Arc<EventService> {
        Arc::clone(&self.events)
    }

    #[must_use]
    pub fn blogs(&self) -> Arc<BlogService> {
        Arc::clone(&self.blogs)
    }
}
