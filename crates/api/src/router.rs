use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use services::AppServices;

use crate::routes::{auth, catalog, content, progress, queries, users};

/// HTTP-facing settings.
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    /// Allowed browser origin. `None` allows any origin.
    pub cors_origin: Option<HeaderValue>,
}

#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices, config: ApiConfig) -> Self {
        Self {
            services,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let origin = match &state.config.cors_origin {
        Some(value) => AllowOrigin::exact(value.clone()),
        None => AllowOrigin::from(Any),
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/users", get(users::list))
        .route("/users/me", get(users::me))
        .route("/users/:id/role", post(users::assign_role))
        .route(
            "/resources",
            get(catalog::list_resources).post(catalog::create_resource),
        )
        .route(
            "/resources/:id",
            get(catalog::get_resource)
                .put(catalog::update_resource)
                .delete(catalog::delete_resource),
        )
        .route(
            "/pathways",
            get(catalog::list_pathways).post(catalog::create_pathway),
        )
        .route(
            "/pathways/:id",
            get(catalog::get_pathway)
                .put(catalog::update_pathway)
                .delete(catalog::delete_pathway),
        )
        .route("/progress", post(progress::mark))
        .route("/progress/:id", patch(progress::update_entry))
        .route("/progress/me", get(progress::my_entries))
        .route("/progress/overview", get(progress::overview))
        .route("/progress/pathway/:id", get(progress::completion))
        .route("/progress/pathway/:id/users", get(progress::roster))
        .route("/progress/pathway/:id/entries", get(progress::entries_for_pathway))
        .route("/progress/comparative/:id", get(progress::comparative))
        .route("/queries", get(queries::list).post(queries::submit))
        .route("/queries/:id/status", patch(queries::set_status))
        .route("/events", get(content::list_events).post(content::create_event))
        .route(
            "/events/:id",
            get(content::get_event)
                .put(content::update_event)
                .delete(content::delete_event),
        )
        .route("/blogs", get(content::list_blogs).post(content::create_blog))
        .route(
            "/blogs/:id",
            get(content::get_blog)
                .put(content::update_blog)
                .delete(content::delete_blog),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Bind `addr` and serve until the future is dropped.
///
/// # Errors
///
/// Returns the I/O error if binding or serving fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP API listening");
    axum::serve(listener, app).await
}
