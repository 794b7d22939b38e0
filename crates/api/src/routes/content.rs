//! Club events and blog posts.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use club_core::model::{Blog, BlogDraft, BlogId, Event, EventDraft, EventId};

use crate::error::ApiError;
use crate::extract::Caller;
use crate::router::AppState;
use crate::routes::parse_param;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub online_url: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<EventRequest> for EventDraft {
    fn from(req: EventRequest) -> Self {
        EventDraft {
            title: req.title,
            description: req.description,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            location: req.location,
            online_url: req.online_url,
            published: req.published,
            image_url: req.image_url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
}

impl From<BlogRequest> for BlogDraft {
    fn from(req: BlogRequest) -> Self {
        BlogDraft {
            title: req.title,
            content: req.content,
            tags: req.tags,
            image_url: req.image_url,
            visibility: req.visibility,
        }
    }
}

pub async fn list_events(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.services.events().list(&actor).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let id: EventId = parse_param(&id)?;
    Ok(Json(state.services.events().get(&actor, id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(req): Json<EventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = state.services.events().create(&actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<EventRequest>,
) -> Result<Json<Event>, ApiError> {
    let id: EventId = parse_param(&id)?;
    let event = state
        .services
        .events()
        .update(&actor, id, req.into())
        .await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: EventId = parse_param(&id)?;
    state.services.events().delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_blogs(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Vec<Blog>>, ApiError> {
    Ok(Json(state.services.blogs().list(&actor).await?))
}

pub async fn get_blog(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<Blog>, ApiError> {
    let id: BlogId = parse_param(&id)?;
    Ok(Json(state.services.blogs().get(&actor, id).await?))
}

pub async fn create_blog(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(req): Json<BlogRequest>,
) -> Result<(StatusCode, Json<Blog>), ApiError> {
    let blog = state.services.blogs().create(&actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(blog)))
}

pub async fn update_blog(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<BlogRequest>,
) -> Result<Json<Blog>, ApiError> {
    let id: BlogId = parse_param(&id)?;
    let blog = state
        .services
        .blogs()
        .update(&actor, id, req.into())
        .await?;
    Ok(Json(blog))
}

pub async fn delete_blog(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: BlogId = parse_param(&id)?;
    state.services.blogs().delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
