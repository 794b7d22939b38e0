use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use club_core::model::{
    PathwayDetail, PathwayDraft, PathwayId, Resource, ResourceDraft, ResourceId,
};

use crate::error::ApiError;
use crate::extract::Caller;
use crate::router::AppState;
use crate::routes::parse_param;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<ResourceRequest> for ResourceDraft {
    fn from(req: ResourceRequest) -> Self {
        ResourceDraft {
            title: req.title,
            description: req.description,
            url: req.url,
            kind: req.kind,
            estimated_minutes: req.estimated_minutes,
            tags: req.tags,
        }
    }
}

/// Pathway body. `newResources` are created alongside the pathway and
/// appended after `resources`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub resources: Vec<ResourceId>,
    #[serde(default)]
    pub new_resources: Vec<ResourceRequest>,
}

impl PathwayRequest {
    fn into_parts(self) -> (PathwayDraft, Vec<ResourceDraft>) {
        let draft = PathwayDraft {
            title: self.title,
            description: self.description,
            category: self.category,
            resource_ids: self.resources,
        };
        let new_resources = self.new_resources.into_iter().map(Into::into).collect();
        (draft, new_resources)
    }
}

pub async fn list_resources(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Vec<Resource>>, ApiError> {
    Ok(Json(state.services.catalog().list_resources(&actor).await?))
}

pub async fn get_resource(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<Resource>, ApiError> {
    let id: ResourceId = parse_param(&id)?;
    Ok(Json(state.services.catalog().get_resource(&actor, id).await?))
}

pub async fn create_resource(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(req): Json<ResourceRequest>,
) -> Result<(StatusCode, Json<Resource>), ApiError> {
    let resource = state
        .services
        .catalog()
        .create_resource(&actor, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

pub async fn update_resource(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<ResourceRequest>,
) -> Result<Json<Resource>, ApiError> {
    let id: ResourceId = parse_param(&id)?;
    let resource = state
        .services
        .catalog()
        .update_resource(&actor, id, req.into())
        .await?;
    Ok(Json(resource))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ResourceId = parse_param(&id)?;
    state.services.catalog().delete_resource(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_pathways(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Vec<PathwayDetail>>, ApiError> {
    Ok(Json(state.services.catalog().list_pathways(&actor).await?))
}

pub async fn get_pathway(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<PathwayDetail>, ApiError> {
    let id: PathwayId = parse_param(&id)?;
    Ok(Json(state.services.catalog().get_pathway(&actor, id).await?))
}

pub async fn create_pathway(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(req): Json<PathwayRequest>,
) -> Result<(StatusCode, Json<PathwayDetail>), ApiError> {
    let (draft, new_resources) = req.into_parts();
    let pathway = state
        .services
        .catalog()
        .create_pathway_with_resources(&actor, draft, new_resources)
        .await?;
    Ok((StatusCode::CREATED, Json(pathway)))
}

/// Replaces the pathway's attributes and resource list. `newResources` is
/// only honoured on create.
pub async fn update_pathway(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<PathwayRequest>,
) -> Result<Json<PathwayDetail>, ApiError> {
    let id: PathwayId = parse_param(&id)?;
    let (draft, new_resources) = req.into_parts();
    if !new_resources.is_empty() {
        return Err(ApiError::BadRequest(
            "newResources is only accepted when creating a pathway".to_string(),
        ));
    }
    let pathway = state
        .services
        .catalog()
        .update_pathway(&actor, id, draft)
        .await?;
    Ok(Json(pathway))
}

pub async fn delete_pathway(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: PathwayId = parse_param(&id)?;
    state.services.catalog().delete_pathway(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
