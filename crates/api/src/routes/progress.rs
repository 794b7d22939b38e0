use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use club_core::Permission;
use club_core::model::{PathwayId, ProgressEntry, ProgressId, ProgressStatus, ResourceId};
use services::{EntryDetail, OverviewItem, PathwayCompletion, RosterMember};

use crate::error::ApiError;
use crate::extract::Caller;
use crate::router::AppState;
use crate::routes::parse_param;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub pathway_id: PathwayId,
    pub resource_id: ResourceId,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub source_platform: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntryUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn mark(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(req): Json<MarkRequest>,
) -> Result<Json<ProgressEntry>, ApiError> {
    actor.require(Permission::TrackOwnProgress)?;
    let status: ProgressStatus = parse_param(&req.status)?;
    let entry = state
        .services
        .progress()
        .mark(
            &actor,
            req.pathway_id,
            req.resource_id,
            status,
            req.notes,
            req.source_platform,
        )
        .await?;
    Ok(Json(entry))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<EntryUpdateRequest>,
) -> Result<Json<ProgressEntry>, ApiError> {
    actor.require(Permission::TrackOwnProgress)?;
    let id: ProgressId = parse_param(&id)?;
    let status: ProgressStatus = parse_param(&req.status)?;
    let entry = state
        .services
        .progress()
        .update_entry(&actor, id, status, req.notes)
        .await?;
    Ok(Json(entry))
}

pub async fn my_entries(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Vec<EntryDetail>>, ApiError> {
    Ok(Json(state.services.progress().my_entries(&actor).await?))
}

pub async fn overview(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Vec<OverviewItem>>, ApiError> {
    Ok(Json(state.services.progress().overview(&actor).await?))
}

pub async fn completion(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<PathwayCompletion>, ApiError> {
    let id: PathwayId = parse_param(&id)?;
    Ok(Json(state.services.progress().completion(&actor, id).await?))
}

pub async fn roster(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<RosterMember>>, ApiError> {
    let id: PathwayId = parse_param(&id)?;
    Ok(Json(state.services.progress().roster(&actor, id).await?))
}

pub async fn entries_for_pathway(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<ProgressEntry>>, ApiError> {
    let id: PathwayId = parse_param(&id)?;
    let entries = state
        .services
        .progress()
        .entries_for_pathway(&actor, id)
        .await?;
    Ok(Json(entries))
}

pub async fn comparative(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<RosterMember>>, ApiError> {
    let id: PathwayId = parse_param(&id)?;
    Ok(Json(state.services.progress().comparative(&actor, id).await?))
}
