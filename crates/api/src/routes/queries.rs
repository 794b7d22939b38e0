use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use club_core::model::{PageRequest, QueryId, QueryPage, QueryStatus, UserQuery};

use crate::error::ApiError;
use crate::extract::Caller;
use crate::router::AppState;
use crate::routes::parse_param;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn submit(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<UserQuery>), ApiError> {
    let query = state
        .services
        .queries()
        .submit(
            &actor,
            &req.first_name,
            &req.last_name,
            &req.email,
            &req.message,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(query)))
}

pub async fn list(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Query(params): Query<PageParams>,
) -> Result<Json<QueryPage>, ApiError> {
    let page = PageRequest::new(params.page, params.limit);
    Ok(Json(state.services.queries().list(&actor, page).await?))
}

pub async fn set_status(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<UserQuery>, ApiError> {
    let id: QueryId = parse_param(&id)?;
    let status: QueryStatus = parse_param(&req.status)?;
    let query = state
        .services
        .queries()
        .set_status(&actor, id, status)
        .await?;
    Ok(Json(query))
}
