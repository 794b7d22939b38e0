use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use club_core::Role;
use club_core::model::{User, UserId};

use crate::error::ApiError;
use crate::extract::Caller;
use crate::router::AppState;
use crate::routes::parse_param;

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

pub async fn list(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.services.users().list(&actor).await?))
}

pub async fn me(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.services.users().me(&actor).await?))
}

pub async fn assign_role(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<User>, ApiError> {
    let user_id: UserId = parse_param(&id)?;
    let role: Role = parse_param(&req.role)?;
    let user = state
        .services
        .users()
        .assign_role(&actor, user_id, role)
        .await?;
    Ok(Json(user))
}
