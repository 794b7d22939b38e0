use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

use services::IssuedSession;

use crate::error::ApiError;
use crate::extract::bearer_token;
use crate::router::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub year: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<IssuedSession>), ApiError> {
    let session = state
        .services
        .auth()
        .register(&req.name, &req.email, &req.password, req.year)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<IssuedSession>, ApiError> {
    let session = state
        .services
        .auth()
        .login(&req.email, &req.password)
        .await?;
    Ok(Json(session))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    if let Some(token) = bearer_token(&headers)? {
        state.services.auth().logout(token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
