use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Exchange admin credentials for the header token the protected routes expect.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    if req.username != state.config.admin_username || req.password != state.config.admin_password
    {
        tracing::warn!(username = %req.username, "Rejected login");
        return Err(AppError::Unauthorized);
    }

    Ok(Json(json!({
        "data": { "token": state.config.admin_password },
        "error": null
    })))
}

pub async fn check_auth() -> Json<Value> {
    Json(json!({ "data": { "status": "ok" }, "error": null }))
}
