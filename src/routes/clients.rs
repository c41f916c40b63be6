use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::client::{
    ClientKind, ConfigType, ConfigTypeQuery, CreateClientRequest, ListClientsQuery,
};
use crate::routes::downloads::attachment_response;
use crate::state::AppState;

fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid client ID".into()))
}

fn config_type(query: &ConfigTypeQuery) -> Result<ConfigType, AppError> {
    query.config_type().map_err(|_| {
        AppError::BadRequest("Invalid config type. Must be 'vpn' or 'antizapret'.".into())
    })
}

pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<Value>, AppError> {
    let page = state
        .clients
        .list_paginated(query.page(), query.limit())
        .await?;

    Ok(Json(json!({ "data": page, "error": null })))
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(req): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    if req.kind != "openvpn" {
        return Err(AppError::NotImplemented(format!(
            "Creating '{}' clients is not supported",
            req.kind
        )));
    }

    let client = state.clients.create(name, req.expires_in).await?;
    tracing::info!(name = %client.name, expires_in = req.expires_in, "Client created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": client, "error": null })),
    ))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    let client = state.clients.delete_by_id(id).await?;
    tracing::info!(id, name = %client.name, "Client deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Direct download. The path segment is the client *name*.
pub async fn download_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ConfigTypeQuery>,
) -> Result<axum::response::Response, AppError> {
    let config_type = config_type(&query)?;
    let path = state.clients.resolve_config_path(&name, config_type).await?;

    tracing::info!(name = %name, path = %path.display(), "Serving config file");
    attachment_response(&path).await
}

pub async fn issue_download_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ConfigTypeQuery>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id)?;
    let config_type = config_type(&query)?;

    let client = state.clients.find_by_id(id).await?;
    if client.kind != ClientKind::OpenVPN {
        return Err(AppError::BadRequest(
            "QR code generation is only supported for OpenVPN clients.".into(),
        ));
    }

    let path = state
        .clients
        .resolve_config_path(&client.name, config_type)
        .await?;
    let token = state.tokens.issue(path)?;

    Ok(Json(json!({
        "data": { "download_url": format!("/api/download/{}", token) },
        "error": null
    })))
}
