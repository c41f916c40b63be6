use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use std::path::Path as FsPath;
use tokio_util::io::ReaderStream;

use crate::error::AppError;
use crate::state::AppState;

/// Public endpoint: consume a token and stream the file it points at.
pub async fn download_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    // Removed from the cache before the file is touched.
    let path = state.tokens.redeem(&token)?;
    attachment_response(&path).await
}

/// Stream `path` as an attachment named after its basename.
pub async fn attachment_response(path: &FsPath) -> Result<Response, AppError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Config file vanished before download");
            return Err(AppError::NotFound("Configuration file not found.".into()));
        }
        Err(e) => return Err(AppError::IoUnavailable(e)),
    };
    let len = file
        .metadata()
        .await
        .map_err(AppError::IoUnavailable)?
        .len();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config.ovpn".into());
    let content_type = mime_guess::from_path(path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type.as_ref())
        .header("Content-Length", len.to_string())
        .header("Cache-Control", "no-store")
        .header("Content-Disposition", content_disposition(&file_name))
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

/// Plain quoted filename for ASCII names, RFC 5987 `filename*` otherwise.
fn content_disposition(file_name: &str) -> String {
    if file_name.is_ascii() {
        format!(
            "attachment; filename=\"{}\"",
            file_name.replace('\\', "\\\\").replace('"', "\\\"")
        )
    } else {
        format!(
            "attachment; filename*=UTF-8''{}",
            urlencoding::encode(file_name)
        )
    }
}
