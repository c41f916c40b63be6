use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

pub const AUTH_HEADER: &str = "X-Auth-Token";

/// Admin check for the protected routes: the `X-Auth-Token` header must
/// equal the configured admin password.
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state.config.admin_password.as_str();
    let authorized = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|h| h.to_str().ok())
        // An empty password never authenticates anyone.
        .is_some_and(|token| !expected.is_empty() && token == expected);

    if !authorized {
        tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
