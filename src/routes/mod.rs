pub mod clients;
pub mod downloads;
pub mod health;
pub mod session;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::require_admin_token;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/api/login", post(session::login))
        .route("/api/download/{token}", get(downloads::download_by_token));

    // Authenticated API routes
    let api_routes = Router::new()
        .route("/check-auth", get(session::check_auth))
        .route("/status", get(health::status))
        .route("/clients", get(clients::list_clients))
        .route("/clients", post(clients::create_client))
        .route("/clients/{id}", delete(clients::delete_client))
        .route("/clients/{id}/config", get(clients::download_config))
        .route("/clients/{id}/qr-token", get(clients::issue_download_token))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let x_request_id = http::HeaderName::from_static("x-request-id");

    Router::new()
        .merge(public_routes)
        .nest("/api", api_routes)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
