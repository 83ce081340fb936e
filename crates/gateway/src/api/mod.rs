pub mod auth;
pub mod health;
pub mod inbound;
pub mod sessions;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use pa_domain::error::Error;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **protected**
/// (gated behind the `PARLEY_API_TOKEN` bearer-token middleware).
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/health", get(health::health));

    let protected = Router::new()
        // Channel adapter contract
        .route("/v1/tenants/:tenant/inbound", post(inbound::inbound))
        // Session administration
        .route("/v1/tenants/:tenant/sessions", get(sessions::list_sessions))
        .route(
            "/v1/tenants/:tenant/sessions/:user",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        // Apply API auth middleware to all protected routes.
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public.merge(protected)
}

/// `{"error": "..."}` with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Map a domain error onto an HTTP status.
pub(crate) fn domain_error(err: &Error) -> Response {
    let status = match err {
        Error::TenantNotFound(_) => StatusCode::NOT_FOUND,
        Error::Config(_) | Error::Dialog(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::Bridge(_) | Error::Backend { .. } | Error::Http(_) => StatusCode::BAD_GATEWAY,
        Error::Io(_) | Error::Json(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}
