//! API authentication middleware.
//!
//! The token comes from `server.api_token` or the env var named by
//! `server.api_token_env` (default `PARLEY_API_TOKEN`), read **once at
//! startup**; only its SHA-256 digest is kept in `AppState`.
//! - With a token, every protected request must carry
//!   `Authorization: Bearer <token>`.
//! - Without one, the server logs a warning once and allows
//!   unauthenticated access (dev mode).

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

use super::error_response;

/// Axum middleware that enforces bearer-token authentication on protected
/// routes. Attach via `axum::middleware::from_fn_with_state`.
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let expected_hash = match &state.api_token_hash {
        Some(h) => h,
        None => return next.run(req).await,
    };

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    // Compare fixed-length digests so the token length does not leak.
    let provided_hash = Sha256::digest(provided.as_bytes());

    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        return error_response(StatusCode::UNAUTHORIZED, "invalid or missing API token");
    }

    next.run(req).await
}

/// SHA-256 digest of the configured token, if any.
pub fn token_hash(token: Option<&str>) -> Option<Vec<u8>> {
    token
        .filter(|t| !t.is_empty())
        .map(|t| Sha256::digest(t.as_bytes()).to_vec())
}
