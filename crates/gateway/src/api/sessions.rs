//! Session administration endpoints.
//!
//! Reads here never refresh a session's activity; only channel traffic
//! keeps a conversation alive.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use pa_domain::error::Error;
use pa_sessions::SessionKey;

use crate::state::AppState;

use super::{domain_error, error_response};

fn known_tenant(state: &AppState, tenant_id: &str) -> Result<(), Response> {
    match state.tenants.get(tenant_id) {
        Some(_) => Ok(()),
        None => Err(domain_error(&Error::TenantNotFound(tenant_id.to_owned()))),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/tenants/:tenant/sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_sessions(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Response {
    if let Err(resp) = known_tenant(&state, &tenant_id) {
        return resp;
    }
    let sessions = state.sessions.list_by_tenant(&tenant_id);
    Json(serde_json::json!({
        "tenant_id": tenant_id,
        "count": sessions.len(),
        "sessions": sessions,
    }))
    .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/tenants/:tenant/sessions/:user
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_session(
    State(state): State<AppState>,
    Path((tenant_id, user_id)): Path<(String, String)>,
) -> Response {
    if let Err(resp) = known_tenant(&state, &tenant_id) {
        return resp;
    }
    let key = SessionKey::new(tenant_id, user_id);
    match state.sessions.peek(&key) {
        Some(session) => Json(session).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no session for {key}")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DELETE /v1/tenants/:tenant/sessions/:user
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Deleting an absent session is not an error; `deleted` says whether
/// one existed.
pub async fn delete_session(
    State(state): State<AppState>,
    Path((tenant_id, user_id)): Path<(String, String)>,
) -> Response {
    if let Err(resp) = known_tenant(&state, &tenant_id) {
        return resp;
    }
    let key = SessionKey::new(tenant_id, user_id);
    let deleted = state.orchestrator.end_session(&key).await;
    tracing::info!(session_key = %key, deleted, "session deleted via API");
    Json(serde_json::json!({
        "session_key": key.to_string(),
        "deleted": deleted,
    }))
    .into_response()
}
