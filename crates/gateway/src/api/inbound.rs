//! Inbound channel contract — the normalized envelope channel adapters post.
//!
//! `POST /v1/tenants/:tenant/inbound` runs one full turn (blocking) and
//! returns the ordered outbound messages for the adapter to render.  An
//! empty `messages` list means nothing should be sent (e.g. a message
//! forwarded to a live agent).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use pa_domain::dialog::{DialogEvent, OutboundMessage};

use crate::runtime::InboundTurn;
use crate::state::AppState;

use super::{domain_error, error_response};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEnvelope {
    /// Channel-scoped user id.
    pub user_id: String,
    /// `{"kind": "text" | "action" | "raw" | "lifecycle", "payload": ...}`.
    pub event: DialogEvent,
    /// Display name for live agents (not used for routing).
    #[serde(default, alias = "displayName")]
    pub display_name_hint: Option<String>,
    /// Connector name: `"whatsapp"`, `"line"`, `"web"`, etc.
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InboundResponse {
    pub tenant_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub state: Option<String>,
    pub messages: Vec<OutboundMessage>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/tenants/:tenant/inbound
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn inbound(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(body): Json<InboundEnvelope>,
) -> Response {
    if body.user_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "userId must not be empty");
    }

    let mut turn = InboundTurn::new(tenant_id.clone(), body.user_id.clone(), body.event);
    turn.display_name = body.display_name_hint;
    turn.channel = body.channel;

    match state.orchestrator.handle(turn).await {
        Ok(outcome) => Json(InboundResponse {
            tenant_id,
            user_id: body.user_id,
            session_id: outcome.session_id,
            state: outcome.state,
            messages: outcome.messages,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(tenant_id = %tenant_id, error = %e, "inbound rejected");
            domain_error(&e)
        }
    }
}
