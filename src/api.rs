//! HTTP API endpoints for session documents.
//!
//! Hosts create a session here, then every participant follows it over the
//! WebSocket relay.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::patch::{DocPath, Patch};
use crate::store::DocumentStore;
use crate::sync::Snapshot;
use crate::types::{SessionId, Variant};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub variant: Variant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
    pub snapshot: Snapshot,
}

/// Create a session document.
///
/// POST /api/sessions
///
/// The document starts with only its variant set; slots appear as
/// participants mount.
pub async fn create_session(
    State(store): State<DocumentStore>,
    Json(request): Json<CreateSessionRequest>,
) -> Response {
    let session_id = ulid::Ulid::new().to_string();
    let variant = match serde_json::to_value(request.variant) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to encode variant: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut patch = Patch::new();
    patch.set(DocPath::field("variant"), variant);
    let snapshot = store.apply(&session_id, &patch).await;

    tracing::info!("Created {:?} session {}", request.variant, session_id);
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            snapshot,
        }),
    )
        .into_response()
}

/// Current snapshot of a session.
///
/// GET /api/sessions/{id}
pub async fn get_session(
    State(store): State<DocumentStore>,
    Path(session_id): Path<SessionId>,
) -> Response {
    if !store.exists(&session_id).await {
        return (StatusCode::NOT_FOUND, format!("Unknown session {}", session_id)).into_response();
    }
    Json(store.snapshot(&session_id).await).into_response()
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
