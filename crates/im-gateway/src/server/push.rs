//! Internal cross-node push endpoint
//!
//! Peer gateway instances deliver frames here when presence names this node
//! as the owner of the recipient's socket.

use axum::{extract::State, http::StatusCode as HttpStatus, response::IntoResponse, Json};
use im_core::SessionKey;

use crate::peer::{PushAck, PushEnvelope};
use crate::server::GatewayState;

/// `POST /internal/push`
pub async fn push_handler(
    State(state): State<GatewayState>,
    Json(envelope): Json<PushEnvelope>,
) -> impl IntoResponse {
    let key = SessionKey::new(envelope.app_id, envelope.user_id);

    match state.registry().lookup(key.clone()).await {
        Some(conn) => {
            if let Err(err) = conn.enqueue(envelope.frame) {
                tracing::warn!(
                    conn_id = %conn.id(),
                    key = %key,
                    error = %err,
                    "Pushed frame dropped"
                );
            }
            (HttpStatus::OK, Json(PushAck { delivered: true }))
        }
        None => {
            tracing::debug!(key = %key, "Push for unknown recipient");
            (HttpStatus::NOT_FOUND, Json(PushAck { delivered: false }))
        }
    }
}
