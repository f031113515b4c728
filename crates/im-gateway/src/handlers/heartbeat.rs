//! `heartbeat` handler
//!
//! Touches the connection's heartbeat and refreshes the shared presence
//! record. A missing record is an implicit logout: the client is told it is
//! not logged in and must reconnect and log in again.

use std::sync::Arc;

use serde_json::Value;

use super::{parse_payload, Reply};
use crate::connection::Connection;
use crate::protocol::{HeartbeatPayload, StatusCode};
use crate::server::GatewayState;
use crate::unix_now;

pub struct HeartbeatHandler;

impl HeartbeatHandler {
    pub async fn handle(
        state: &GatewayState,
        conn: &Arc<Connection>,
        seq: &str,
        data: Option<&Value>,
    ) -> Reply {
        let payload: HeartbeatPayload = match parse_payload(data) {
            Ok(payload) => payload,
            Err(reply) => return reply,
        };

        let Some(identity) = conn.identity() else {
            tracing::debug!(seq = %seq, addr = %conn.addr(), "Heartbeat before login");
            return Reply::status(StatusCode::NotLoggedIn);
        };

        let key = identity.session_key();
        let mut record = match state.presence().get_online(&key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                // The record lapsed or was removed elsewhere; treat the
                // session as logged out.
                tracing::warn!(seq = %seq, key = %key, "Presence record missing on heartbeat");
                return Reply::status(StatusCode::NotLoggedIn);
            }
            Err(err) => {
                tracing::error!(seq = %seq, error = %err, "Presence read failed on heartbeat");
                return Reply::status(StatusCode::ServerError);
            }
        };

        let now = unix_now();
        conn.heartbeat(now);
        record.touch(now);

        if let Err(err) = state.presence().set_online(&record).await {
            tracing::error!(seq = %seq, error = %err, "Presence refresh failed on heartbeat");
            return Reply::status(StatusCode::ServerError);
        }

        tracing::trace!(
            seq = %seq,
            key = %key,
            reported_user = ?payload.user_id,
            "Heartbeat accepted"
        );

        Reply::ok_empty()
    }
}
