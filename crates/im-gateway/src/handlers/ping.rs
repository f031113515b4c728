//! `ping` handler

use std::sync::Arc;

use serde_json::Value;

use super::Reply;
use crate::connection::Connection;
use crate::server::GatewayState;

/// Liveness probe; no preconditions, constant payload.
pub struct PingHandler;

impl PingHandler {
    pub async fn handle(
        _state: &GatewayState,
        conn: &Arc<Connection>,
        seq: &str,
        _data: Option<&Value>,
    ) -> Reply {
        tracing::trace!(addr = %conn.addr(), seq = %seq, "Ping");
        Reply::ok(Value::String("pong".to_string()))
    }
}
