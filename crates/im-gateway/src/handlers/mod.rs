//! Command handlers
//!
//! Each handler is a pure function of `(connection, seq, payload)` to
//! `(status, data)`. The dispatcher parses the envelope, resolves the
//! command, and wraps the handler's reply back into a response frame - one
//! response per request, malformed input included; nothing here ever closes
//! the socket.

mod heartbeat;
mod login;
mod message;
mod ping;

pub use heartbeat::HeartbeatHandler;
pub use login::LoginHandler;
pub use message::{SendAudioHandler, SendMessageHandler};
pub use ping::PingHandler;

use std::sync::Arc;

use serde_json::Value;

use crate::connection::Connection;
use crate::protocol::{Command, RequestFrame, ResponseFrame, StatusCode};
use crate::server::GatewayState;

/// Outcome of a command handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: StatusCode,
    pub data: Option<Value>,
}

impl Reply {
    /// Success with a payload
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            code: StatusCode::Ok,
            data: Some(data),
        }
    }

    /// Success with no payload
    #[must_use]
    pub fn ok_empty() -> Self {
        Self {
            code: StatusCode::Ok,
            data: None,
        }
    }

    /// Failure with a status code
    #[must_use]
    pub fn status(code: StatusCode) -> Self {
        Self { code, data: None }
    }
}

/// Parse a handler payload out of the request's `data` field.
///
/// A missing or null `data` deserializes to the payload's defaults (field
/// emptiness is a validation concern); anything present but malformed is a
/// parameter-illegal failure scoped to this one request.
fn parse_payload<T>(data: Option<&Value>) -> Result<T, Reply>
where
    T: serde::de::DeserializeOwned + Default,
{
    match data {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
            tracing::debug!(error = %err, "Payload failed to decode");
            Reply::status(StatusCode::ParameterIllegal)
        }),
    }
}

/// Handle one decoded text frame and produce its response frame.
///
/// Handlers run synchronously on the caller (the connection's reader task),
/// so responses are produced in request order per connection.
pub async fn dispatch(
    state: &GatewayState,
    conn: &Arc<Connection>,
    text: &str,
) -> ResponseFrame {
    let request = match RequestFrame::from_json(text) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(
                conn_id = %conn.id(),
                error = %err,
                "Unparseable request frame"
            );
            return ResponseFrame::status("", "", StatusCode::ParameterIllegal);
        }
    };

    let Some(command) = Command::parse(&request.cmd) else {
        tracing::debug!(
            conn_id = %conn.id(),
            cmd = %request.cmd,
            "Unknown command"
        );
        return ResponseFrame::status(request.seq, request.cmd, StatusCode::CommandNotFound);
    };

    tracing::trace!(
        conn_id = %conn.id(),
        cmd = %command,
        seq = %request.seq,
        "Dispatching request"
    );

    let data = request.data.as_ref();
    let reply = match command {
        Command::Ping => PingHandler::handle(state, conn, &request.seq, data).await,
        Command::Login => LoginHandler::handle(state, conn, &request.seq, data).await,
        Command::Heartbeat => HeartbeatHandler::handle(state, conn, &request.seq, data).await,
        Command::SendMessage => SendMessageHandler::handle(state, conn, &request.seq, data).await,
        Command::SendAudio => SendAudioHandler::handle(state, conn, &request.seq, data).await,
    };

    ResponseFrame::new(request.seq, request.cmd, reply.code, reply.data)
}
