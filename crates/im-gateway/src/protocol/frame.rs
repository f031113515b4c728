//! Frame envelope
//!
//! One logical request or response unit exchanged over the socket. `seq` is
//! caller-assigned and echoed verbatim so the client can correlate async
//! replies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StatusCode;

/// Client request: `{"seq": "...", "cmd": "...", "data": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Caller-assigned correlation ID
    #[serde(default)]
    pub seq: String,

    /// Command string selecting the handler
    #[serde(default)]
    pub cmd: String,

    /// Command payload, schema depends on `cmd`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RequestFrame {
    /// Deserialize from the socket's text frame
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to a text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Server response / push:
/// `{"seq": "...", "cmd": "...", "code": N, "msg": "...", "data": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// Echo of the request's `seq` (or a server-minted ID for pushes)
    pub seq: String,

    /// Echo of the request's `cmd` (or the push command)
    pub cmd: String,

    /// Status code, `0` on success
    pub code: StatusCode,

    /// Fixed message for the status code
    pub msg: String,

    /// Response payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseFrame {
    /// Build a response with the code's canonical message
    #[must_use]
    pub fn new(
        seq: impl Into<String>,
        cmd: impl Into<String>,
        code: StatusCode,
        data: Option<Value>,
    ) -> Self {
        Self {
            seq: seq.into(),
            cmd: cmd.into(),
            code,
            msg: code.message().to_string(),
            data,
        }
    }

    /// Successful response with a payload
    #[must_use]
    pub fn ok(seq: impl Into<String>, cmd: impl Into<String>, data: Option<Value>) -> Self {
        Self::new(seq, cmd, StatusCode::Ok, data)
    }

    /// Failure response, no payload
    #[must_use]
    pub fn status(seq: impl Into<String>, cmd: impl Into<String>, code: StatusCode) -> Self {
        Self::new(seq, cmd, code, None)
    }

    /// Serialize to a text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from a text frame
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for ResponseFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ResponseFrame(seq={}, cmd={}, code={})",
            self.seq, self.cmd, self.code
        )
    }
}
