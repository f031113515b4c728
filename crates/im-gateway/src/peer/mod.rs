//! Cross-node push
//!
//! When presence says another gateway instance owns the recipient's socket,
//! the serialized frame is handed to that node over its internal push
//! endpoint. This module carries the wire envelope and the HTTP client side;
//! the receiving endpoint lives in `server::push`.

mod http_router;

pub use http_router::HttpPeerRouter;

use serde::{Deserialize, Serialize};

/// Frame handoff between gateway instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    #[serde(rename = "appID")]
    pub app_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    /// The fully serialized frame, delivered byte-for-byte
    pub frame: String,
}

/// Reply from the receiving node
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PushAck {
    pub delivered: bool,
}
