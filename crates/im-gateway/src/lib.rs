//! # im-gateway
//!
//! WebSocket-facing connection tier: per-socket session state machine,
//! single-writer connection registry, login/heartbeat/timeout protocol, and
//! cross-instance presence routing.

pub mod connection;
pub mod handlers;
pub mod peer;
pub mod protocol;
pub mod server;

/// Current wall-clock time in unix seconds.
#[must_use]
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
