//! Individual WebSocket connection
//!
//! Per-socket state: identity, timestamps, the bounded outbound queue, and
//! the login state machine. The state machine is
//! Unauthenticated -> Authenticated -> Closed; there is no path back to
//! Unauthenticated on the same socket.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use im_core::{Identity, SessionKey};
use parking_lot::RwLock;
use tokio::sync::{mpsc, Notify};

/// Outbound queue bound. The bound doubles as admission control against a
/// stalled reader: producers drop rather than block when it fills.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 100;

/// Login state of a connection.
///
/// Identity is only reachable through the `Authenticated` variant, so code
/// cannot observe user/app IDs before login completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Socket is open, no identity yet
    Unauthenticated,
    /// Login completed; identity is fixed for the connection's life
    Authenticated(Identity),
}

/// Error returned by a failed non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    /// The outbound queue was closed
    #[error("outbound queue closed")]
    Closed,
    /// The queue bound was hit; the frame was dropped
    #[error("outbound queue full")]
    Full,
}

/// A single WebSocket connection
pub struct Connection {
    /// Unique connection ID
    id: String,

    /// Transport peer address, immutable for the connection's life
    addr: String,

    /// Producer half of the outbound queue; the writer task owns the consumer
    sender: mpsc::Sender<String>,

    /// Login state; written exactly once, on successful login
    state: RwLock<SessionState>,

    /// Unix seconds of socket establishment
    first_seen_at: u64,

    /// Unix seconds of login, zero until then
    login_at: AtomicU64,

    /// Unix seconds of the last heartbeat touch
    last_heartbeat_at: AtomicU64,

    /// Close-once latch
    closed: AtomicBool,

    /// Wakes the writer task on close
    shutdown: Notify,
}

impl Connection {
    /// Create a new connection; the first heartbeat is the connect time.
    pub fn new(addr: impl Into<String>, sender: mpsc::Sender<String>, now: u64) -> Arc<Self> {
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            addr: addr.into(),
            sender,
            state: RwLock::new(SessionState::Unauthenticated),
            first_seen_at: now,
            login_at: AtomicU64::new(0),
            last_heartbeat_at: AtomicU64::new(now),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The authenticated identity, `None` before login
    pub fn identity(&self) -> Option<Identity> {
        match &*self.state.read() {
            SessionState::Unauthenticated => None,
            SessionState::Authenticated(identity) => Some(identity.clone()),
        }
    }

    /// Registry/presence key, `None` before login
    pub fn session_key(&self) -> Option<SessionKey> {
        self.identity().map(|identity| identity.session_key())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.state.read(), SessionState::Authenticated(_))
    }

    /// Record a completed login. Sets identity and login time, and counts as
    /// a heartbeat touch. The duplicate-login guard lives in the login
    /// handler; this method is also used on trusted internal paths.
    pub fn login(&self, identity: Identity, now: u64) {
        *self.state.write() = SessionState::Authenticated(identity);
        self.login_at.store(now, Ordering::Relaxed);
        self.heartbeat(now);
    }

    /// Record a heartbeat touch
    pub fn heartbeat(&self, now: u64) {
        self.last_heartbeat_at.store(now, Ordering::Relaxed);
    }

    pub fn first_seen_at(&self) -> u64 {
        self.first_seen_at
    }

    pub fn login_at(&self) -> u64 {
        self.login_at.load(Ordering::Relaxed)
    }

    pub fn last_heartbeat_at(&self) -> u64 {
        self.last_heartbeat_at.load(Ordering::Relaxed)
    }

    /// Pure expiry predicate: `last_heartbeat + threshold <= now`
    pub fn is_heartbeat_expired(&self, now: u64, threshold_secs: u64) -> bool {
        self.last_heartbeat_at() + threshold_secs <= now
    }

    /// Non-blocking attempt to place a serialized frame on the outbound
    /// queue. Callers drop-and-log on failure; producers run on shared
    /// dispatch paths and must never stall on a slow peer.
    pub fn enqueue(&self, frame: String) -> Result<(), EnqueueError> {
        if self.is_closed() {
            return Err(EnqueueError::Closed);
        }
        self.sender.try_send(frame).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Close the outbound queue exactly once; subsequent `enqueue` calls
    /// fail with `Closed`, subsequent `close` calls are no-ops.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shutdown.notify_one();
            tracing::debug!(conn_id = %self.id, addr = %self.addr, "Connection closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolves once `close` has been called. Used by the writer task; the
    /// close permit is stored, so awaiting after the fact still resolves.
    pub async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        self.shutdown.notified().await;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("authenticated", &self.is_authenticated())
            .field("closed", &self.is_closed())
            .finish()
    }
}
