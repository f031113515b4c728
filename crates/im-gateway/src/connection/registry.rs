//! Connection registry
//!
//! Process-wide authority over live connections and the identity-keyed map.
//! All mutation is funneled through a single-writer event loop: producers
//! submit events over a channel and the loop owns the maps outright, so
//! login/logout/sweep get one total order and the maps need no locks.
//!
//! The loop never awaits a connection's outbound queue - every push it makes
//! goes through the non-blocking `enqueue`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use im_core::SessionKey;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::protocol::{PushBody, ResponseFrame, PUSH_ENTER, PUSH_EXIT};
use crate::unix_now;

use super::Connection;

/// Registry event queue bound
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Notification of a completed login, fed once into the event stream
#[derive(Debug)]
pub struct LoginEvent {
    pub key: SessionKey,
    /// The verified service token the client presented
    pub token: String,
    pub conn: Arc<Connection>,
}

/// Events accepted by the registry loop
#[derive(Debug)]
pub enum RegistryEvent {
    /// A socket opened; no identity yet
    Register(Arc<Connection>),
    /// A socket is gone. Always safe, idempotent.
    Unregister(Arc<Connection>),
    /// A login completed; insert/overwrite the identity mapping
    Login(LoginEvent),
    /// Local delivery lookup
    Lookup {
        key: SessionKey,
        reply: oneshot::Sender<Option<Arc<Connection>>>,
    },
    /// Evict connections whose heartbeat expired
    Sweep { now: u64, threshold_secs: u64 },
    /// Size snapshot, for logs and tests
    Counts {
        reply: oneshot::Sender<RegistryCounts>,
    },
}

/// Registry size snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryCounts {
    /// All live sockets, logged in or not
    pub connections: usize,
    /// Identity-keyed entries
    pub logged_in: usize,
}

/// Handle to the registry loop. Cheap to clone; all methods submit events.
#[derive(Debug, Clone)]
pub struct Registry {
    events: mpsc::Sender<RegistryEvent>,
}

impl Registry {
    /// Spawn the registry loop and return its handle.
    #[must_use]
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        tokio::spawn(RegistryTask::default().run(rx));
        Self { events: tx }
    }

    async fn submit(&self, event: RegistryEvent) {
        if self.events.send(event).await.is_err() {
            tracing::error!("Registry loop is gone; event dropped");
        }
    }

    /// Add a connection to the anonymous set.
    pub async fn register(&self, conn: Arc<Connection>) {
        self.submit(RegistryEvent::Register(conn)).await;
    }

    /// Remove a connection from all sets. Idempotent.
    pub async fn unregister(&self, conn: Arc<Connection>) {
        self.submit(RegistryEvent::Unregister(conn)).await;
    }

    /// Publish a completed login.
    pub async fn login(&self, event: LoginEvent) {
        self.submit(RegistryEvent::Login(event)).await;
    }

    /// Find the live connection for an identity on this node.
    pub async fn lookup(&self, key: SessionKey) -> Option<Arc<Connection>> {
        let (reply, rx) = oneshot::channel();
        self.submit(RegistryEvent::Lookup { key, reply }).await;
        rx.await.unwrap_or(None)
    }

    /// Run one eviction pass with an explicit clock, mainly for tests; the
    /// periodic sweeper calls this with the wall clock.
    pub async fn sweep(&self, now: u64, threshold_secs: u64) {
        self.submit(RegistryEvent::Sweep { now, threshold_secs }).await;
    }

    /// Current registry sizes.
    pub async fn counts(&self) -> RegistryCounts {
        let (reply, rx) = oneshot::channel();
        self.submit(RegistryEvent::Counts { reply }).await;
        rx.await.unwrap_or_default()
    }

    /// Start the periodic heartbeat sweep feeding into the event loop.
    pub fn start_sweeper(&self, sweep_interval_secs: u64, timeout_secs: u64) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(sweep_interval_secs.max(1)));
            // First tick fires immediately; skip it so a fresh process does
            // not sweep before anyone could heartbeat.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.sweep(unix_now(), timeout_secs).await;
            }
        })
    }
}

/// Loop-owned state: the maps are mutated by exactly one task.
#[derive(Default)]
struct RegistryTask {
    /// All live connections by connection ID
    conns: HashMap<String, Arc<Connection>>,
    /// Logged-in connections by identity. Plain map semantics: a later
    /// login under the same key replaces the entry (last-login-wins per
    /// node); single-device exclusivity is a backend policy concern.
    users: HashMap<SessionKey, Arc<Connection>>,
}

impl RegistryTask {
    async fn run(mut self, mut events: mpsc::Receiver<RegistryEvent>) {
        tracing::info!("Registry loop started");
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        tracing::info!("Registry loop ended");
    }

    /// Process one event. Deliberately synchronous: the loop must preserve
    /// arrival order and must never block on a connection's queue.
    fn handle(&mut self, event: RegistryEvent) {
        match event {
            RegistryEvent::Register(conn) => self.register(conn),
            RegistryEvent::Unregister(conn) => self.unregister(&conn),
            RegistryEvent::Login(login) => self.login(login),
            RegistryEvent::Lookup { key, reply } => {
                let found = self.users.get(&key).cloned();
                let _ = reply.send(found);
            }
            RegistryEvent::Sweep { now, threshold_secs } => self.sweep(now, threshold_secs),
            RegistryEvent::Counts { reply } => {
                let _ = reply.send(RegistryCounts {
                    connections: self.conns.len(),
                    logged_in: self.users.len(),
                });
            }
        }
    }

    fn register(&mut self, conn: Arc<Connection>) {
        tracing::debug!(conn_id = %conn.id(), addr = %conn.addr(), "Connection registered");
        self.conns.insert(conn.id().to_string(), conn);
    }

    fn unregister(&mut self, conn: &Arc<Connection>) {
        let was_known = self.conns.remove(conn.id()).is_some();

        if let Some(key) = conn.session_key() {
            // Only drop the identity mapping while it still points at this
            // connection: a newer login may have replaced it, and that
            // mapping must survive the old socket's teardown.
            let owns_mapping = self
                .users
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, conn));
            if owns_mapping {
                self.users.remove(&key);
                self.broadcast_notice(PUSH_EXIT, &key, conn.id());
            }
        }

        if was_known {
            tracing::debug!(conn_id = %conn.id(), "Connection unregistered");
        }
    }

    fn login(&mut self, event: LoginEvent) {
        let LoginEvent { key, token, conn } = event;
        tracing::debug!(
            conn_id = %conn.id(),
            key = %key,
            token_len = token.len(),
            "Login recorded"
        );

        let replaced = self.users.insert(key.clone(), conn.clone());
        if let Some(old) = replaced {
            tracing::warn!(
                key = %key,
                old_conn = %old.id(),
                new_conn = %conn.id(),
                "Identity mapping replaced by a newer login"
            );
        }

        self.broadcast_notice(PUSH_ENTER, &key, conn.id());
    }

    fn sweep(&mut self, now: u64, threshold_secs: u64) {
        let expired: Vec<Arc<Connection>> = self
            .users
            .values()
            .filter(|conn| conn.is_heartbeat_expired(now, threshold_secs))
            .cloned()
            .collect();

        for conn in expired {
            tracing::warn!(
                conn_id = %conn.id(),
                addr = %conn.addr(),
                last_heartbeat_at = conn.last_heartbeat_at(),
                "Heartbeat expired, evicting connection"
            );
            conn.close();
            self.unregister(&conn);
        }
    }

    /// Tell the other logged-in connections of the same app that a user
    /// came online or went away. Fire-and-forget per recipient.
    fn broadcast_notice(&self, cmd: &str, key: &SessionKey, origin_conn_id: &str) {
        let text = if cmd == PUSH_ENTER { "online" } else { "offline" };
        let notice = ResponseFrame::ok(
            uuid::Uuid::new_v4().to_string(),
            cmd,
            serde_json::to_value(PushBody::text(&key.user_id, text)).ok(),
        );
        let Ok(frame) = notice.to_json() else {
            return;
        };

        let mut sent = 0usize;
        for (other_key, other) in &self.users {
            if other.id() == origin_conn_id || other_key.app_id != key.app_id {
                continue;
            }
            match other.enqueue(frame.clone()) {
                Ok(()) => sent += 1,
                Err(err) => {
                    tracing::debug!(conn_id = %other.id(), error = %err, "Notice dropped");
                }
            }
        }
        tracing::trace!(cmd = %cmd, key = %key, sent = sent, "Presence notice sent");
    }
}
