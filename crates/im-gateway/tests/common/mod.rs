//! Shared fixtures for gateway integration tests
//!
//! Presence and peer routing are faked behind their ports so the suite runs
//! without Redis or a second gateway process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use im_common::JwtService;
use im_core::{DomainError, PeerRouter, PresenceRecord, PresenceRepository, RepoResult, SessionKey};
use im_gateway::connection::{Connection, Registry, OUTBOUND_QUEUE_CAPACITY};
use im_gateway::handlers;
use im_gateway::protocol::ResponseFrame;
use im_gateway::server::GatewayState;
use im_gateway::unix_now;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const NODE_ADDR: &str = "127.0.0.1:9100";

/// In-memory presence store with write-failure injection
#[derive(Default)]
pub struct MemoryPresence {
    records: Mutex<HashMap<String, PresenceRecord>>,
    failing: AtomicBool,
}

impl MemoryPresence {
    pub fn insert(&self, record: PresenceRecord) {
        self.records
            .lock()
            .insert(record.session_key().cache_key(), record);
    }

    pub fn get(&self, key: &SessionKey) -> Option<PresenceRecord> {
        self.records.lock().get(&key.cache_key()).cloned()
    }

    /// Simulate TTL lapse or an external offline notification.
    pub fn remove(&self, key: &SessionKey) {
        self.records.lock().remove(&key.cache_key());
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PresenceRepository for MemoryPresence {
    async fn set_online(&self, record: &PresenceRecord) -> RepoResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::PresenceStore("injected failure".to_string()));
        }
        self.insert(record.clone());
        Ok(())
    }

    async fn get_online(&self, key: &SessionKey) -> RepoResult<Option<PresenceRecord>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::PresenceStore("injected failure".to_string()));
        }
        Ok(self.get(key))
    }
}

/// Peer router fake that records pushes and answers a scripted result
pub struct RecordingPeer {
    pub pushes: Mutex<Vec<(String, SessionKey, String)>>,
    delivered: AtomicBool,
    failing: AtomicBool,
}

impl Default for RecordingPeer {
    fn default() -> Self {
        Self {
            pushes: Mutex::new(Vec::new()),
            delivered: AtomicBool::new(true),
            failing: AtomicBool::new(false),
        }
    }
}

impl RecordingPeer {
    pub fn set_delivered(&self, delivered: bool) {
        self.delivered.store(delivered, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().len()
    }
}

#[async_trait]
impl PeerRouter for RecordingPeer {
    async fn push(&self, node_address: &str, key: &SessionKey, frame: &str) -> RepoResult<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::PeerRoute("injected failure".to_string()));
        }
        self.pushes
            .lock()
            .push((node_address.to_string(), key.clone(), frame.to_string()));
        Ok(self.delivered.load(Ordering::SeqCst))
    }
}

/// Everything a test needs to drive the gateway in-process
pub struct TestContext {
    pub state: GatewayState,
    pub presence: Arc<MemoryPresence>,
    pub peer: Arc<RecordingPeer>,
    pub jwt: Arc<JwtService>,
}

impl TestContext {
    pub fn new() -> Self {
        let presence = Arc::new(MemoryPresence::default());
        let peer = Arc::new(RecordingPeer::default());
        let jwt = Arc::new(JwtService::new(TEST_SECRET, 3600));
        let registry = Registry::spawn();

        let state = GatewayState::new(
            registry,
            presence.clone(),
            peer.clone(),
            jwt.clone(),
            NODE_ADDR,
        );

        Self {
            state,
            presence,
            peer,
            jwt,
        }
    }

    /// Open and register a connection, returning its outbound queue.
    pub async fn connect(&self) -> (Arc<Connection>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let conn = Connection::new("198.51.100.7:40000", tx, unix_now());
        self.state.registry().register(conn.clone()).await;
        (conn, rx)
    }

    /// Run one request through the dispatcher.
    pub async fn request(
        &self,
        conn: &Arc<Connection>,
        seq: &str,
        cmd: &str,
        data: Value,
    ) -> ResponseFrame {
        let text = serde_json::json!({"seq": seq, "cmd": cmd, "data": data}).to_string();
        handlers::dispatch(&self.state, conn, &text).await
    }

    /// Log a connection in as `(app_id, user_id)` with a freshly minted token.
    pub async fn login(
        &self,
        conn: &Arc<Connection>,
        app_id: &str,
        user_id: &str,
    ) -> ResponseFrame {
        let token = self.jwt.issue_token(user_id, app_id).unwrap();
        self.request(
            conn,
            "login-seq",
            "login",
            serde_json::json!({"serviceToken": token}),
        )
        .await
    }
}

/// Drain everything currently sitting in an outbound queue.
pub fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<ResponseFrame> {
    let mut frames = Vec::new();
    while let Ok(raw) = rx.try_recv() {
        frames.push(ResponseFrame::from_json(&raw).unwrap());
    }
    frames
}
