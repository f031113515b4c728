//! Ports - interfaces the domain needs from the infrastructure
//!
//! The connection tier defines what it needs (presence publication and
//! cross-node push), and the infrastructure layer provides the
//! implementation: Redis for presence, HTTP for peer push, in-memory fakes
//! in tests.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::identity::SessionKey;
use crate::presence::PresenceRecord;

/// Result type for port operations
pub type RepoResult<T> = Result<T, DomainError>;

/// Shared presence store keyed by `(appID, userID)`.
///
/// Writes are idempotent last-writer-wins upserts; concurrent writers for
/// the same identity (rapid reconnect) converge without coordination. This
/// tier never deletes records - expiry is the store's TTL.
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    /// Create or overwrite the record for its `(appID, userID)`.
    async fn set_online(&self, record: &PresenceRecord) -> RepoResult<()>;

    /// Fetch the record, `None` when the identity has no live presence.
    async fn get_online(&self, key: &SessionKey) -> RepoResult<Option<PresenceRecord>>;
}

/// Push primitive toward the gateway instance named in a presence record.
#[async_trait]
pub trait PeerRouter: Send + Sync {
    /// Hand a serialized frame to `node_address` for local delivery to `key`.
    ///
    /// `Ok(true)` means the peer enqueued the frame on a live connection;
    /// `Ok(false)` means the peer was reachable but holds no such
    /// connection. Transport failures are `Err`.
    async fn push(&self, node_address: &str, key: &SessionKey, frame: &str) -> RepoResult<bool>;
}
