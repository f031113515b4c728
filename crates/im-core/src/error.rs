//! Domain errors - error types for the domain layer

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    /// Presence store read/write failed.
    #[error("Presence store error: {0}")]
    PresenceStore(String),

    /// Cross-node push could not reach the owning gateway.
    #[error("Peer routing error: {0}")]
    PeerRoute(String),

    /// A value could not be (de)serialized for the shared store.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DomainError {
    /// Whether the failure came from a shared-store dependency (as opposed
    /// to a peer gateway being unreachable).
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(self, Self::PresenceStore(_) | Self::Serialization(_))
    }
}
