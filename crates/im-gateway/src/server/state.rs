//! Gateway state
//!
//! Shared dependencies for the gateway server. Presence and peer routing
//! are held behind their ports so tests can inject in-memory fakes.

use std::sync::Arc;

use im_common::JwtService;
use im_core::{PeerRouter, PresenceRepository};

use crate::connection::Registry;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// Handle to the registry event loop
    registry: Registry,
    /// Shared presence store
    presence: Arc<dyn PresenceRepository>,
    /// Push primitive toward peer gateway instances
    peers: Arc<dyn PeerRouter>,
    /// Token verification
    jwt: Arc<JwtService>,
    /// Address this node publishes into presence records
    node_address: Arc<String>,
}

impl GatewayState {
    pub fn new(
        registry: Registry,
        presence: Arc<dyn PresenceRepository>,
        peers: Arc<dyn PeerRouter>,
        jwt: Arc<JwtService>,
        node_address: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            presence,
            peers,
            jwt,
            node_address: Arc::new(node_address.into()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn presence(&self) -> &dyn PresenceRepository {
        self.presence.as_ref()
    }

    pub fn peers(&self) -> &dyn PeerRouter {
        self.peers.as_ref()
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn node_address(&self) -> &str {
        &self.node_address
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("node_address", &self.node_address)
            .finish_non_exhaustive()
    }
}
