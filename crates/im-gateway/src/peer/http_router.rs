//! HTTP implementation of the peer push port

use std::time::Duration;

use async_trait::async_trait;
use im_core::{DomainError, PeerRouter, RepoResult, SessionKey};

use super::{PushAck, PushEnvelope};

/// Timeout for a single push; a peer that cannot accept a frame this fast
/// is treated as unreachable.
const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Pushes frames to peer gateway instances over their internal endpoint.
#[derive(Debug, Clone)]
pub struct HttpPeerRouter {
    client: reqwest::Client,
}

impl HttpPeerRouter {
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for HttpPeerRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerRouter for HttpPeerRouter {
    async fn push(&self, node_address: &str, key: &SessionKey, frame: &str) -> RepoResult<bool> {
        let url = format!("http://{node_address}/internal/push");
        let envelope = PushEnvelope {
            app_id: key.app_id.clone(),
            user_id: key.user_id.clone(),
            frame: frame.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&envelope)
            .send()
            .await
            .map_err(|err| DomainError::PeerRoute(err.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(DomainError::PeerRoute(format!(
                "peer {node_address} answered {}",
                response.status()
            )));
        }

        let ack: PushAck = response
            .json()
            .await
            .map_err(|err| DomainError::PeerRoute(err.to_string()))?;

        tracing::trace!(
            node = %node_address,
            key = %key,
            delivered = ack.delivered,
            "Peer push completed"
        );

        Ok(ack.delivered)
    }
}
