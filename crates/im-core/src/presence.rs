//! Presence record
//!
//! The externally shared fact "this identity is currently owned by this
//! node". Written on login and on every accepted heartbeat, read by any node
//! that needs to route a frame to the user. Records are last-writer-wins
//! upserts; staleness is bounded by the store's TTL, not by explicit deletes
//! from this tier.

use serde::{Deserialize, Serialize};

use crate::identity::SessionKey;

/// One presence record per logged-in `(appID, userID)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    /// host:port of the gateway process that owns the live socket.
    pub node_address: String,
    /// Transport peer address of the client socket.
    pub client_address: String,
    #[serde(rename = "appID")]
    pub app_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Unix seconds of the successful login.
    pub login_at: u64,
    /// Unix seconds of the last accepted heartbeat.
    pub last_heartbeat_at: u64,
}

impl PresenceRecord {
    #[must_use]
    pub fn new(
        node_address: impl Into<String>,
        client_address: impl Into<String>,
        app_id: impl Into<String>,
        user_id: impl Into<String>,
        now: u64,
    ) -> Self {
        Self {
            node_address: node_address.into(),
            client_address: client_address.into(),
            app_id: app_id.into(),
            user_id: user_id.into(),
            login_at: now,
            last_heartbeat_at: now,
        }
    }

    /// Key this record is stored under.
    #[must_use]
    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(self.app_id.clone(), self.user_id.clone())
    }

    /// Refresh the heartbeat timestamp, keeping the login time.
    pub fn touch(&mut self, now: u64) {
        self.last_heartbeat_at = now;
    }

    /// Whether this record points at the given node.
    #[must_use]
    pub fn is_owned_by(&self, node_address: &str) -> bool {
        self.node_address == node_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_touch_keeps_login_time() {
        let mut record = PresenceRecord::new("10.0.0.1:8020", "1.2.3.4:5555", "appA", "u1", 100);
        record.touch(160);

        assert_eq!(record.login_at, 100);
        assert_eq!(record.last_heartbeat_at, 160);
    }

    #[test]
    fn test_record_ownership() {
        let record = PresenceRecord::new("10.0.0.1:8020", "1.2.3.4:5555", "appA", "u1", 100);

        assert!(record.is_owned_by("10.0.0.1:8020"));
        assert!(!record.is_owned_by("10.0.0.2:8020"));
    }

    #[test]
    fn test_record_wire_shape() {
        let record = PresenceRecord::new("n1:1", "c1:2", "appA", "u1", 7);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["nodeAddress"], "n1:1");
        assert_eq!(json["clientAddress"], "c1:2");
        assert_eq!(json["appID"], "appA");
        assert_eq!(json["userID"], "u1");
        assert_eq!(json["loginAt"], 7);
        assert_eq!(json["lastHeartbeatAt"], 7);

        let back: PresenceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
