//! Identity value types
//!
//! A logged-in connection is identified by the `(appID, userID)` pair. The
//! pair doubles as the key under which presence is published.

use serde::{Deserialize, Serialize};

/// The authenticated identity of a connection.
///
/// Only exists once login has succeeded; an unauthenticated connection
/// carries no `Identity` at all, so identity fields can never be observed
/// half-initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Platform the client logged in from (app/web/ios).
    pub app_id: String,
    /// User ID extracted from the verified token.
    pub user_id: String,
}

impl Identity {
    #[must_use]
    pub fn new(app_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            user_id: user_id.into(),
        }
    }

    /// The registry/presence key for this identity.
    #[must_use]
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            app_id: self.app_id.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.app_id, self.user_id)
    }
}

/// Key of the identity-keyed connection map and the presence store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub app_id: String,
    pub user_id: String,
}

impl SessionKey {
    #[must_use]
    pub fn new(app_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            user_id: user_id.into(),
        }
    }

    /// External store key, `{appID}:{userID}`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.app_id, self.user_id)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.app_id, self.user_id)
    }
}
