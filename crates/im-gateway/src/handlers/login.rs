//! `login` handler
//!
//! Verifies the service token, fixes the connection's identity, publishes
//! presence, and feeds the login event into the registry.

use std::sync::Arc;

use im_core::{Identity, PresenceRecord};
use serde_json::{json, Value};

use super::{parse_payload, Reply};
use crate::connection::{Connection, LoginEvent};
use crate::protocol::{LoginPayload, StatusCode};
use crate::server::GatewayState;
use crate::unix_now;

pub struct LoginHandler;

impl LoginHandler {
    pub async fn handle(
        state: &GatewayState,
        conn: &Arc<Connection>,
        seq: &str,
        data: Option<&Value>,
    ) -> Reply {
        let payload: LoginPayload = match parse_payload(data) {
            Ok(payload) => payload,
            Err(reply) => return reply,
        };

        if payload.service_token.is_empty() {
            tracing::debug!(seq = %seq, addr = %conn.addr(), "Login without token");
            return Reply::status(StatusCode::Unauthorized);
        }

        let claims = match state.jwt().verify_token(&payload.service_token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(seq = %seq, error = %err, "Token rejected");
                return Reply::status(StatusCode::Unauthorized);
            }
        };

        if claims.user_id().is_empty() {
            tracing::warn!(seq = %seq, "Token carries no user ID");
            return Reply::status(StatusCode::UnauthorizedUserId);
        }

        // Identity is set at most once per connection; a second login on the
        // same socket is an operation failure and the original identity is
        // retained.
        if let Some(existing) = conn.identity() {
            tracing::debug!(
                seq = %seq,
                identity = %existing,
                "Duplicate login attempt"
            );
            return Reply::status(StatusCode::OperationFailure);
        }

        let now = unix_now();
        let identity = Identity::new(claims.app_id(), claims.user_id());
        conn.login(identity.clone(), now);

        let record = PresenceRecord::new(
            state.node_address(),
            conn.addr(),
            identity.app_id.clone(),
            identity.user_id.clone(),
            now,
        );
        if let Err(err) = state.presence().set_online(&record).await {
            // Local login state is already recorded; surfaced as a server
            // error without rollback, the next heartbeat re-upserts.
            tracing::error!(seq = %seq, error = %err, "Presence write failed on login");
            return Reply::status(StatusCode::ServerError);
        }

        state
            .registry()
            .login(LoginEvent {
                key: identity.session_key(),
                token: payload.service_token,
                conn: conn.clone(),
            })
            .await;

        tracing::info!(
            conn_id = %conn.id(),
            addr = %conn.addr(),
            identity = %identity,
            "Login succeeded"
        );

        Reply::ok(json!({
            "userID": identity.user_id,
            "appID": identity.app_id,
        }))
    }
}
