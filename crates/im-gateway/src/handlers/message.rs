//! `send-message` / `send-audio` handlers
//!
//! Validate the chat payload, then deliver: a local registry hit enqueues
//! the forwarded frame directly; otherwise the presence store names the
//! owning node and the frame is pushed there. Delivery is fire-and-forget -
//! the sender's receipt says "sent", not "read".

use std::sync::Arc;

use im_core::SessionKey;
use serde_json::{json, Value};

use super::{parse_payload, Reply};
use crate::connection::Connection;
use crate::protocol::{
    AudioMessagePayload, ChatMessagePayload, PushBody, ResponseFrame, StatusCode,
    AUDIO_FORMAT_PCM_16K, MESSAGE_TYPE_AUDIO, MESSAGE_TYPE_TEXT, PUSH_AUDIO, PUSH_TEXT,
};
use crate::server::GatewayState;

/// Where a forwarded frame ended up
enum Delivery {
    /// Enqueued locally or accepted by the owning peer node
    Delivered,
    /// No live connection anywhere
    Offline,
}

/// Route a forwarded frame to the recipient: local registry first, then the
/// presence store. The caller's `seq` rides inside `frame` so the
/// correlation ID survives the hop.
async fn deliver(
    state: &GatewayState,
    key: &SessionKey,
    frame: &ResponseFrame,
) -> Result<Delivery, Reply> {
    let serialized = match frame.to_json() {
        Ok(serialized) => serialized,
        Err(err) => {
            tracing::error!(error = %err, "Forwarded frame failed to serialize");
            return Err(Reply::status(StatusCode::ServerError));
        }
    };

    if let Some(target) = state.registry().lookup(key.clone()).await {
        if let Err(err) = target.enqueue(serialized) {
            // Queue bound is the admission control; the frame is dropped
            // rather than blocking the sender's dispatch path.
            tracing::warn!(
                conn_id = %target.id(),
                error = %err,
                "Forwarded frame dropped"
            );
        }
        return Ok(Delivery::Delivered);
    }

    let record = match state.presence().get_online(key).await {
        Ok(record) => record,
        Err(err) => {
            tracing::error!(key = %key, error = %err, "Presence read failed during routing");
            return Err(Reply::status(StatusCode::ServerError));
        }
    };

    match record {
        None => Ok(Delivery::Offline),
        Some(record) if record.is_owned_by(state.node_address()) => {
            // The record says this node owns the socket but the registry
            // disagrees; the record is stale and will lapse via TTL.
            tracing::debug!(key = %key, "Stale local presence record");
            Ok(Delivery::Offline)
        }
        Some(record) => {
            match state
                .peers()
                .push(&record.node_address, key, &serialized)
                .await
            {
                Ok(true) => {
                    tracing::debug!(
                        key = %key,
                        node = %record.node_address,
                        "Frame forwarded to owning node"
                    );
                    Ok(Delivery::Delivered)
                }
                Ok(false) => Ok(Delivery::Offline),
                Err(err) => {
                    tracing::error!(
                        key = %key,
                        node = %record.node_address,
                        error = %err,
                        "Peer push failed"
                    );
                    Err(Reply::status(StatusCode::ServerError))
                }
            }
        }
    }
}

/// Validate the audio codec tag, filling in the default.
fn resolve_audio_format(format: Option<String>) -> Result<String, Reply> {
    let format = format.unwrap_or_else(|| AUDIO_FORMAT_PCM_16K.to_string());
    if format != AUDIO_FORMAT_PCM_16K {
        tracing::debug!(format = %format, "Unsupported audio format");
        return Err(Reply::status(StatusCode::ParameterIllegal));
    }
    Ok(format)
}

fn resolve_timestamp(timestamp: i64) -> i64 {
    if timestamp == 0 {
        chrono::Utc::now().timestamp()
    } else {
        timestamp
    }
}

pub struct SendMessageHandler;

impl SendMessageHandler {
    pub async fn handle(
        state: &GatewayState,
        conn: &Arc<Connection>,
        seq: &str,
        data: Option<&Value>,
    ) -> Reply {
        let Some(identity) = conn.identity() else {
            tracing::debug!(seq = %seq, addr = %conn.addr(), "Send before login");
            return Reply::status(StatusCode::NotLoggedIn);
        };

        let payload: ChatMessagePayload = match parse_payload(data) {
            Ok(payload) => payload,
            Err(reply) => return reply,
        };

        if payload.to_user_id.is_empty()
            || payload.message_type.is_empty()
            || payload.content.is_empty()
        {
            tracing::debug!(seq = %seq, "Chat message with empty required field");
            return Reply::status(StatusCode::ParameterIllegal);
        }

        if payload.message_type != MESSAGE_TYPE_TEXT && payload.message_type != MESSAGE_TYPE_AUDIO {
            tracing::debug!(seq = %seq, message_type = %payload.message_type, "Unsupported message type");
            return Reply::status(StatusCode::ParameterIllegal);
        }

        if payload.message_type == MESSAGE_TYPE_AUDIO {
            if let Err(reply) = resolve_audio_format(payload.audio_format.clone()) {
                return reply;
            }
        }

        let timestamp = resolve_timestamp(payload.timestamp);

        let (push_cmd, body) = if payload.message_type == MESSAGE_TYPE_TEXT {
            (PUSH_TEXT, PushBody::text(&identity.user_id, &payload.content))
        } else {
            (PUSH_AUDIO, PushBody::audio(&identity.user_id, &payload.content))
        };
        let frame = ResponseFrame::ok(seq, push_cmd, serde_json::to_value(body).ok());

        let key = SessionKey::new(identity.app_id.clone(), payload.to_user_id.clone());
        match deliver(state, &key, &frame).await {
            Ok(Delivery::Delivered) => {
                tracing::info!(
                    seq = %seq,
                    from = %identity.user_id,
                    to = %payload.to_user_id,
                    message_type = %payload.message_type,
                    "Message sent"
                );
                Reply::ok(json!({
                    "messageID": seq,
                    "toUserID": payload.to_user_id,
                    "messageType": payload.message_type,
                    "timestamp": timestamp,
                    "status": "sent",
                }))
            }
            Ok(Delivery::Offline) => {
                tracing::debug!(seq = %seq, to = %payload.to_user_id, "Recipient not online");
                Reply::status(StatusCode::NotOnline)
            }
            Err(reply) => reply,
        }
    }
}

pub struct SendAudioHandler;

impl SendAudioHandler {
    pub async fn handle(
        state: &GatewayState,
        conn: &Arc<Connection>,
        seq: &str,
        data: Option<&Value>,
    ) -> Reply {
        let Some(identity) = conn.identity() else {
            tracing::debug!(seq = %seq, addr = %conn.addr(), "Audio send before login");
            return Reply::status(StatusCode::NotLoggedIn);
        };

        let payload: AudioMessagePayload = match parse_payload(data) {
            Ok(payload) => payload,
            Err(reply) => return reply,
        };

        if payload.to_user_id.is_empty() || payload.audio_data.is_empty() {
            tracing::debug!(seq = %seq, "Audio message with empty required field");
            return Reply::status(StatusCode::ParameterIllegal);
        }

        let audio_format = match resolve_audio_format(payload.audio_format.clone()) {
            Ok(format) => format,
            Err(reply) => return reply,
        };

        let timestamp = resolve_timestamp(payload.timestamp);

        let body = PushBody::audio(&identity.user_id, &payload.audio_data);
        let frame = ResponseFrame::ok(seq, PUSH_AUDIO, serde_json::to_value(body).ok());

        let key = SessionKey::new(identity.app_id.clone(), payload.to_user_id.clone());
        match deliver(state, &key, &frame).await {
            Ok(Delivery::Delivered) => {
                tracing::info!(
                    seq = %seq,
                    from = %identity.user_id,
                    to = %payload.to_user_id,
                    duration_ms = payload.duration,
                    "Audio message sent"
                );
                Reply::ok(json!({
                    "messageID": seq,
                    "toUserID": payload.to_user_id,
                    "messageType": MESSAGE_TYPE_AUDIO,
                    "audioFormat": audio_format,
                    "duration": payload.duration,
                    "timestamp": timestamp,
                    "status": "sent",
                }))
            }
            Ok(Delivery::Offline) => {
                tracing::debug!(seq = %seq, to = %payload.to_user_id, "Recipient not online");
                Reply::status(StatusCode::NotOnline)
            }
            Err(reply) => reply,
        }
    }
}
