//! Command payloads
//!
//! Typed `data` schemas for each command, plus the body shape of forwarded
//! pushes. Fields default so that validation (not deserialization) decides
//! which omissions are illegal.

use serde::{Deserialize, Serialize};

/// Text chat message type tag
pub const MESSAGE_TYPE_TEXT: &str = "text";
/// Audio chat message type tag
pub const MESSAGE_TYPE_AUDIO: &str = "audio";
/// The only supported audio codec tag
pub const AUDIO_FORMAT_PCM_16K: &str = "pcm_16k";

/// `login` payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginPayload {
    /// Opaque bearer token carrying the user's identity
    #[serde(rename = "serviceToken", default)]
    pub service_token: String,
}

/// `heartbeat` payload; the user ID is informational only
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// `send-message` payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    /// Recipient user ID
    #[serde(rename = "toUserID", default)]
    pub to_user_id: String,

    /// `text` or `audio`
    #[serde(rename = "messageType", default)]
    pub message_type: String,

    /// Text content, or base64 audio for `audio` messages
    #[serde(default)]
    pub content: String,

    /// Audio codec tag, defaults to `pcm_16k`
    #[serde(rename = "audioFormat", default, skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<String>,

    /// Sender timestamp, defaults to now
    #[serde(default)]
    pub timestamp: i64,
}

/// `send-audio` payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioMessagePayload {
    /// Recipient user ID
    #[serde(rename = "toUserID", default)]
    pub to_user_id: String,

    /// Base64-encoded PCM data
    #[serde(rename = "audioData", default)]
    pub audio_data: String,

    /// Audio codec tag, defaults to `pcm_16k`
    #[serde(rename = "audioFormat", default, skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<String>,

    /// Clip length in milliseconds
    #[serde(default)]
    pub duration: i64,

    /// Sender timestamp, defaults to now
    #[serde(default)]
    pub timestamp: i64,
}

/// Body of a forwarded push (`msg`/`audio`) and of `enter`/`exit` notices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushBody {
    /// `text` or `audio`
    #[serde(rename = "type")]
    pub kind: String,

    /// Sender user ID (the envelope's `from` address)
    pub from: String,

    /// Message content or base64 audio
    pub msg: String,
}

impl PushBody {
    #[must_use]
    pub fn text(from: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            kind: MESSAGE_TYPE_TEXT.to_string(),
            from: from.into(),
            msg: msg.into(),
        }
    }

    #[must_use]
    pub fn audio(from: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: MESSAGE_TYPE_AUDIO.to_string(),
            from: from.into(),
            msg: data.into(),
        }
    }
}
