//! Frame protocol
//!
//! Defines the request/response envelope exchanged over the socket, the
//! closed command set, the status-code enumeration, and the typed payloads
//! each command carries.

mod command;
mod frame;
mod payloads;
mod status;

pub use command::{Command, PUSH_AUDIO, PUSH_ENTER, PUSH_EXIT, PUSH_TEXT};
pub use frame::{RequestFrame, ResponseFrame};
pub use payloads::{
    AudioMessagePayload, ChatMessagePayload, HeartbeatPayload, LoginPayload, PushBody,
    AUDIO_FORMAT_PCM_16K, MESSAGE_TYPE_AUDIO, MESSAGE_TYPE_TEXT,
};
pub use status::StatusCode;
