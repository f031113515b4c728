//! Command dispatch contract
//!
//! Client requests select a handler by command string; the string is parsed
//! into a closed enum once at the dispatch boundary so handlers never see
//! raw command text.

/// Client-to-server commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Liveness probe, no preconditions
    Ping,
    /// Token-based session login
    Login,
    /// Keep-alive touch plus presence refresh
    Heartbeat,
    /// Point-to-point chat message (text or audio)
    SendMessage,
    /// Point-to-point audio message with codec metadata
    SendAudio,
}

// Server-to-client push commands. Pushes reuse the response envelope with a
// success code and one of these command strings.

/// Forwarded text message
pub const PUSH_TEXT: &str = "msg";
/// Forwarded audio message
pub const PUSH_AUDIO: &str = "audio";
/// A user of the same app came online
pub const PUSH_ENTER: &str = "enter";
/// A user of the same app went offline
pub const PUSH_EXIT: &str = "exit";

impl Command {
    /// Parse a request's command string; `None` means command-not-found.
    #[must_use]
    pub fn parse(cmd: &str) -> Option<Self> {
        match cmd {
            "ping" => Some(Self::Ping),
            "login" => Some(Self::Login),
            "heartbeat" => Some(Self::Heartbeat),
            "send-message" => Some(Self::SendMessage),
            "send-audio" => Some(Self::SendAudio),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Login => "login",
            Self::Heartbeat => "heartbeat",
            Self::SendMessage => "send-message",
            Self::SendAudio => "send-audio",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
