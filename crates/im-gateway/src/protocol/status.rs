//! Response status codes
//!
//! A small closed enumeration; `0` means success, everything else is a
//! per-request failure reported on the same connection.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Status code carried by every response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StatusCode {
    /// Success
    Ok = 0,
    /// The command requires a completed login
    NotLoggedIn = 1000,
    /// Malformed payload or an illegal field value
    ParameterIllegal = 1001,
    /// The verified token carried no usable user ID
    UnauthorizedUserId = 1002,
    /// Missing or invalid token
    Unauthorized = 1003,
    /// A dependency failed while handling the request
    ServerError = 1004,
    /// The operation is not applicable in the current session state
    OperationFailure = 1009,
    /// No handler is registered for the command
    CommandNotFound = 1010,
    /// The recipient has no live connection anywhere
    NotOnline = 1011,
}

impl StatusCode {
    /// Create a `StatusCode` from a raw integer value
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1000 => Some(Self::NotLoggedIn),
            1001 => Some(Self::ParameterIllegal),
            1002 => Some(Self::UnauthorizedUserId),
            1003 => Some(Self::Unauthorized),
            1004 => Some(Self::ServerError),
            1009 => Some(Self::OperationFailure),
            1010 => Some(Self::CommandNotFound),
            1011 => Some(Self::NotOnline),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Fixed human-readable message for the code
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::NotLoggedIn => "Not logged in",
            Self::ParameterIllegal => "Parameter illegal",
            Self::UnauthorizedUserId => "Unauthorized user ID",
            Self::Unauthorized => "Unauthorized",
            Self::ServerError => "Server error",
            Self::OperationFailure => "Operation failure",
            Self::CommandNotFound => "Command not found",
            Self::NotOnline => "Recipient not online",
        }
    }
}

impl Serialize for StatusCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.as_u32())
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u32::deserialize(deserializer)?;
        Self::from_u32(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid status code: {value}")))
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u32_round_trip() {
        for code in [
            StatusCode::Ok,
            StatusCode::NotLoggedIn,
            StatusCode::ParameterIllegal,
            StatusCode::UnauthorizedUserId,
            StatusCode::Unauthorized,
            StatusCode::ServerError,
            StatusCode::OperationFailure,
            StatusCode::CommandNotFound,
            StatusCode::NotOnline,
        ] {
            assert_eq!(StatusCode::from_u32(code.as_u32()), Some(code));
        }
        assert_eq!(StatusCode::from_u32(500), None);
    }

    #[test]
    fn test_success_flag() {
        assert!(StatusCode::Ok.is_ok());
        assert!(!StatusCode::ServerError.is_ok());
    }

    #[test]
    fn test_serialization_as_number() {
        let json = serde_json::to_string(&StatusCode::NotOnline).unwrap();
        assert_eq!(json, "1011");

        let code: StatusCode = serde_json::from_str("0").unwrap();
        assert_eq!(code, StatusCode::Ok);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", StatusCode::Ok), "Ok (0)");
        assert_eq!(
            format!("{}", StatusCode::ParameterIllegal),
            "Parameter illegal (1001)"
        );
    }
}
