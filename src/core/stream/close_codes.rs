//! Close-code registry for the Rev.ai streaming API.
//!
//! The service terminates a streaming session with a WebSocket close frame.
//! `1000` is a normal closure; the `40xx` codes below are service-defined and
//! tell the caller whether opening a new session is worth trying.
//! Codes outside this table are passed through unclassified.

use phf::phf_map;
use serde::Serialize;

/// Normal closure (RFC 6455).
pub const CLOSE_NORMAL: u16 = 1000;

/// No status code present in the close frame (RFC 6455, never sent on the wire).
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Connection dropped without a close frame (RFC 6455, never sent on the wire).
pub const CLOSE_ABNORMAL: u16 = 1006;

pub const CLOSE_UNAUTHORIZED: u16 = 4001;
pub const CLOSE_BAD_REQUEST: u16 = 4002;
pub const CLOSE_INSUFFICIENT_CREDITS: u16 = 4003;
pub const CLOSE_SERVER_SHUTTING_DOWN: u16 = 4010;
pub const CLOSE_NO_INSTANCE_AVAILABLE: u16 = 4013;
pub const CLOSE_TOO_MANY_REQUESTS: u16 = 4029;

/// Classification of a service-defined close code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CloseReason {
    /// Close code carried by the close frame
    pub code: u16,
    /// Human-readable reason
    pub message: &'static str,
    /// Whether a brand-new session is worth attempting
    pub retryable: bool,
}

static CLOSE_CODE_REGISTRY: phf::Map<u16, CloseReason> = phf_map! {
    4001u16 => CloseReason {
        code: CLOSE_UNAUTHORIZED,
        message: "Unauthorized: invalid access credential",
        retryable: false,
    },
    4002u16 => CloseReason {
        code: CLOSE_BAD_REQUEST,
        message: "Bad request: invalid content-type, oversized metadata, or unknown custom vocabulary id",
        retryable: false,
    },
    4003u16 => CloseReason {
        code: CLOSE_INSUFFICIENT_CREDITS,
        message: "Insufficient credits to continue session",
        retryable: false,
    },
    4010u16 => CloseReason {
        code: CLOSE_SERVER_SHUTTING_DOWN,
        message: "Server shutting down",
        retryable: true,
    },
    4013u16 => CloseReason {
        code: CLOSE_NO_INSTANCE_AVAILABLE,
        message: "No streaming instance available",
        retryable: true,
    },
    4029u16 => CloseReason {
        code: CLOSE_TOO_MANY_REQUESTS,
        message: "Too many concurrent connections",
        retryable: false,
    },
};

impl CloseReason {
    /// Look up a close code in the registry.
    ///
    /// Returns `None` for `1000` and for every code the service does not define.
    #[inline]
    pub fn lookup(code: u16) -> Option<CloseReason> {
        CLOSE_CODE_REGISTRY.get(&code).copied()
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_table() {
        let expected = [
            (4001, "Unauthorized: invalid access credential", false),
            (
                4002,
                "Bad request: invalid content-type, oversized metadata, or unknown custom vocabulary id",
                false,
            ),
            (4003, "Insufficient credits to continue session", false),
            (4010, "Server shutting down", true),
            (4013, "No streaming instance available", true),
            (4029, "Too many concurrent connections", false),
        ];

        for (code, message, retryable) in expected {
            let reason = CloseReason::lookup(code).expect("code should be registered");
            assert_eq!(reason.code, code);
            assert_eq!(reason.message, message);
            assert_eq!(reason.retryable, retryable, "retryable mismatch for {code}");
        }
    }

    #[test]
    fn test_unknown_codes_are_not_classified() {
        for code in [CLOSE_NORMAL, CLOSE_NO_STATUS, CLOSE_ABNORMAL, 1001, 1011, 4000, 4999] {
            assert!(CloseReason::lookup(code).is_none(), "{code} should be unclassified");
        }
    }

    #[test]
    fn test_display_includes_code() {
        let reason = CloseReason::lookup(CLOSE_SERVER_SHUTTING_DOWN).unwrap();
        assert_eq!(reason.to_string(), "Server shutting down (4010)");
    }
}
