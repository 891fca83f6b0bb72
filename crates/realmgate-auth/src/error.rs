//! Error types for the authentication layer.

use std::time::Duration;

/// Why an attach was refused (or why the credential store failed).
///
/// These reasons are for logs only. A client always sees the same generic
/// `wamp.error.not_authorized` abort, so an unknown authid is
/// indistinguishable from a wrong ticket on the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The claimed authid has no credential (or the client claimed none).
    #[error("unknown identity: {}", authid.as_deref().unwrap_or("<anonymous>"))]
    UnknownIdentity { authid: Option<String> },

    /// None of the methods the client offered is one we can verify.
    #[error("no supported authentication method offered (offered: {offered:?})")]
    UnsupportedMethod { offered: Vec<String> },

    /// The response to the challenge didn't match the stored ticket.
    #[error("wrong ticket for {authid}")]
    WrongSecret { authid: String },

    /// A message arrived that the handshake doesn't allow in its current
    /// state: authenticate with no challenge outstanding, a second hello,
    /// or anything else out of order.
    #[error("protocol misuse: {0}")]
    ProtocolMisuse(&'static str),

    /// The credential store couldn't answer. Infrastructure trouble, not
    /// bad credentials.
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),

    /// The client never answered the challenge in time.
    #[error("no response to challenge for {authid} within {timeout:?}")]
    HandshakeTimeout { authid: String, timeout: Duration },
}

impl AuthError {
    /// Returns `true` when the failure is on our side rather than the
    /// client's. Operators want these at error level.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_identity_display_handles_anonymous() {
        let named = AuthError::UnknownIdentity {
            authid: Some("nobody".into()),
        };
        let anonymous = AuthError::UnknownIdentity { authid: None };
        assert_eq!(named.to_string(), "unknown identity: nobody");
        assert_eq!(anonymous.to_string(), "unknown identity: <anonymous>");
    }

    #[test]
    fn test_only_store_failures_are_infrastructure() {
        assert!(AuthError::StoreUnavailable("down".into()).is_infrastructure());
        assert!(!AuthError::WrongSecret { authid: "peter".into() }.is_infrastructure());
        assert!(!AuthError::ProtocolMisuse("x").is_infrastructure());
    }
}
