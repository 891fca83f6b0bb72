//! Unified error type for Realmgate.

use realmgate_auth::AuthError;
use realmgate_protocol::ProtocolError;
use realmgate_router::RouterError;
use realmgate_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` conversions let `?` lift sub-crate errors, so users of
/// the `realmgate` crate only deal with this one type.
#[derive(Debug, thiserror::Error)]
pub enum RealmgateError {
    /// A transport-level error (bind, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A credential store error.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A routing error (unknown realm, procedure clash).
    #[error(transparent)]
    Router(#[from] RouterError),

    /// The router refused the attach or closed the session.
    #[error("aborted by router: {reason}")]
    Aborted {
        reason: String,
        message: Option<String>,
    },

    /// A call came back as an error.
    #[error("call failed: {error}")]
    CallFailed {
        error: String,
        message: Option<String>,
    },

    /// The peer sent something that makes no sense at this point.
    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    /// A challenge arrived without what its method needs to answer it.
    #[error("cannot answer {0} challenge")]
    BadChallenge(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let realmgate_err: RealmgateError = err.into();
        assert!(matches!(realmgate_err, RealmgateError::Transport(_)));
        assert!(realmgate_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let realmgate_err: RealmgateError = err.into();
        assert!(matches!(realmgate_err, RealmgateError::Protocol(_)));
    }

    #[test]
    fn test_from_auth_error() {
        let err = AuthError::StoreUnavailable("down".into());
        let realmgate_err: RealmgateError = err.into();
        assert!(matches!(realmgate_err, RealmgateError::Auth(_)));
    }

    #[test]
    fn test_from_router_error() {
        let err = RouterError::NoSuchRealm("realm9".into());
        let realmgate_err: RealmgateError = err.into();
        assert!(matches!(realmgate_err, RealmgateError::Router(_)));
    }

    #[test]
    fn test_aborted_display_names_reason() {
        let err = RealmgateError::Aborted {
            reason: "wamp.error.not_authorized".into(),
            message: None,
        };
        assert_eq!(err.to_string(), "aborted by router: wamp.error.not_authorized");
    }

    #[test]
    fn test_bad_challenge_display_names_method() {
        let err = RealmgateError::BadChallenge("wampcra".into());
        assert_eq!(err.to_string(), "cannot answer wampcra challenge");
    }
}
