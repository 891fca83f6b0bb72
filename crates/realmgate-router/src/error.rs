//! Error types for the router layer.

use realmgate_protocol::{SessionId, uri};

/// Errors that can occur while routing sessions and calls.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The router doesn't serve this realm.
    #[error("no such realm: {0}")]
    NoSuchRealm(String),

    /// Nobody registered this procedure on the realm.
    #[error("no such procedure: {0}")]
    NoSuchProcedure(String),

    /// A procedure with this name is already registered on the realm.
    #[error("procedure already registered: {0}")]
    ProcedureAlreadyExists(String),

    /// The session isn't joined to the realm.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The procedure ran and failed.
    #[error("procedure {procedure} failed: {reason}")]
    ProcedureFailed { procedure: String, reason: String },
}

impl RouterError {
    /// The error URI a caller sees for this failure.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::NoSuchRealm(_) => uri::NO_SUCH_REALM,
            Self::NoSuchProcedure(_) => uri::NO_SUCH_PROCEDURE,
            _ => uri::RUNTIME_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_maps_lookup_failures_to_their_own_uris() {
        assert_eq!(
            RouterError::NoSuchProcedure("com.example.nope".into()).uri(),
            "wamp.error.no_such_procedure"
        );
        assert_eq!(
            RouterError::NoSuchRealm("realm9".into()).uri(),
            "wamp.error.no_such_realm"
        );
        assert_eq!(
            RouterError::ProcedureFailed {
                procedure: "com.example.div".into(),
                reason: "division by zero".into(),
            }
            .uri(),
            "wamp.error.runtime_error"
        );
    }
}
