//! The session registry: every session currently joined to a realm.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself. It's a plain `HashMap`
//! owned by a [`Realm`](crate::Realm), which keeps it behind a mutex and
//! never holds that lock across an `.await`.

use std::collections::HashMap;

use rand::Rng;
use realmgate_auth::Identity;
use realmgate_protocol::SessionId;

use crate::RouterError;

/// Largest session id handed out: ids stay exact when a JavaScript client
/// reads them as doubles.
pub const MAX_SESSION_ID: u64 = 1 << 53;

/// Sessions joined to one realm, keyed by their router-assigned id.
///
/// ## Lifecycle
///
/// ```text
/// Accept ──→ join() ──→ [joined] ──→ leave()
///                           │
///                           └── get() / len()
/// ```
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Identity>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an admitted session and returns its new id.
    ///
    /// Ids are drawn at random from `1..=MAX_SESSION_ID` and redrawn on
    /// collision, so an id never refers to two live sessions.
    pub fn join(&mut self, identity: Identity) -> SessionId {
        let session_id = loop {
            let candidate = SessionId(generate_session_id());
            if !self.sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        tracing::debug!(
            %session_id,
            authid = %identity.authid,
            authrole = %identity.authrole,
            "session joined"
        );
        self.sessions.insert(session_id, identity);
        session_id
    }

    /// Removes a session, returning the identity it was joined with.
    ///
    /// # Errors
    /// Returns [`RouterError::SessionNotFound`] if the id isn't joined.
    pub fn leave(
        &mut self,
        session_id: SessionId,
    ) -> Result<Identity, RouterError> {
        let identity = self
            .sessions
            .remove(&session_id)
            .ok_or(RouterError::SessionNotFound(session_id))?;
        tracing::debug!(%session_id, authid = %identity.authid, "session left");
        Ok(identity)
    }

    /// Looks up a joined session.
    pub fn get(&self, session_id: &SessionId) -> Option<&Identity> {
        self.sessions.get(session_id)
    }

    /// Returns the number of joined sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is joined.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn generate_session_id() -> u64 {
    rand::rng().random_range(1..=MAX_SESSION_ID)
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Naming: `test_{function}_{scenario}_{expected}`.

    use std::collections::HashSet;

    use super::*;

    fn identity(authid: &str) -> Identity {
        Identity {
            authid: authid.to_string(),
            authrole: "user".to_string(),
            authmethod: "ticket".to_string(),
            authprovider: "userdb".to_string(),
        }
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_returns_id_in_range_and_stores_identity() {
        let mut reg = SessionRegistry::new();

        let id = reg.join(identity("peter"));

        assert!((1..=MAX_SESSION_ID).contains(&id.0));
        assert_eq!(reg.get(&id).unwrap().authid, "peter");
    }

    #[test]
    fn test_join_many_sessions_ids_are_unique() {
        let mut reg = SessionRegistry::new();

        let ids: HashSet<_> =
            (0..500).map(|_| reg.join(identity("joe"))).collect();

        assert_eq!(ids.len(), 500);
        assert_eq!(reg.len(), 500);
    }

    #[test]
    fn test_join_same_authid_twice_gets_two_sessions() {
        let mut reg = SessionRegistry::new();

        let a = reg.join(identity("peter"));
        let b = reg.join(identity("peter"));

        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(&a).unwrap().authid, "peter");
        assert_eq!(reg.get(&b).unwrap().authid, "peter");
    }

    // =====================================================================
    // leave()
    // =====================================================================

    #[test]
    fn test_leave_joined_session_returns_identity() {
        let mut reg = SessionRegistry::new();
        let id = reg.join(identity("joe"));

        let left = reg.leave(id).expect("joined session should leave");

        assert_eq!(left.authid, "joe");
        assert!(reg.get(&id).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_leave_unknown_session_returns_not_found() {
        let mut reg = SessionRegistry::new();

        let result = reg.leave(SessionId(7));

        assert!(matches!(
            result,
            Err(RouterError::SessionNotFound(SessionId(7)))
        ));
    }

    #[test]
    fn test_leave_twice_second_returns_not_found() {
        let mut reg = SessionRegistry::new();
        let id = reg.join(identity("peter"));

        reg.leave(id).unwrap();

        assert!(reg.leave(id).is_err());
    }

    #[test]
    fn test_leave_one_session_keeps_others() {
        let mut reg = SessionRegistry::new();
        let peter = reg.join(identity("peter"));
        let joe = reg.join(identity("joe"));

        reg.leave(peter).unwrap();

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(&joe).unwrap().authid, "joe");
        assert!(reg.get(&peter).is_none());
    }
}
