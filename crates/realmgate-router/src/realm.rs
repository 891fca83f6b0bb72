//! A realm: a routing namespace with its own procedures and sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use realmgate_auth::Identity;
use realmgate_protocol::SessionId;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{RouterError, SessionRegistry};

/// A callable registered on a realm.
///
/// Takes the call's positional arguments and returns a single value.
pub type Procedure =
    Arc<dyn Fn(&[Value]) -> Result<Value, RouterError> + Send + Sync>;

/// One realm: procedures by URI plus the sessions joined to it.
///
/// Shared as `Arc<Realm>` by every connection attached to it.
pub struct Realm {
    name: String,
    procedures: RwLock<HashMap<String, Procedure>>,
    /// Sync mutex: leaving happens from a drop guard, and no caller
    /// awaits while holding it.
    sessions: Mutex<SessionRegistry>,
}

impl Realm {
    /// Creates an empty realm.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            procedures: RwLock::new(HashMap::new()),
            sessions: Mutex::new(SessionRegistry::new()),
        }
    }

    /// The realm's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers `handler` under `procedure`.
    ///
    /// # Errors
    /// [`RouterError::ProcedureAlreadyExists`] if the name is taken.
    pub async fn register(
        &self,
        procedure: &str,
        handler: Procedure,
    ) -> Result<(), RouterError> {
        let mut procedures = self.procedures.write().await;
        if procedures.contains_key(procedure) {
            return Err(RouterError::ProcedureAlreadyExists(
                procedure.to_string(),
            ));
        }
        procedures.insert(procedure.to_string(), handler);
        tracing::info!(realm = %self.name, procedure, "procedure registered");
        Ok(())
    }

    /// Invokes a registered procedure.
    ///
    /// The handler runs after the registry lock is released, so a slow
    /// procedure never blocks registration or other calls.
    pub async fn call(
        &self,
        procedure: &str,
        args: &[Value],
    ) -> Result<Value, RouterError> {
        let handler = self
            .procedures
            .read()
            .await
            .get(procedure)
            .cloned()
            .ok_or_else(|| RouterError::NoSuchProcedure(procedure.to_string()))?;
        handler(args)
    }

    /// Names of every registered procedure, sorted.
    pub async fn procedures(&self) -> Vec<String> {
        let mut names: Vec<_> =
            self.procedures.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Joins an admitted session to this realm.
    pub fn join(&self, identity: Identity) -> SessionId {
        let session_id = self.sessions().join(identity);
        tracing::info!(realm = %self.name, %session_id, "session attached");
        session_id
    }

    /// Removes a session from this realm.
    pub fn leave(&self, session_id: SessionId) -> Result<Identity, RouterError> {
        let identity = self.sessions().leave(session_id)?;
        tracing::info!(realm = %self.name, %session_id, "session detached");
        Ok(identity)
    }

    /// The identity a joined session attached with.
    pub fn session(&self, session_id: SessionId) -> Option<Identity> {
        self.sessions().get(&session_id).cloned()
    }

    /// Number of sessions currently joined.
    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    fn sessions(&self) -> MutexGuard<'_, SessionRegistry> {
        // The registry is a plain map; a panic elsewhere can't leave it
        // half-updated.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm").field("name", &self.name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn echo() -> Procedure {
        Arc::new(|args: &[Value]| -> Result<Value, RouterError> {
            Ok(Value::Array(args.to_vec()))
        })
    }

    #[tokio::test]
    async fn test_call_registered_procedure_returns_value() {
        let realm = Realm::new("realm1");
        realm.register("com.example.echo", echo()).await.unwrap();

        let result = realm.call("com.example.echo", &[json!(1), json!("a")]).await;

        assert_eq!(result.unwrap(), json!([1, "a"]));
    }

    #[tokio::test]
    async fn test_call_unknown_procedure_returns_no_such_procedure() {
        let realm = Realm::new("realm1");

        let result = realm.call("com.example.missing", &[]).await;

        assert!(matches!(result, Err(RouterError::NoSuchProcedure(p)) if p == "com.example.missing"));
    }

    #[tokio::test]
    async fn test_register_duplicate_returns_already_exists() {
        let realm = Realm::new("realm1");
        realm.register("com.example.echo", echo()).await.unwrap();

        let result = realm.register("com.example.echo", echo()).await;

        assert!(matches!(result, Err(RouterError::ProcedureAlreadyExists(_))));
        assert_eq!(realm.procedures().await, vec!["com.example.echo"]);
    }

    #[tokio::test]
    async fn test_call_failing_procedure_propagates_error() {
        let realm = Realm::new("realm1");
        realm
            .register(
                "com.example.fail",
                Arc::new(|_: &[Value]| -> Result<Value, RouterError> {
                    Err(RouterError::ProcedureFailed {
                        procedure: "com.example.fail".into(),
                        reason: "always fails".into(),
                    })
                }),
            )
            .await
            .unwrap();

        let result = realm.call("com.example.fail", &[]).await;

        assert!(matches!(result, Err(RouterError::ProcedureFailed { .. })));
    }

    #[test]
    fn test_join_then_leave_tracks_count() {
        let realm = Realm::new("realm1");
        let id = realm.join(Identity {
            authid: "peter".into(),
            authrole: "user".into(),
            authmethod: "ticket".into(),
            authprovider: "userdb".into(),
        });
        assert_eq!(realm.session_count(), 1);
        assert_eq!(realm.session(id).unwrap().authid, "peter");

        realm.leave(id).unwrap();

        assert_eq!(realm.session_count(), 0);
        assert!(realm.session(id).is_none());
    }
}
