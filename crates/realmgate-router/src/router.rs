//! The router: the set of realms a server hosts.

use std::collections::HashMap;
use std::sync::Arc;

use realmgate_protocol::SessionId;

use crate::component::ComponentSession;
use crate::{ApplicationComponent, Realm, RouterError};

/// All realms served by one router process.
///
/// Realms are fixed when the server is built; the map itself is never
/// mutated afterwards, so lookups need no lock.
#[derive(Debug, Default)]
pub struct Router {
    realms: HashMap<String, Arc<Realm>>,
}

impl Router {
    /// Creates a router with no realms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router serving each of `names`.
    pub fn with_realms<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let mut router = Self::new();
        for name in names {
            router.add_realm(name);
        }
        router
    }

    /// Adds a realm, or returns the existing one with that name.
    pub fn add_realm(&mut self, name: impl Into<String>) -> Arc<Realm> {
        let name = name.into();
        Arc::clone(
            self.realms
                .entry(name.clone())
                .or_insert_with(|| Arc::new(Realm::new(name))),
        )
    }

    /// Looks up a realm by name.
    ///
    /// # Errors
    /// [`RouterError::NoSuchRealm`] if the router doesn't serve it.
    pub fn realm(&self, name: &str) -> Result<Arc<Realm>, RouterError> {
        self.realms
            .get(name)
            .cloned()
            .ok_or_else(|| RouterError::NoSuchRealm(name.to_string()))
    }

    /// Names of all realms, sorted.
    pub fn realm_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.realms.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of realms.
    pub fn realm_count(&self) -> usize {
        self.realms.len()
    }

    /// Joins `component` to `realm` and lets it register its procedures.
    ///
    /// If the component's `on_join` fails, its session leaves the realm
    /// again and the error is returned.
    pub async fn add_component<C: ApplicationComponent>(
        &self,
        realm: &str,
        component: &C,
    ) -> Result<SessionId, RouterError> {
        let realm = self.realm(realm)?;
        let session = ComponentSession::join(Arc::clone(&realm));

        if let Err(e) = component.on_join(&session).await {
            session.leave();
            tracing::error!(
                component = component.name(),
                realm = %realm.name(),
                error = %e,
                "component failed to start"
            );
            return Err(e);
        }

        tracing::info!(
            component = component.name(),
            realm = %realm.name(),
            session_id = %session.session_id(),
            "component joined"
        );
        Ok(session.session_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_realms_creates_each_once() {
        let router = Router::with_realms(["realm1", "realm2", "realm1"]);

        assert_eq!(router.realm_count(), 2);
        assert_eq!(router.realm_names(), vec!["realm1", "realm2"]);
    }

    #[test]
    fn test_add_realm_existing_returns_same_realm() {
        let mut router = Router::new();
        let a = router.add_realm("realm1");
        let b = router.add_realm("realm1");

        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_realm_unknown_returns_no_such_realm() {
        let router = Router::with_realms(["realm1"]);

        let result = router.realm("realm9");

        assert!(matches!(result, Err(RouterError::NoSuchRealm(r)) if r == "realm9"));
    }
}
