//! Application components: sessions embedded in the router process.
//!
//! A component joins a realm like any client would, but without a
//! handshake, and registers the procedures it provides. Clients that
//! attach to the same realm can then call them.

use std::sync::Arc;

use realmgate_auth::Identity;
use realmgate_protocol::SessionId;
use serde_json::Value;

use crate::{Realm, RouterError};

/// Identity every embedded component joins with.
pub const COMPONENT_AUTHID: &str = "component";
/// Role granted to embedded components.
pub const COMPONENT_AUTHROLE: &str = "trusted";
/// Method and provider label for sessions that skip the handshake.
pub const COMPONENT_AUTH_INTERNAL: &str = "internal";

/// The procedure the time service registers.
pub const TIMESERVICE_NOW: &str = "com.timeservice.now";

/// Something that runs inside the router and offers procedures.
///
/// # Example
///
/// ```rust
/// use realmgate_router::{ApplicationComponent, ComponentSession, RouterError};
/// use serde_json::Value;
///
/// struct Adder;
///
/// impl ApplicationComponent for Adder {
///     fn name(&self) -> &str {
///         "adder"
///     }
///
///     async fn on_join(&self, session: &ComponentSession) -> Result<(), RouterError> {
///         session
///             .register("com.example.add", |args: &[Value]| {
///                 let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
///                 Ok(Value::from(sum))
///             })
///             .await
///     }
/// }
/// ```
pub trait ApplicationComponent: Send + Sync + 'static {
    /// Short name used in logs and on the command line.
    fn name(&self) -> &str;

    /// Called once the component's session has joined its realm.
    ///
    /// An error here detaches the component again.
    fn on_join(
        &self,
        session: &ComponentSession,
    ) -> impl Future<Output = Result<(), RouterError>> + Send;
}

/// The handle a component gets for the realm it joined.
#[derive(Debug, Clone)]
pub struct ComponentSession {
    realm: Arc<Realm>,
    session_id: SessionId,
}

impl ComponentSession {
    pub(crate) fn join(realm: Arc<Realm>) -> Self {
        let session_id = realm.join(component_identity());
        Self { realm, session_id }
    }

    /// The id the component's session was given.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// The realm the component joined.
    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    /// Registers a procedure on the component's realm.
    pub async fn register<F>(
        &self,
        procedure: &str,
        handler: F,
    ) -> Result<(), RouterError>
    where
        F: Fn(&[Value]) -> Result<Value, RouterError> + Send + Sync + 'static,
    {
        self.realm.register(procedure, Arc::new(handler)).await
    }

    pub(crate) fn leave(&self) {
        let _ = self.realm.leave(self.session_id);
    }
}

fn component_identity() -> Identity {
    Identity {
        authid: COMPONENT_AUTHID.to_string(),
        authrole: COMPONENT_AUTHROLE.to_string(),
        authmethod: COMPONENT_AUTH_INTERNAL.to_string(),
        authprovider: COMPONENT_AUTH_INTERNAL.to_string(),
    }
}

// ---------------------------------------------------------------------------
// TimeService
// ---------------------------------------------------------------------------

/// Tells the time: registers [`TIMESERVICE_NOW`], which takes no
/// arguments and returns the current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeService;

impl ApplicationComponent for TimeService {
    fn name(&self) -> &str {
        "timeservice"
    }

    async fn on_join(&self, session: &ComponentSession) -> Result<(), RouterError> {
        session
            .register(TIMESERVICE_NOW, |_args: &[Value]| {
                Ok(Value::String(utc_timestamp()))
            })
            .await
    }
}

/// Current UTC time, second precision, `Z` suffix.
pub fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_timestamp_has_fixed_shape() {
        let now = utc_timestamp();

        assert_eq!(now.len(), 20, "{now}");
        assert!(now.ends_with('Z'));
        assert_eq!(&now[10..11], "T");
        assert!(
            chrono::NaiveDateTime::parse_from_str(&now, "%Y-%m-%dT%H:%M:%SZ")
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_time_service_on_join_registers_now() {
        let realm = Arc::new(Realm::new("realm1"));
        let session = ComponentSession::join(Arc::clone(&realm));

        TimeService.on_join(&session).await.unwrap();

        assert_eq!(realm.procedures().await, vec![TIMESERVICE_NOW]);
        let identity = realm.session(session.session_id()).unwrap();
        assert_eq!(identity.authid, "component");
        assert_eq!(identity.authrole, "trusted");
    }
}
