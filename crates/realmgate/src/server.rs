//! `RouterServer` builder and server loop.
//!
//! This is the entry point for running a Realmgate router. It ties
//! together all the layers: transport → protocol → auth → router.

use std::sync::Arc;
use std::time::Duration;

use realmgate_auth::{AuthConfig, CredentialStore};
use realmgate_protocol::{Codec, JsonCodec, SessionId};
use realmgate_router::{ApplicationComponent, Router};
use realmgate_transport::{Connection, Transport, WebSocketTransport};

use crate::RealmgateError;
use crate::handler::handle_connection;

/// Realm served when the builder is given none.
pub const DEFAULT_REALM: &str = "realm1";

/// Connection-level timeouts.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How long a fresh connection may take to send its hello.
    ///
    /// Default: 5 seconds.
    pub hello_timeout: Duration,

    /// How long an established session may stay silent before the router
    /// drops it.
    ///
    /// Default: 60 seconds.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hello_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Nothing in
/// here needs a lock of its own: realms synchronise internally and the
/// store is `Sync`.
pub(crate) struct ServerState<S: CredentialStore, C: Codec> {
    pub(crate) router: Router,
    pub(crate) store: Arc<S>,
    pub(crate) codec: C,
    pub(crate) auth_config: AuthConfig,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Realmgate router.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use realmgate::prelude::*;
///
/// # async fn run() -> Result<(), RealmgateError> {
/// let users = Arc::new(UserDb::with_credentials([
///     Credential::new("peter", "user", "magic_secret_1"),
/// ]));
///
/// let server = RouterServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .realm("realm1")
///     .build(users)
///     .await?;
/// server.add_component("realm1", &TimeService).await?;
/// server.run().await
/// # }
/// ```
pub struct RouterServerBuilder {
    bind_addr: String,
    realms: Vec<String>,
    auth_config: AuthConfig,
    server_config: ServerConfig,
}

impl RouterServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            realms: Vec::new(),
            auth_config: AuthConfig::default(),
            server_config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Adds a realm to serve. Call once per realm; with no calls the
    /// router serves [`DEFAULT_REALM`].
    pub fn realm(mut self, name: &str) -> Self {
        self.realms.push(name.to_string());
        self
    }

    /// Sets the handshake configuration.
    pub fn auth_config(mut self, config: AuthConfig) -> Self {
        self.auth_config = config;
        self
    }

    /// Sets the connection timeouts.
    pub fn server_config(mut self, config: ServerConfig) -> Self {
        self.server_config = config;
        self
    }

    /// Binds the listener and builds the server around `store`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`. The caller may keep its
    /// own `Arc` to the store and add credentials while the server runs.
    pub async fn build<S: CredentialStore>(
        self,
        store: Arc<S>,
    ) -> Result<RouterServer<S, JsonCodec>, RealmgateError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let router = if self.realms.is_empty() {
            Router::with_realms([DEFAULT_REALM])
        } else {
            Router::with_realms(self.realms)
        };

        let state = Arc::new(ServerState {
            router,
            store,
            codec: JsonCodec,
            auth_config: self.auth_config,
            config: self.server_config,
        });

        Ok(RouterServer { transport, state })
    }
}

impl Default for RouterServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Realmgate router.
///
/// Attach components with [`add_component`](Self::add_component), then
/// call [`run()`](Self::run) to start accepting connections.
pub struct RouterServer<S: CredentialStore, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
}

impl<S, C> RouterServer<S, C>
where
    S: CredentialStore,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The realms this server hosts.
    pub fn router(&self) -> &Router {
        &self.state.router
    }

    /// The credential store attaches are checked against.
    pub fn store(&self) -> &Arc<S> {
        &self.state.store
    }

    /// Joins an embedded component to `realm`.
    pub async fn add_component<A: ApplicationComponent>(
        &self,
        realm: &str,
        component: &A,
    ) -> Result<SessionId, RealmgateError> {
        Ok(self.state.router.add_component(realm, component).await?)
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), RealmgateError> {
        tracing::info!(
            realms = ?self.state.router.realm_names(),
            "Realmgate router running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let conn_id = conn.id();
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                %conn_id,
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
