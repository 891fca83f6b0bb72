//! # Realmgate
//!
//! A small WAMP-style router that admits clients with a ticket or
//! WAMP-CRA challenge-response handshake.
//!
//! A client says hello to a realm, the router looks its authid up in a
//! [`CredentialStore`](realmgate_auth::CredentialStore) and challenges it,
//! and the client answers with its ticket or an HMAC signature over the
//! challenge. Admitted sessions can call
//! procedures registered by embedded components such as the
//! [`TimeService`](realmgate_router::TimeService).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use realmgate::prelude::*;
//!
//! # async fn run() -> Result<(), RealmgateError> {
//! let users = Arc::new(UserDb::new());
//! users.add(Credential::new("peter", "user", "magic_secret_1")).await?;
//!
//! let server = RouterServerBuilder::new()
//!     .bind("127.0.0.1:8080")
//!     .build(users)
//!     .await?;
//! server.add_component("realm1", &TimeService).await?;
//! server.run().await
//! # }
//! ```

mod client;
mod error;
mod handler;
mod server;

pub use client::{TicketClient, Welcome};
pub use error::RealmgateError;
pub use server::{DEFAULT_REALM, RouterServer, RouterServerBuilder, ServerConfig};

pub use realmgate_auth as auth;
pub use realmgate_protocol as protocol;
pub use realmgate_router as router;
pub use realmgate_transport as transport;

/// Installs a `tracing` subscriber that writes to stderr.
///
/// `RUST_LOG` wins when set; otherwise the level is `debug` or `info`
/// depending on `debug`. Meant for binaries: call once at startup.
pub fn init_logging(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));

    // A second call keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Everything needed to run a router or write a client.
pub mod prelude {
    pub use crate::{
        RealmgateError, RouterServer, RouterServerBuilder, ServerConfig,
        TicketClient, Welcome,
    };
    pub use realmgate_auth::{
        AuthConfig, Credential, CredentialStore, SaltParams, UserDb,
    };
    pub use realmgate_protocol::{HelloDetails, Message, RequestId, SessionId, uri};
    pub use realmgate_router::{
        ApplicationComponent, ComponentSession, RouterError, TIMESERVICE_NOW,
        TimeService,
    };
}
