//! Ticket and WAMP-CRA authentication for Realmgate.
//!
//! Three pieces:
//!
//! 1. **Credential storage**: who may attach and with which secret
//!    ([`CredentialStore`] trait, [`UserDb`] in-memory implementation)
//! 2. **The attach handshake**: one [`AuthenticatingSession`] per
//!    connection, driven hello → challenge → authenticate → accept/deny
//! 3. **WAMP-CRA primitives** ([`cra`]): key derivation and HMAC
//!    signatures, shared by the router and clients
//!
//! # How it fits in the stack
//!
//! ```text
//! Router Layer (above)  ← asks the session what to do with each hello/authenticate
//!     ↕
//! Auth Layer (this crate)  ← decides challenge / accept / deny
//!     ↕
//! Protocol Layer (below)  ← provides HelloDetails, Extra
//! ```

#![allow(async_fn_in_trait)]

pub mod cra;
mod error;
mod session;
mod store;

pub use error::AuthError;
pub use session::{
    AuthConfig, AuthDecision, AuthMethod, AuthenticatingSession, HandshakeState,
    Identity, PendingAuth,
};
pub use cra::SaltParams;
pub use store::{Credential, CredentialStore, Ticket, UserDb};
