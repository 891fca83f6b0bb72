//! Wire protocol for Realmgate.
//!
//! This crate defines what clients and the router say to each other:
//!
//! - **Types** ([`Message`], [`HelloDetails`], [`SessionId`], [`uri`]):
//!   the frames of the attach handshake and the session that follows.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! It knows nothing about connections, credentials, or realms.
//!
//! ```text
//! Transport (bytes) → Protocol (Message) → Auth / Router
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Extra, HelloDetails, Message, RequestId, SessionId, uri};
