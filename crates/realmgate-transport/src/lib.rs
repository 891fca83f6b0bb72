//! Transport layer for Realmgate.
//!
//! Provides the [`Transport`] and [`Connection`] traits that the router
//! drives, a WebSocket implementation of both, and a small server for
//! plain byte protocols carried inside the WebSocket listener
//! ([`ByteProtocol`], [`serve_wrapped`]).
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;
#[cfg(feature = "websocket")]
mod wrapping;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};
#[cfg(feature = "websocket")]
pub use wrapping::{ByteProtocol, serve_wrapped};

use std::fmt;
use std::net::SocketAddr;

/// Process-unique number of an accepted connection, shown as `conn-N`
/// in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener the router pulls connections from.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Blocks until a peer connects and its upgrade completes.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The bound address. With port `0` this is where the OS put us.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// One peer, exchanging whole frames.
///
/// `send` and `recv` take `&self`: a handler may be waiting in `recv`
/// while another task sends on the same connection.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Starts an orderly close.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
