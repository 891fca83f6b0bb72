//! Plain byte protocols carried inside the WebSocket listener.
//!
//! A [`ByteProtocol`] only ever sees opaque chunks of bytes: it has no
//! idea that each chunk arrived as a WebSocket message. [`serve_wrapped`]
//! does the unwrapping, so a protocol written for a raw stream can be put
//! behind a WebSocket endpoint unchanged.

use crate::{
    Connection, ConnectionId, Transport, TransportError, WebSocketConnection,
    WebSocketTransport,
};

/// A byte-level protocol instance, one per connection.
///
/// Methods are synchronous and return the bytes to write back (if any).
/// The server does all the I/O.
pub trait ByteProtocol: Send + 'static {
    /// Called once when the connection is established.
    fn connection_made(&mut self, id: ConnectionId) -> Option<Vec<u8>>;

    /// Called for every inbound chunk, in arrival order.
    fn data_received(
        &mut self,
        id: ConnectionId,
        data: &[u8],
    ) -> Option<Vec<u8>>;

    /// Called once after the peer went away (cleanly or not).
    fn connection_lost(&mut self, _id: ConnectionId) {}
}

/// Accepts connections forever, running a fresh protocol from `factory`
/// on each one in its own task.
pub async fn serve_wrapped<P, F>(
    mut transport: WebSocketTransport,
    mut factory: F,
) -> Result<(), TransportError>
where
    P: ByteProtocol,
    F: FnMut() -> P + Send + 'static,
{
    tracing::info!("wrapped byte protocol server running");

    loop {
        match transport.accept().await {
            Ok(conn) => {
                let protocol = factory();
                tokio::spawn(async move {
                    let id = conn.id();
                    if let Err(e) = drive(conn, protocol).await {
                        tracing::debug!(%id, error = %e, "wrapped connection failed");
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
            }
        }
    }
}

async fn drive<P: ByteProtocol>(
    conn: WebSocketConnection,
    mut protocol: P,
) -> Result<(), TransportError> {
    let id = conn.id();

    if let Some(greeting) = protocol.connection_made(id) {
        conn.send(&greeting).await?;
    }

    let result = loop {
        match conn.recv().await {
            Ok(Some(data)) => {
                if let Some(reply) = protocol.data_received(id, &data) {
                    if let Err(e) = conn.send(&reply).await {
                        break Err(e);
                    }
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    protocol.connection_lost(id);
    result
}
