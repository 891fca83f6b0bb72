//! A plain byte protocol served through the WebSocket listener.
//!
//! Every connection is greeted with `how are you?`; whatever the peer
//! sends back is logged verbatim, non-ASCII bytes as `\xNN` escapes.

use clap::Parser;
use realmgate::transport::{ByteProtocol, ConnectionId, WebSocketTransport, serve_wrapped};

#[derive(Parser, Debug)]
#[command(name = "wrapping-server")]
#[command(about = "Greeting byte protocol wrapped in WebSocket", long_about = None)]
struct Args {
    /// Address the WebSocket listener binds to
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long)]
    debug: bool,
}

const GREETING: &[u8] = b"how are you?";

/// Greets on connect, logs what arrives.
#[derive(Default)]
struct HelloProtocol {
    connected: bool,
}

impl ByteProtocol for HelloProtocol {
    fn connection_made(&mut self, id: ConnectionId) -> Option<Vec<u8>> {
        self.connected = true;
        tracing::info!(%id, "connection made");
        Some(GREETING.to_vec())
    }

    fn data_received(&mut self, id: ConnectionId, data: &[u8]) -> Option<Vec<u8>> {
        if !self.connected {
            tracing::warn!(%id, "data before connection_made");
        }
        tracing::info!(%id, data = %printable(data), "data received");
        None
    }

    fn connection_lost(&mut self, id: ConnectionId) {
        self.connected = false;
        tracing::info!(%id, "connection lost");
    }
}

/// Renders a chunk for the log without losing bytes: printable ASCII as
/// is, everything else escaped.
fn printable(data: &[u8]) -> String {
    data.escape_ascii().to_string()
}

#[tokio::main]
async fn main() -> Result<(), realmgate::RealmgateError> {
    let args = Args::parse();
    realmgate::init_logging(args.debug);

    let transport = WebSocketTransport::bind(&args.listen).await?;
    serve_wrapped(transport, HelloProtocol::default).await?;
    Ok(())
}
