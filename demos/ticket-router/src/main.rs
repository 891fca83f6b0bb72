//! A Realmgate router with ticket authentication.
//!
//! Seeds two users (peter and joe), serves realm1 over WebSocket, and
//! optionally runs the time service inside the router:
//!
//! ```text
//! cargo run -p ticket-router -- --component timeservice --debug
//! ```

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use realmgate::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "ticket-router")]
#[command(about = "WAMP-style router with ticket and WAMP-CRA authentication", long_about = None)]
struct Args {
    /// Address the WebSocket listener binds to
    #[arg(long, default_value = "127.0.0.1:8080")]
    websocket: String,

    /// Public URL clients should use to reach the listener. Only printed
    /// in the startup log; the listener binds to --websocket
    #[arg(long, default_value = "ws://localhost:8080")]
    wsurl: String,

    /// Realm to serve
    #[arg(long, default_value = "realm1")]
    realm: String,

    /// Application component to run inside the router
    #[arg(long, value_enum)]
    component: Option<Component>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long)]
    debug: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Component {
    /// Registers com.timeservice.now
    Timeservice,
}

#[tokio::main]
async fn main() -> Result<(), RealmgateError> {
    let args = Args::parse();
    realmgate::init_logging(args.debug);

    let users = Arc::new(UserDb::new());
    users
        .add(Credential::new("peter", "user", "magic_secret_1"))
        .await?;
    users
        .add(Credential::new("joe", "user", "magic_secret_2"))
        .await?;

    let server = RouterServerBuilder::new()
        .bind(&args.websocket)
        .realm(&args.realm)
        .build(users)
        .await?;

    if let Some(Component::Timeservice) = args.component {
        server.add_component(&args.realm, &TimeService).await?;
    }

    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, url = %args.wsurl, realm = %args.realm, "ticket router ready");
    }

    server.run().await
}
