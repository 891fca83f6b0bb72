//! Joins a realm with a ticket or WAMP-CRA, asks the time service for the
//! time, and leaves.
//!
//! ```text
//! cargo run -p ticket-client -- --authid joe --ticket magic_secret_2
//! cargo run -p ticket-client -- --authmethod wampcra
//! ```

use clap::{Parser, ValueEnum};
use realmgate::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "ticket-client")]
#[command(about = "Ticket-authenticated client for the time service", long_about = None)]
struct Args {
    /// Router URL
    #[arg(long, default_value = "ws://localhost:8080")]
    url: String,

    /// Realm to join
    #[arg(long, default_value = "realm1")]
    realm: String,

    /// Identity to claim
    #[arg(long, default_value = "peter")]
    authid: String,

    /// Secret to answer the challenge with: sent as is for ticket, used
    /// to sign the challenge for wampcra
    #[arg(long, default_value = "magic_secret_1")]
    ticket: String,

    /// How to authenticate
    #[arg(long, value_enum, default_value_t = Method::Ticket)]
    authmethod: Method,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long)]
    debug: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Method {
    Ticket,
    Wampcra,
}

#[tokio::main]
async fn main() -> Result<(), RealmgateError> {
    let args = Args::parse();
    realmgate::init_logging(args.debug);

    let mut client = TicketClient::connect(&args.url).await?;
    let welcome = match args.authmethod {
        Method::Ticket => client.join(&args.realm, &args.authid, &args.ticket).await?,
        Method::Wampcra => {
            client
                .join_wampcra(&args.realm, &args.authid, &args.ticket)
                .await?
        }
    };
    println!(
        "joined {} as {} (role {}, method {}, session {})",
        args.realm, welcome.authid, welcome.authrole, welcome.authmethod, welcome.session
    );

    match client.call(TIMESERVICE_NOW, vec![]).await {
        Ok(now) => println!("Current time from time service: {now}"),
        Err(e) => tracing::error!(error = %e, "time service call failed"),
    }

    client.leave().await
}
