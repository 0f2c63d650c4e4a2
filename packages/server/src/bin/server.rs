//! Yoriai relay server.
//!
//! Hosts one shared to-do document per room and relays every accepted change
//! to the room's WebSocket subscribers.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin yoriai-server
//! cargo run --bin yoriai-server -- --host 0.0.0.0 --port 3000 --no-seed
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use yoriai_server::ui::{Server, ServerConfig};
use yoriai_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "yoriai-server")]
#[command(about = "Relay server for collaborative to-do rooms", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Seconds after which a silent participant is removed from the room
    #[arg(long, default_value = "60")]
    presence_expiry_secs: u64,

    /// Seconds between two presence sweeps
    #[arg(long, default_value = "10")]
    sweep_interval_secs: u64,

    /// Create new rooms without the onboarding tasks
    #[arg(long)]
    no_seed: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let config = ServerConfig {
        presence_expiry: Duration::from_secs(args.presence_expiry_secs),
        sweep_interval: Duration::from_secs(args.sweep_interval_secs.max(1)),
        seed_new_rooms: !args.no_seed,
    };
    tracing::debug!("Server config: {:?}", config);

    let server = Server::in_memory(config, Arc::new(SystemClock));
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
