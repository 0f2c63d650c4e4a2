//! Terminal client for a Yoriai room.
//!
//! Connects to a relay server, restores the last profile used on this device
//! (or joins with `--name`) and reads commands from the prompt. Plain text
//! adds a task; `/help` lists the commands.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin yoriai-client -- --name Alice
//! cargo run --bin yoriai-client -- -r 3fa9c1d2e4 -n Bob
//! ```

use std::path::PathBuf;

use clap::Parser;

use yoriai_client::cli::{ClientConfig, run_client};
use yoriai_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "yoriai-client")]
#[command(about = "Collaborative to-do list client with presence and live edits", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Room key to enter (a new room is created when omitted)
    #[arg(short = 'r', long)]
    room: Option<String>,

    /// Join immediately under this name
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Directory for the participant id and last profile
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let data_dir = args.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("yoriai")
    });

    let config = ClientConfig {
        url: args.url,
        room: args.room,
        name: args.name,
        data_dir,
    };

    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
