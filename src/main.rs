//! Gateway daemon
//!
//! Runs the discovery engine standalone: loads the persisted node list,
//! seeds it with any bootstrap addresses, starts the maintenance tasks,
//! and shuts down cleanly on Ctrl-C.

use clap::Parser;
use mini_gateway::{Gateway, GatewayConfig, NetAddress, NodeError};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "gateway")]
#[command(version = "0.1.0")]
#[command(about = "Peer discovery daemon for a mini-blockchain node", long_about = None)]
struct Cli {
    /// Data directory for the persisted node list
    #[arg(short, long, default_value = ".gateway_data")]
    data_dir: PathBuf,

    /// Our own announced address (host:port)
    #[arg(short, long)]
    addr: String,

    /// Genesis block ID of the chain we follow
    #[arg(short, long)]
    genesis_id: String,

    /// Bootstrap node to seed the list with (repeatable)
    #[arg(short, long)]
    bootstrap: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();
    let cli = Cli::parse();

    let config = GatewayConfig {
        my_addr: NetAddress::from(cli.addr),
        genesis_id: cli.genesis_id,
        data_dir: cli.data_dir,
        ..Default::default()
    };

    let gateway = Arc::new(Gateway::new(config)?);

    for addr in &cli.bootstrap {
        match gateway.add_node(NetAddress::from(addr.as_str())).await {
            Ok(()) | Err(NodeError::AlreadyKnown) => {}
            Err(e) => log::warn!("skipping bootstrap node '{}': {}", addr, e),
        }
    }

    Arc::clone(&gateway).start();
    log::info!("running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    gateway.shutdown().await;

    Ok(())
}
