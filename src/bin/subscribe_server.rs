//! VRF Fulfillment Engine — subscribe server
//!
//! Backfills recent blocks over HTTP, then listens to a live WebSocket log
//! subscription for near-instant detection of `RandomWordsRequested`
//! events, reconnecting on any stream failure.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vrf_core::config::EngineConfig;
use vrf_core::{ScanMode, Supervisor};

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    let dotenv_path = parse_dotenv_arg();
    match &dotenv_path {
        Some(path) => {
            dotenvy::from_path(path).ok();
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vrf_core=debug,vrf_chain=debug")),
        )
        .init();

    let config = EngineConfig::from_env()?;
    info!(
        chain_id = config.chain_id,
        vrf_address = %config.vrf_address,
        delay_blocks = config.delay_blocks,
        is_backup = config.is_backup_fulfiller(),
        "subscribe server starting"
    );

    let supervisor = Supervisor::new(config, ScanMode::Subscribe);
    supervisor.run().await
}

fn parse_dotenv_arg() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == "--dotenv")
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_banner() {
    println!(
        r#"
    ╦  ╦╦═╗╔═╗  ╔═╗┬ ┬┬  ┌─┐┬┬  ┬  ┌┬┐┌─┐┌┐┌┌┬┐
    ╚╗╔╝╠╦╝╠╣   ╠╣ │ ││  ├┤ │││  │  │││├┤ │││ │
     ╚╝ ╩╚═╚    ╚  └─┘┴─┘└  ┴┴─┘┴─┘┴ ┴└─┘┘└┘ ┴
    subscribe-server
    "#
    );
}
