//! VRF Fulfillment Engine — poll server
//!
//! Scans the configured coordinator for `RandomWordsRequested` events over
//! HTTP at a fixed interval and dispatches fulfillments for anything not
//! already fulfilled on-chain or claimed locally.

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
        catchup_mode = config.catchup_mode,
        is_backup = config.is_backup_fulfiller(),
        "poll server starting"
    );

    let supervisor = Supervisor::new(config, ScanMode::Poll);
    supervisor.run().await
}

/// Parses `--dotenv <path>` from argv. Anything else is ignored.
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
    poll-server
    "#
    );
}
