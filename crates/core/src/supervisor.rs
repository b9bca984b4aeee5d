//! Wires configuration into live transports, signer, dispatcher, and
//! scanner, then runs the fulfillment loop forever — reconnecting with a
//! fixed backoff on any top-level failure, mirroring the teacher
//! scanner's `tokio::spawn` reconnect loops for each event source.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use vrf_chain::{connect, create_gas_strategy, MultiSendDispatcher, TxBuilder};

use crate::config::EngineConfig;
use crate::dedup::FulfilledIds;
use crate::scanner_poll::PollScanner;
use crate::scanner_subscribe::SubscribeScanner;
use crate::sinks::{AlertSink, FulfillmentSink};
use crate::worker_pool::WorkerPool;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// Interval between nonce-rebase checks. Only acts when the ledger
/// reports itself idle.
const NONCE_REBASE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

pub enum ScanMode {
    Poll,
    Subscribe,
}

pub struct Supervisor {
    config: EngineConfig,
    mode: ScanMode,
}

impl Supervisor {
    pub fn new(config: EngineConfig, mode: ScanMode) -> Self {
        Self { config, mode }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        loop {
            match self.run_once().await {
                Ok(()) => warn!("fulfillment loop ended unexpectedly, reconnecting"),
                Err(e) => error!(error = %e, "fulfillment loop failed, reconnecting"),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn run_once(&self) -> anyhow::Result<()> {
        let cfg = &self.config;

        let mut endpoint_transports = Vec::new();
        for url in &cfg.rpc_endpoints {
            endpoint_transports.push(connect(url).await?);
        }
        let primary_transport = endpoint_transports[0].clone();

        let starting_nonce = primary_transport
            .get_transaction_count(signer_address(cfg)?)
            .await?;

        let gas_strategy: Arc<dyn vrf_chain::GasStrategy> = Arc::from(create_gas_strategy(
            cfg.chain_id,
            cfg.default_gas_price_gwei,
            cfg.max_gas_price_gwei,
            cfg.priority_fee_gwei,
        ));

        let tx_builder = Arc::new(TxBuilder::new(
            &cfg.private_key,
            cfg.chain_id,
            cfg.vrf_address,
            starting_nonce,
            gas_strategy.clone(),
        )?);

        info!(
            address = %tx_builder.address,
            chain_id = cfg.chain_id,
            starting_nonce,
            endpoints = cfg.rpc_endpoints.len(),
            "fulfiller initialized"
        );

        let dispatcher = Arc::new(MultiSendDispatcher::new(endpoint_transports.clone()));
        let fulfilled_ids = Arc::new(FulfilledIds::new());
        let alerts = Arc::new(AlertSink::new(cfg.alert_hook_url.clone()));
        let fulfillments = Arc::new(FulfillmentSink::new(cfg.fulfillment_hook_url.clone()));

        let worker_pool = Arc::new(WorkerPool::new(
            tx_builder.clone(),
            gas_strategy,
            cfg.rpc_endpoints[0].clone(),
            dispatcher,
            primary_transport.clone(),
            cfg.abi_variant,
            cfg.delay_blocks,
            alerts.clone(),
            fulfillments,
        ));

        self.spawn_nonce_rebase_task(tx_builder.clone(), primary_transport.clone());

        match self.mode {
            ScanMode::Poll => {
                let run_from_block = primary_transport.latest_block_number().await?;
                let scanner = PollScanner::new(
                    primary_transport,
                    cfg.vrf_address,
                    cfg.abi_variant,
                    cfg.delay_blocks,
                    cfg.catchup_mode,
                    fulfilled_ids,
                    alerts,
                    worker_pool,
                );
                scanner.run(run_from_block).await
            }
            ScanMode::Subscribe => {
                let ws_url = cfg
                    .rpc_endpoints
                    .iter()
                    .find(|u| u.starts_with("ws"))
                    .ok_or_else(|| anyhow::anyhow!("subscribe mode requires a ws(s):// endpoint"))?;
                let ws_transport = connect(ws_url).await?;
                let scanner = SubscribeScanner::new(
                    primary_transport,
                    ws_transport,
                    cfg.vrf_address,
                    cfg.abi_variant,
                    cfg.delay_blocks,
                    fulfilled_ids,
                    alerts,
                    worker_pool,
                );
                scanner.run().await
            }
        }
    }

    fn spawn_nonce_rebase_task(
        &self,
        tx_builder: Arc<TxBuilder>,
        transport: Arc<dyn vrf_chain::ChainTransport>,
    ) {
        let address = tx_builder.address;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(NONCE_REBASE_CHECK_INTERVAL);
            loop {
                interval.tick().await;
                if !tx_builder.nonce_ledger().is_idle() {
                    continue;
                }
                match transport.get_transaction_count(address).await {
                    Ok(chain_nonce) => tx_builder.nonce_ledger().rebase(chain_nonce),
                    Err(e) => warn!(error = %e, "failed to rebase nonce from chain"),
                }
            }
        });
    }
}

fn signer_address(cfg: &EngineConfig) -> anyhow::Result<alloy::primitives::Address> {
    let key = cfg.private_key.trim_start_matches("0x");
    let signer: alloy::signers::local::PrivateKeySigner = key.parse()?;
    Ok(signer.address())
}
