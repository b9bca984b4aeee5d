//! Subscribe-based scanner: backfills recent blocks over HTTP, then
//! listens to a live WebSocket log subscription for near-instant event
//! detection. Reconnects with a short fixed delay on any stream error.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{info, warn};

use vrf_chain::{AbiVariant, ChainTransport, DecodedLog, EventSignatures};

use crate::dedup::FulfilledIds;
use crate::sinks::AlertSink;
use crate::worker_pool::WorkerPool;

const BACKFILL_BLOCKS: u64 = 200;
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

pub struct SubscribeScanner {
    backfill_transport: Arc<dyn ChainTransport>,
    ws_transport: Arc<dyn ChainTransport>,
    vrf_address: alloy::primitives::Address,
    abi_variant: AbiVariant,
    sigs: EventSignatures,
    delay_blocks: u64,
    fulfilled_ids: Arc<FulfilledIds>,
    alerts: Arc<AlertSink>,
    worker_pool: Arc<WorkerPool>,
}

impl SubscribeScanner {
    pub fn new(
        backfill_transport: Arc<dyn ChainTransport>,
        ws_transport: Arc<dyn ChainTransport>,
        vrf_address: alloy::primitives::Address,
        abi_variant: AbiVariant,
        delay_blocks: u64,
        fulfilled_ids: Arc<FulfilledIds>,
        alerts: Arc<AlertSink>,
        worker_pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            backfill_transport,
            ws_transport,
            vrf_address,
            abi_variant,
            sigs: EventSignatures::for_variant(abi_variant),
            delay_blocks,
            fulfilled_ids,
            alerts,
            worker_pool,
        }
    }

    /// Run forever: backfill, subscribe, process, and reconnect on error.
    pub async fn run(&self) -> anyhow::Result<()> {
        loop {
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "websocket subscription error, reconnecting");
                self.alerts
                    .send(format!("websocket error, reconnecting: {e}"))
                    .await;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn run_once(&self) -> anyhow::Result<()> {
        self.backfill().await;

        let mut stream = self
            .ws_transport
            .subscribe_logs(self.vrf_address, self.sigs.all())
            .await?;

        info!("subscribed to vrf log stream");

        while let Some(log) = stream.next().await {
            let decoded = match vrf_chain::decode_log(&log, self.abi_variant, &self.sigs) {
                Ok(d) => d,
                Err(e) => return Err(e.into()),
            };

            match decoded {
                Some(DecodedLog::Fulfilled(event)) => {
                    self.fulfilled_ids.claim(event.request_id);
                    info!(request_id = %event.request_id, "saw fulfillment via subscription");
                }
                Some(DecodedLog::Requested(event)) => {
                    self.handle_requested(event).await;
                }
                None => {}
            }
        }

        anyhow::bail!("log subscription stream ended")
    }

    async fn backfill(&self) {
        let current_block = match self.backfill_transport.latest_block_number().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "backfill: failed to fetch latest block");
                return;
            }
        };
        let from = current_block.saturating_sub(BACKFILL_BLOCKS).max(1);

        info!(from, to = current_block, "backfilling");

        let logs = match self
            .backfill_transport
            .get_logs(from, current_block, self.vrf_address, self.sigs.all())
            .await
        {
            Ok(logs) => logs,
            Err(e) => {
                warn!(error = %e, "backfill: failed to fetch logs");
                return;
            }
        };

        let delay_cutoff = current_block.saturating_sub(self.delay_blocks);

        let mut decoded_logs = Vec::with_capacity(logs.len());
        for log in &logs {
            match vrf_chain::decode_log(log, self.abi_variant, &self.sigs) {
                Ok(Some(decoded)) => decoded_logs.push(decoded),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "backfill: decode error"),
            }
        }

        // Claim fulfilled ids before touching any requested id, same as the
        // poll scanner: a request and its fulfillment can both land inside
        // this backfill window.
        for decoded in &decoded_logs {
            if let DecodedLog::Fulfilled(event) = decoded {
                self.fulfilled_ids.claim(event.request_id);
            }
        }

        for decoded in decoded_logs {
            if let DecodedLog::Requested(event) = decoded {
                if event.block_number > delay_cutoff {
                    continue;
                }
                self.handle_requested(event).await;
            }
        }
    }

    async fn handle_requested(&self, event: vrf_chain::RequestEvent) {
        if self.fulfilled_ids.claim(event.request_id) {
            info!(request_id = %event.request_id, block = event.block_number, "request seen");
            self.worker_pool.spawn_fulfillment(event);
        }
    }
}
