//! Bounded worker pool that turns a `RequestEvent` into a signed,
//! broadcast, and confirmed `fulfillRandomWords` call.
//!
//! Nonces are reserved from the [`NonceLedger`](vrf_chain::NonceLedger)
//! the moment a job is accepted, not when its transaction is actually
//! built, so concurrent workers never collide. Fulfilling anything at all
//! while `delay_blocks` is set means this process is a backup fulfiller
//! and is winning a race it should rarely win, so that case is alerted on.

use std::sync::Arc;

use alloy::primitives::U256;
use rand::RngCore;
use tokio::sync::Semaphore;
use tracing::warn;

use vrf_chain::{
    AbiVariant, ChainTransport, GasStrategy, MultiSendDispatcher, RequestCommitment, RequestEvent,
    TxBuilder,
};

use crate::sinks::{AlertSink, FulfillmentSink};

/// Matches the original service's `ThreadPoolExecutor(max_workers=5)`:
/// plenty of throughput without flooding RPC endpoints.
pub const MAX_CONCURRENT_FULFILLMENTS: usize = 5;

pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    tx_builder: Arc<TxBuilder>,
    gas_strategy: Arc<dyn GasStrategy>,
    gas_rpc_url: String,
    dispatcher: Arc<MultiSendDispatcher>,
    confirm_transport: Arc<dyn ChainTransport>,
    abi_variant: AbiVariant,
    delay_blocks: u64,
    alerts: Arc<AlertSink>,
    fulfillments: Arc<FulfillmentSink>,
}

impl WorkerPool {
    pub fn new(
        tx_builder: Arc<TxBuilder>,
        gas_strategy: Arc<dyn GasStrategy>,
        gas_rpc_url: String,
        dispatcher: Arc<MultiSendDispatcher>,
        confirm_transport: Arc<dyn ChainTransport>,
        abi_variant: AbiVariant,
        delay_blocks: u64,
        alerts: Arc<AlertSink>,
        fulfillments: Arc<FulfillmentSink>,
    ) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_FULFILLMENTS)),
            tx_builder,
            gas_strategy,
            gas_rpc_url,
            dispatcher,
            confirm_transport,
            abi_variant,
            delay_blocks,
            alerts,
            fulfillments,
        }
    }

    /// Accept a request for fulfillment. Spawns a detached task and
    /// returns immediately — in-flight fulfillments never block the
    /// scanner from continuing to scan.
    pub fn spawn_fulfillment(self: &Arc<Self>, event: RequestEvent) {
        if self.delay_blocks > 0 {
            let alerts = self.alerts.clone();
            let request_id = event.request_id;
            tokio::spawn(async move {
                alerts
                    .send(format!(
                        "unexpectedly fulfilling request {request_id} from a server with delay_blocks set"
                    ))
                    .await;
            });
        }

        // Mark the nonce ledger as having one more job in flight the moment
        // the job is accepted, not once its nonce is actually drawn, so
        // `outstanding` stays balanced even if a later RPC call fails
        // before a nonce is ever reserved.
        self.tx_builder.nonce_ledger().acquire();

        let pool = self.clone();
        tokio::spawn(async move {
            let _permit = pool
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore never closed");
            pool.fulfill(event).await;
        });
    }

    async fn fulfill(&self, event: RequestEvent) {
        let request_id = event.request_id;
        let block_number = event.block_number;

        let result = self.try_fulfill(&event).await;

        self.tx_builder.nonce_ledger().release();

        match result {
            Ok((tx_hash, confirmed_block, status)) => {
                let label = if status { "SUCCESS" } else { "FAILURE" };
                self.fulfillments
                    .send(format!(
                        "{label} - {} blocks - tx {tx_hash:#x}",
                        confirmed_block.saturating_sub(block_number)
                    ))
                    .await;
            }
            Err(e) => {
                warn!(%request_id, error = %e, "failed to fulfill request");
                self.alerts
                    .send(format!("failed to fulfill {request_id}: {e}"))
                    .await;
            }
        }
    }

    async fn try_fulfill(&self, event: &RequestEvent) -> anyhow::Result<(alloy::primitives::B256, u64, bool)> {
        let randomness = random_u256();
        let commitment = RequestCommitment::from(event);
        let calldata = vrf_chain::encode_fulfill_call(
            self.abi_variant,
            event.request_id,
            randomness,
            commitment,
        );

        let gas_params = self.gas_strategy.fetch_params(&self.gas_rpc_url).await?;

        let raw = self.tx_builder.build_fulfill_tx(calldata, &gas_params).await?;
        let (tx_hash, _report) = self.dispatcher.dispatch(raw).await?;
        let receipt = self.confirm_transport.wait_for_receipt(tx_hash).await?;

        Ok((tx_hash, receipt.block_number, receipt.status))
    }
}

fn random_u256() -> U256 {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    U256::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_u256_is_not_trivially_constant() {
        let a = random_u256();
        let b = random_u256();
        assert_ne!(a, b);
    }
}
