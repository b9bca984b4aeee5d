//! Poll-based scanner: repeatedly fetches a sliding window of logs over
//! HTTP and hands pending requests to the worker pool.
//!
//! A 50-block overlap window absorbs RPC endpoints that occasionally
//! serve a stale head, and the per-query range is capped at 1,900 blocks
//! to stay under common free-tier log-query limits. An optional catch-up
//! mode widens that ceiling to 10,000 blocks for the first pass when the
//! engine starts far behind the chain head.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use vrf_chain::{is_known_transient_message, AbiVariant, ChainTransport, DecodedLog, EventSignatures};

use crate::dedup::FulfilledIds;
use crate::sinks::AlertSink;
use crate::worker_pool::WorkerPool;

const OVERLAP_BLOCKS: u64 = 50;
const DEFAULT_RANGE_CEILING: u64 = 1_900;
const CATCHUP_RANGE_CEILING: u64 = 10_000;
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const ERROR_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScannerState {
    Idle,
    Scanning,
    Backoff,
}

pub struct PollScanner {
    transport: Arc<dyn ChainTransport>,
    vrf_address: alloy::primitives::Address,
    abi_variant: AbiVariant,
    sigs: EventSignatures,
    delay_blocks: u64,
    catchup_mode: bool,
    fulfilled_ids: Arc<FulfilledIds>,
    alerts: Arc<AlertSink>,
    worker_pool: Arc<WorkerPool>,
}

impl PollScanner {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        vrf_address: alloy::primitives::Address,
        abi_variant: AbiVariant,
        delay_blocks: u64,
        catchup_mode: bool,
        fulfilled_ids: Arc<FulfilledIds>,
        alerts: Arc<AlertSink>,
        worker_pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            transport,
            vrf_address,
            abi_variant,
            sigs: EventSignatures::for_variant(abi_variant),
            delay_blocks,
            catchup_mode,
            fulfilled_ids,
            alerts,
            worker_pool,
        }
    }

    /// Run forever, starting from `run_from_block`. Never returns under
    /// normal operation; transient RPC errors are logged and retried.
    pub async fn run(&self, run_from_block: u64) -> anyhow::Result<()> {
        info!(run_from_block, "starting poll scan");
        let mut last_block = run_from_block;
        let mut state = ScannerState::Idle;
        let mut first_pass = true;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            state = ScannerState::Scanning;

            let current_block = match self.transport.latest_block_number().await {
                Ok(b) => b,
                Err(e) => {
                    self.on_scan_error(e, &mut state).await;
                    continue;
                }
            };

            if current_block <= last_block {
                state = ScannerState::Idle;
                continue;
            }

            let ceiling = if first_pass && self.catchup_mode {
                CATCHUP_RANGE_CEILING
            } else {
                DEFAULT_RANGE_CEILING
            };

            let scan_from = last_block.saturating_sub(OVERLAP_BLOCKS);
            let scan_to = (scan_from + ceiling).min(current_block);

            match self.scan_range(scan_from, scan_to).await {
                Ok(()) => {
                    last_block = scan_to;
                    first_pass = false;
                    state = ScannerState::Idle;
                }
                Err(e) => {
                    self.on_scan_error(e, &mut state).await;
                }
            }
        }
    }

    async fn on_scan_error(&self, error: anyhow::Error, state: &mut ScannerState) {
        *state = ScannerState::Backoff;
        // The transport layer folds JSON-RPC error text into the error
        // chain rather than always constructing a typed `RpcError`, so
        // match the rendered chain instead of downcasting.
        if is_known_transient_message(&format!("{error:#}")) {
            warn!(error = %error, "known-transient rpc error, continuing");
            tokio::time::sleep(ERROR_BACKOFF).await;
            return;
        }
        warn!(error = %error, "poll scan error");
        self.alerts.send(format!("poll scan error: {error}")).await;
        tokio::time::sleep(ERROR_BACKOFF).await;
    }

    async fn scan_range(&self, from: u64, to: u64) -> anyhow::Result<()> {
        info!(from, to, "scanning block range");
        let logs = self
            .transport
            .get_logs(from, to, self.vrf_address, self.sigs.all())
            .await?;

        let delay_cutoff = to.saturating_sub(self.delay_blocks);

        let mut decoded_logs = Vec::with_capacity(logs.len());
        for log in &logs {
            if let Some(decoded) = vrf_chain::decode_log(log, self.abi_variant, &self.sigs)? {
                decoded_logs.push(decoded);
            }
        }

        let outcome = select_pending_requests(decoded_logs, delay_cutoff, &self.fulfilled_ids);

        for event in &outcome.pending {
            self.worker_pool.spawn_fulfillment(event.clone());
        }

        info!(
            requested_count = outcome.requested_count,
            fulfilled_count = outcome.fulfilled_count,
            pending_count = outcome.pending.len(),
            "poll scan range processed"
        );
        Ok(())
    }
}

struct ScanOutcome {
    pending: Vec<vrf_chain::RequestEvent>,
    requested_count: usize,
    fulfilled_count: usize,
}

/// Partition a window's decoded logs into requests still owed a
/// fulfillment. Claims every fulfilled id before looking at any requested
/// id: a request and its fulfillment can land in the same window, and
/// arrival order within the window is by ascending block number, so
/// processing requested logs first would dispatch a fulfillment for a
/// request this very window already shows as fulfilled.
fn select_pending_requests(
    decoded_logs: Vec<DecodedLog>,
    delay_cutoff: u64,
    fulfilled_ids: &FulfilledIds,
) -> ScanOutcome {
    let mut fulfilled_count = 0;
    for decoded in &decoded_logs {
        if let DecodedLog::Fulfilled(event) = decoded {
            fulfilled_count += 1;
            fulfilled_ids.claim(event.request_id);
        }
    }

    let mut requested_count = 0;
    let mut pending = Vec::new();
    for decoded in decoded_logs {
        if let DecodedLog::Requested(event) = decoded {
            requested_count += 1;
            if event.block_number > delay_cutoff {
                continue;
            }
            if fulfilled_ids.claim(event.request_id) {
                pending.push(event);
            }
        }
    }

    ScanOutcome {
        pending,
        requested_count,
        fulfilled_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use vrf_chain::{FulfilledEvent, RequestEvent};

    fn requested(request_id: u64, block_number: u64) -> DecodedLog {
        DecodedLog::Requested(RequestEvent {
            request_id: U256::from(request_id),
            sub_id: U256::from(1u64),
            callback_gas_limit: 100_000,
            num_words: 1,
            sender: Address::ZERO,
            block_number,
        })
    }

    fn fulfilled(request_id: u64, block_number: u64) -> DecodedLog {
        DecodedLog::Fulfilled(FulfilledEvent {
            request_id: U256::from(request_id),
            block_number,
        })
    }

    #[test]
    fn a_request_fulfilled_in_the_same_window_is_never_dispatched() {
        // Logs arrive in ascending block order: the request is always
        // seen before its own fulfillment within a window.
        let logs = vec![requested(9, 100), fulfilled(9, 105)];
        let fulfilled_ids = FulfilledIds::new();
        let outcome = select_pending_requests(logs, 1_000, &fulfilled_ids);
        assert!(outcome.pending.is_empty());
        assert_eq!(outcome.requested_count, 1);
        assert_eq!(outcome.fulfilled_count, 1);
    }

    #[test]
    fn an_unfulfilled_request_within_the_delay_cutoff_is_dispatched() {
        let logs = vec![requested(9, 100)];
        let fulfilled_ids = FulfilledIds::new();
        let outcome = select_pending_requests(logs, 1_000, &fulfilled_ids);
        assert_eq!(outcome.pending.len(), 1);
        assert_eq!(outcome.pending[0].request_id, U256::from(9u64));
    }

    #[test]
    fn a_request_past_the_delay_cutoff_is_held_back() {
        let logs = vec![requested(9, 950)];
        let fulfilled_ids = FulfilledIds::new();
        let outcome = select_pending_requests(logs, 900, &fulfilled_ids);
        assert!(outcome.pending.is_empty());
    }

    #[test]
    fn a_request_already_claimed_by_a_prior_window_is_not_redispatched() {
        let fulfilled_ids = FulfilledIds::new();
        fulfilled_ids.claim(U256::from(9u64));
        let outcome = select_pending_requests(vec![requested(9, 100)], 1_000, &fulfilled_ids);
        assert!(outcome.pending.is_empty());
    }
}
