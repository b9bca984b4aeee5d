//! Multi-send transaction dispatcher.
//!
//! The same signed raw transaction is broadcast to every RPC endpoint in a
//! chain's endpoint list concurrently, racing them against each other
//! rather than trusting a single node to propagate promptly. The canonical
//! tx hash is computed locally before any broadcast happens, so it's known
//! even if every endpoint times out.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Bytes, B256};
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::transport::ChainTransport;

/// How long to wait for endpoints to accept the transaction before giving
/// up on the stragglers. Endpoints that respond after the deadline are
/// logged, not retried.
pub const BROADCAST_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchReport {
    pub submitted: usize,
    pub accepted: usize,
    pub timed_out: usize,
}

pub struct MultiSendDispatcher {
    endpoints: Vec<Arc<dyn ChainTransport>>,
}

impl MultiSendDispatcher {
    pub fn new(endpoints: Vec<Arc<dyn ChainTransport>>) -> Self {
        Self { endpoints }
    }

    /// Broadcast `raw` to every configured endpoint concurrently. Returns
    /// the transaction hash (computed locally, independent of which
    /// endpoints actually accepted it) plus a report of how many did.
    ///
    /// Errors only if an endpoint explicitly rejected the transaction and
    /// none accepted it. A broadcast where every endpoint merely timed out
    /// still returns the canonical hash successfully — the transaction may
    /// well have been accepted by a node that just didn't answer in time,
    /// and the caller confirms its fate via `wait_for_receipt` regardless.
    pub async fn dispatch(&self, raw: Bytes) -> Result<(B256, DispatchReport), DispatchError> {
        if self.endpoints.is_empty() {
            return Err(DispatchError {
                first_error: "no endpoints configured".to_string(),
            });
        }

        let tx_hash = alloy::primitives::keccak256(&raw);
        let mut report = DispatchReport {
            submitted: self.endpoints.len(),
            ..Default::default()
        };

        let mut first_error: Option<String> = None;
        let futures = self.endpoints.iter().map(|endpoint| {
            let raw = raw.clone();
            async move {
                let outcome =
                    tokio::time::timeout(BROADCAST_TIMEOUT, endpoint.send_raw_transaction(raw))
                        .await;
                (endpoint.url().to_string(), outcome)
            }
        });

        let results = futures::future::join_all(futures).await;

        for (url, outcome) in results {
            match outcome {
                Ok(Ok(hash)) => {
                    debug!(%url, %hash, "endpoint accepted transaction");
                    report.accepted += 1;
                }
                Ok(Err(e)) => {
                    warn!(%url, error = %e, "endpoint rejected transaction");
                    first_error.get_or_insert_with(|| format!("{url}: {e}"));
                }
                Err(_) => {
                    warn!(%url, "endpoint timed out accepting transaction");
                    report.timed_out += 1;
                }
            }
        }

        if report.accepted == 0 {
            if let Some(first_error) = first_error {
                return Err(DispatchError { first_error });
            }
        }

        Ok((tx_hash, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, B256 as Hash};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    struct MockTransport {
        url: String,
        accept: bool,
        delay: Duration,
        calls: StdArc<AtomicUsize>,
    }

    #[async_trait]
    impl ChainTransport for MockTransport {
        fn url(&self) -> &str {
            &self.url
        }

        async fn chain_id(&self) -> Result<u64> {
            Ok(1)
        }

        async fn latest_block_number(&self) -> Result<u64> {
            Ok(0)
        }

        async fn get_logs(
            &self,
            _from: u64,
            _to: u64,
            _address: Address,
            _topics: Vec<Hash>,
        ) -> Result<Vec<alloy::rpc::types::Log>> {
            Ok(vec![])
        }

        async fn get_transaction_count(&self, _addr: Address) -> Result<u64> {
            Ok(0)
        }

        async fn send_raw_transaction(&self, _raw: Bytes) -> Result<Hash> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.accept {
                Ok(Hash::repeat_byte(0x11))
            } else {
                anyhow::bail!("rejected")
            }
        }

        async fn wait_for_receipt(&self, _tx_hash: Hash) -> Result<crate::transport::Receipt> {
            anyhow::bail!("not implemented")
        }

        async fn subscribe_logs(
            &self,
            _address: Address,
            _topics: Vec<Hash>,
        ) -> Result<crate::transport::LogStream> {
            anyhow::bail!("not implemented")
        }
    }

    #[tokio::test]
    async fn dispatch_succeeds_if_any_endpoint_accepts() {
        let calls = StdArc::new(AtomicUsize::new(0));
        let endpoints: Vec<Arc<dyn ChainTransport>> = vec![
            Arc::new(MockTransport {
                url: "a".into(),
                accept: false,
                delay: Duration::from_millis(1),
                calls: calls.clone(),
            }),
            Arc::new(MockTransport {
                url: "b".into(),
                accept: true,
                delay: Duration::from_millis(1),
                calls: calls.clone(),
            }),
        ];
        let dispatcher = MultiSendDispatcher::new(endpoints);
        let (_, report) = dispatcher.dispatch(Bytes::from_static(&[1, 2, 3])).await.unwrap();
        assert_eq!(report.submitted, 2);
        assert_eq!(report.accepted, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dispatch_succeeds_if_every_endpoint_merely_times_out() {
        let calls = StdArc::new(AtomicUsize::new(0));
        let endpoints: Vec<Arc<dyn ChainTransport>> = vec![Arc::new(MockTransport {
            url: "slow".into(),
            accept: true,
            delay: Duration::from_secs(2),
            calls,
        })];
        let dispatcher = MultiSendDispatcher::new(endpoints);
        let raw = Bytes::from_static(&[4, 5, 6]);
        let (hash, report) = dispatcher.dispatch(raw.clone()).await.unwrap();
        assert_eq!(report.accepted, 0);
        assert_eq!(report.timed_out, 1);
        assert_eq!(hash, alloy::primitives::keccak256(&raw));
    }

    #[tokio::test]
    async fn dispatch_fails_if_all_endpoints_reject() {
        let calls = StdArc::new(AtomicUsize::new(0));
        let endpoints: Vec<Arc<dyn ChainTransport>> = vec![Arc::new(MockTransport {
            url: "a".into(),
            accept: false,
            delay: Duration::from_millis(1),
            calls,
        })];
        let dispatcher = MultiSendDispatcher::new(endpoints);
        let result = dispatcher.dispatch(Bytes::from_static(&[1])).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn dispatch_tolerates_stragglers_past_deadline() {
        let calls = StdArc::new(AtomicUsize::new(0));
        let endpoints: Vec<Arc<dyn ChainTransport>> = vec![
            Arc::new(MockTransport {
                url: "fast".into(),
                accept: true,
                delay: Duration::from_millis(1),
                calls: calls.clone(),
            }),
            Arc::new(MockTransport {
                url: "slow".into(),
                accept: true,
                delay: Duration::from_secs(2),
                calls,
            }),
        ];
        let dispatcher = MultiSendDispatcher::new(endpoints);
        let (_, report) = dispatcher.dispatch(Bytes::from_static(&[9])).await.unwrap();
        assert_eq!(report.accepted, 1);
        assert_eq!(report.timed_out, 1);
    }

    #[tokio::test]
    async fn tx_hash_is_local_and_deterministic() {
        let endpoints: Vec<Arc<dyn ChainTransport>> = vec![Arc::new(MockTransport {
            url: "a".into(),
            accept: true,
            delay: Duration::from_millis(1),
            calls: StdArc::new(AtomicUsize::new(0)),
        })];
        let dispatcher = MultiSendDispatcher::new(endpoints);
        let raw = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
        let (hash1, _) = dispatcher.dispatch(raw.clone()).await.unwrap();
        let expected = alloy::primitives::keccak256(&raw);
        assert_eq!(hash1, expected);
    }
}
