//! Uniform request/response and log-subscription access to one chain-RPC
//! endpoint. The only component in this crate that performs I/O.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{Filter, Log, TransactionReceipt};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::Stream;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::TransportError;

/// How often to re-poll for a pending receipt.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// How long to keep polling before giving up on a transaction landing.
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Poll `get_transaction_receipt` until it appears or `RECEIPT_TIMEOUT`
/// elapses. A transaction is essentially never mined by the time the
/// broadcast call returns, so a single lookup right after dispatch would
/// always miss.
async fn poll_for_receipt(provider: &impl Provider, tx_hash: B256) -> Result<Receipt> {
    let deadline = tokio::time::Instant::now() + RECEIPT_TIMEOUT;
    loop {
        if let Some(receipt) = provider.get_transaction_receipt(tx_hash).await? {
            return Ok(receipt.into());
        }
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("timed out waiting for receipt of {tx_hash}");
        }
        tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
    }
}

/// Outcome of `wait_for_receipt`: just the two fields the engine needs.
#[derive(Debug, Clone, Copy)]
pub struct Receipt {
    pub status: bool,
    pub block_number: u64,
}

impl From<TransactionReceipt> for Receipt {
    fn from(r: TransactionReceipt) -> Self {
        Self {
            status: r.status(),
            block_number: r.block_number.unwrap_or_default(),
        }
    }
}

/// A live feed of raw logs from a subscription.
pub type LogStream = Pin<Box<dyn Stream<Item = Log> + Send>>;

/// Chain transport: request/response plus log subscription over a single
/// RPC endpoint. HTTP and WebSocket variants implement the same trait so
/// the scanner/signer code never cares which transport it's holding.
#[async_trait]
pub trait ChainTransport: Send + Sync {
    fn url(&self) -> &str;

    async fn chain_id(&self) -> Result<u64>;

    async fn latest_block_number(&self) -> Result<u64>;

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        address: Address,
        topics: Vec<B256>,
    ) -> Result<Vec<Log>>;

    async fn get_transaction_count(&self, addr: Address) -> Result<u64>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256>;

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<Receipt>;

    /// Only implemented by WebSocket transports; HTTP transports error.
    async fn subscribe_logs(&self, address: Address, topics: Vec<B256>) -> Result<LogStream>;
}

/// Build a transport from a URL, dispatching on scheme. `http(s)://` is an
/// `HttpTransport`; `ws(s)://` is a `WsTransport`.
pub async fn connect(url: &str) -> Result<Arc<dyn ChainTransport>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(Arc::new(HttpTransport::new(url)?))
    } else if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(Arc::new(WsTransport::connect(url).await?))
    } else {
        anyhow::bail!("transport url must start with http(s):// or ws(s)://: {url}")
    }
}

/// HTTP(S) transport. Stateless aside from a cached chain id.
pub struct HttpTransport {
    url: String,
    chain_id_cache: OnceCell<u64>,
}

impl HttpTransport {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            url: url.to_string(),
            chain_id_cache: OnceCell::new(),
        })
    }

    fn provider(&self) -> Result<impl Provider> {
        Ok(ProviderBuilder::new().on_http(self.url.parse()?))
    }
}

#[async_trait]
impl ChainTransport for HttpTransport {
    fn url(&self) -> &str {
        &self.url
    }

    async fn chain_id(&self) -> Result<u64> {
        if let Some(id) = self.chain_id_cache.get() {
            return Ok(*id);
        }
        let provider = self.provider()?;
        let id = provider
            .get_chain_id()
            .await
            .map_err(|e| TransportError::Request {
                endpoint: self.url.clone(),
                source: e.into(),
            })?;
        let _ = self.chain_id_cache.set(id);
        Ok(id)
    }

    async fn latest_block_number(&self) -> Result<u64> {
        let provider = self.provider()?;
        provider
            .get_block_number()
            .await
            .map_err(|e| {
                TransportError::Request {
                    endpoint: self.url.clone(),
                    source: e.into(),
                }
                .into()
            })
    }

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        address: Address,
        topics: Vec<B256>,
    ) -> Result<Vec<Log>> {
        let provider = self.provider()?;
        let filter = Filter::new()
            .address(address)
            .from_block(from)
            .to_block(to)
            .event_signature(topics);
        let logs = provider.get_logs(&filter).await.map_err(|e| {
            TransportError::Request {
                endpoint: self.url.clone(),
                source: e.into(),
            }
        })?;
        debug!(from, to, count = logs.len(), "fetched logs");
        Ok(logs)
    }

    async fn get_transaction_count(&self, addr: Address) -> Result<u64> {
        let provider = self.provider()?;
        provider
            .get_transaction_count(addr)
            .await
            .context("get_transaction_count failed")
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256> {
        let provider = self.provider()?;
        let pending = provider.send_raw_transaction(&raw).await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<Receipt> {
        let provider = self.provider()?;
        poll_for_receipt(&provider, tx_hash).await
    }

    async fn subscribe_logs(&self, _address: Address, _topics: Vec<B256>) -> Result<LogStream> {
        anyhow::bail!("HTTP transport does not support log subscription")
    }
}

/// WebSocket transport, for the live subscribe path.
pub struct WsTransport {
    url: String,
    chain_id_cache: OnceCell<u64>,
}

impl WsTransport {
    pub async fn connect(url: &str) -> Result<Self> {
        // Verify connectivity up front so startup fails fast on a bad URL.
        let provider = ProviderBuilder::new()
            .on_ws(WsConnect::new(url))
            .await
            .with_context(|| format!("failed to connect websocket transport to {url}"))?;
        let block = provider.get_block_number().await?;
        debug!(url, block, "websocket transport connected");
        Ok(Self {
            url: url.to_string(),
            chain_id_cache: OnceCell::new(),
        })
    }

    async fn provider(&self) -> Result<impl Provider> {
        ProviderBuilder::new()
            .on_ws(WsConnect::new(&self.url))
            .await
            .with_context(|| format!("failed to (re)connect websocket transport to {}", self.url))
    }
}

#[async_trait]
impl ChainTransport for WsTransport {
    fn url(&self) -> &str {
        &self.url
    }

    async fn chain_id(&self) -> Result<u64> {
        if let Some(id) = self.chain_id_cache.get() {
            return Ok(*id);
        }
        let provider = self.provider().await?;
        let id = provider.get_chain_id().await?;
        let _ = self.chain_id_cache.set(id);
        Ok(id)
    }

    async fn latest_block_number(&self) -> Result<u64> {
        let provider = self.provider().await?;
        Ok(provider.get_block_number().await?)
    }

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        address: Address,
        topics: Vec<B256>,
    ) -> Result<Vec<Log>> {
        let provider = self.provider().await?;
        let filter = Filter::new()
            .address(address)
            .from_block(from)
            .to_block(to)
            .event_signature(topics);
        Ok(provider.get_logs(&filter).await?)
    }

    async fn get_transaction_count(&self, addr: Address) -> Result<u64> {
        let provider = self.provider().await?;
        Ok(provider.get_transaction_count(addr).await?)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256> {
        let provider = self.provider().await?;
        let pending = provider.send_raw_transaction(&raw).await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<Receipt> {
        let provider = self.provider().await?;
        poll_for_receipt(&provider, tx_hash).await
    }

    async fn subscribe_logs(&self, address: Address, topics: Vec<B256>) -> Result<LogStream> {
        use futures::StreamExt;

        let provider = self.provider().await?;
        let filter = Filter::new().address(address).event_signature(topics);
        let subscription = provider.subscribe_logs(&filter).await?;
        warn!(url = %self.url, "log subscription active");
        Ok(Box::pin(subscription.into_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_transient_matches() {
        let err = crate::error::RpcError {
            code: -32000,
            message: "Client Error: 429 too many requests".to_string(),
        };
        assert!(err.is_known_transient());

        let err = crate::error::RpcError {
            code: -32000,
            message: "block not found after last accepted block".to_string(),
        };
        assert!(err.is_known_transient());

        let err = crate::error::RpcError {
            code: -32000,
            message: "insufficient funds".to_string(),
        };
        assert!(!err.is_known_transient());
    }

    #[test]
    fn connect_rejects_unknown_scheme() {
        let result = futures::executor::block_on(connect("ftp://example.com"));
        assert!(result.is_err());
    }
}
