//! Error taxonomy for chain I/O, ABI decoding, and transaction dispatch.

use alloy::primitives::B256;

/// Failure talking to a chain RPC endpoint at the transport layer
/// (connection refused, timeout, 5xx, or a JSON-RPC error response).
/// Always retryable by the caller.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },
}

/// A JSON-RPC error response. `code`/`message` come straight from the
/// node. Some messages are known-transient (see `is_known_transient`)
/// and should be suppressed rather than alerted on.
#[derive(Debug, thiserror::Error)]
#[error("rpc error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Known-transient substrings observed in the wild (testnet flakiness, RPC
/// providers lagging behind their own head). An error whose message
/// contains one of these should be logged and retried rather than alerted
/// on.
const TRANSIENT_SUBSTRINGS: &[&str] = &["Client Error", "after last accepted block"];

/// Check an error message (or the full `{:#}` chain of an `anyhow::Error`)
/// for a known-transient substring. The transport layer folds JSON-RPC
/// error text straight into the error chain rather than always
/// constructing a typed `RpcError`, so callers match on the rendered
/// message instead of downcasting.
pub fn is_known_transient_message(message: &str) -> bool {
    TRANSIENT_SUBSTRINGS.iter().any(|needle| message.contains(needle))
}

impl RpcError {
    pub fn is_known_transient(&self) -> bool {
        is_known_transient_message(&self.message)
    }
}

/// A log matched `topics[0]` but failed ABI decode. Fatal to that log —
/// never silently dropped, per the decoder's strict-mode contract.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode log (tx {tx_hash:?}, topic0 matched): {reason}")]
pub struct DecodeError {
    pub tx_hash: Option<B256>,
    pub reason: String,
}

/// No endpoint in an `EndpointList` accepted a broadcast within the
/// dispatcher's deadline, and at least one explicitly errored.
#[derive(Debug, thiserror::Error)]
#[error("dispatch failed: no endpoint accepted the transaction ({first_error})")]
pub struct DispatchError {
    pub first_error: String,
}
