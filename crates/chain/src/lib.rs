//! Chain interaction layer for the VRF fulfillment engine.
//!
//! This crate provides:
//! - Coordinator ABI bindings and strict-mode log decoding (both v2 and
//!   v2.5 commitment layouts)
//! - A transport abstraction over HTTP and WebSocket RPC endpoints
//! - Gas strategy selection (legacy vs EIP-1559), chain-id-driven
//! - A local nonce ledger safe under concurrent in-flight fulfillments
//! - Transaction building, local signing, and multi-endpoint dispatch
//! - The chain I/O error taxonomy

mod contracts;
mod dispatcher;
mod error;
mod gas;
mod nonce;
mod signer;
mod transport;

pub use contracts::{
    decode_log, encode_fulfill_call, AbiVariant, DecodedLog, EventSignatures, FulfilledEvent,
    RequestCommitment, RequestEvent,
};
pub use dispatcher::{DispatchReport, MultiSendDispatcher, BROADCAST_TIMEOUT};
pub use error::{is_known_transient_message, DecodeError, DispatchError, RpcError, TransportError};
pub use gas::{
    create_gas_strategy, is_legacy_gas_chain, Eip1559GasStrategy, GasParams, GasStrategy,
    LegacyGasStrategy, LEGACY_GAS_CHAIN_IDS,
};
pub use nonce::{NonceLedger, REBASE_IDLE_SECONDS};
pub use signer::{TxBuilder, DEFAULT_FULFILL_GAS_LIMIT};
pub use transport::{connect, ChainTransport, HttpTransport, LogStream, Receipt, WsTransport};
