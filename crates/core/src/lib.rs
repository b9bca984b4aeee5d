//! VRF fulfillment engine core.
//!
//! This crate provides:
//! - Environment-driven configuration, chain registry, and key obfuscation
//! - Local dedup tracking for claimed request ids
//! - Alert and fulfillment webhook sinks
//! - Poll-based and WebSocket-subscribe scanners
//! - A bounded worker pool that signs, dispatches, and confirms
//!   fulfillment transactions
//! - The supervisor that wires it all together and runs the reconnect loop

pub mod config;
mod dedup;
mod error;
mod scanner_poll;
mod scanner_subscribe;
mod sinks;
mod supervisor;
mod worker_pool;

pub use dedup::FulfilledIds;
pub use error::FulfillmentError;
pub use scanner_poll::PollScanner;
pub use scanner_subscribe::SubscribeScanner;
pub use sinks::{AlertSink, FulfillmentSink};
pub use supervisor::{ScanMode, Supervisor};
pub use worker_pool::{WorkerPool, MAX_CONCURRENT_FULFILLMENTS};
