//! Engine-level error taxonomy, layered on top of `vrf-chain`'s transport
//! and decode errors.

#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    #[error("chain transport error: {0}")]
    Transport(#[from] anyhow::Error),

    #[error("failed to decode event log: {0}")]
    Decode(#[from] vrf_chain::DecodeError),

    #[error("dispatch failed: {0}")]
    Dispatch(#[from] vrf_chain::DispatchError),

    #[error("fulfillment reverted for request {request_id}")]
    Reverted { request_id: String },
}
