//! Gas strategy abstraction for multi-chain support.
//!
//! Selection is chain-id-driven rather than config-string-driven: a small
//! set of chains are known to reject EIP-1559 transactions and need the
//! legacy `gasPrice` field instead. Everything else gets EIP-1559.

mod eip1559;
mod legacy;

pub use eip1559::Eip1559GasStrategy;
pub use legacy::LegacyGasStrategy;

use alloy::rpc::types::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// Gas parameters fetched from the chain.
#[derive(Debug, Clone)]
pub enum GasParams {
    /// Legacy gas pricing (pre-EIP-1559).
    Legacy {
        /// Gas price in wei.
        gas_price: u128,
    },
    /// EIP-1559 gas pricing.
    Eip1559 {
        /// Maximum fee per gas in wei.
        max_fee_per_gas: u128,
        /// Maximum priority fee per gas in wei.
        max_priority_fee_per_gas: u128,
    },
}

impl GasParams {
    /// Get the effective gas price for estimation purposes.
    pub fn effective_gas_price(&self) -> u128 {
        match self {
            GasParams::Legacy { gas_price } => *gas_price,
            GasParams::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

/// Trait for gas pricing strategies.
///
/// Implementations of this trait handle fetching gas prices from the chain
/// and applying them to transaction requests.
#[async_trait]
pub trait GasStrategy: Send + Sync + Debug {
    /// Fetch current gas parameters from the given RPC URL.
    ///
    /// This method should query the chain for current gas prices.
    /// The implementation may cache results to reduce RPC calls.
    async fn fetch_params(&self, rpc_url: &str) -> Result<GasParams>;

    /// Apply gas parameters to a transaction request.
    ///
    /// This modifies the transaction request in-place, adding the appropriate
    /// gas-related fields based on the strategy type.
    fn apply_gas(&self, tx: &mut TransactionRequest, params: &GasParams);

    /// Get the strategy name for logging/debugging.
    fn strategy_name(&self) -> &'static str;

    /// Check if this strategy supports the given chain ID.
    ///
    /// By default, returns true. Override for chain-specific strategies.
    fn supports_chain(&self, _chain_id: u64) -> bool {
        true
    }
}

/// Chain ids known to reject EIP-1559 transactions (`maxFeePerGas` rejected
/// by the node, or simply never rolled it out). 5000 is Mantle mainnet.
pub const LEGACY_GAS_CHAIN_IDS: &[u64] = &[5000];

pub fn is_legacy_gas_chain(chain_id: u64) -> bool {
    LEGACY_GAS_CHAIN_IDS.contains(&chain_id)
}

/// Build the gas strategy for a chain, given its configured max gas price.
/// `default_gas_price_gwei` seeds the legacy strategy's starting cache
/// before the first `fetch_params` call. For EIP-1559 chains, both fee
/// components are fixed: `maxFeePerGas` is `max_gas_price_gwei` and the
/// priority tip is `priority_fee_gwei`.
pub fn create_gas_strategy(
    chain_id: u64,
    default_gas_price_gwei: f64,
    max_gas_price_gwei: f64,
    priority_fee_gwei: f64,
) -> Box<dyn GasStrategy> {
    if is_legacy_gas_chain(chain_id) {
        Box::new(LegacyGasStrategy::new(
            (default_gas_price_gwei * 1e9) as u128,
            (max_gas_price_gwei * 1e9) as u128,
        ))
    } else {
        Box::new(Eip1559GasStrategy::new(
            (priority_fee_gwei * 1e9) as u128,
            (max_gas_price_gwei * 1e9) as u128,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_params_effective_price() {
        let legacy = GasParams::Legacy {
            gas_price: 1_000_000_000,
        };
        assert_eq!(legacy.effective_gas_price(), 1_000_000_000);

        let eip1559 = GasParams::Eip1559 {
            max_fee_per_gas: 50_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
        };
        assert_eq!(eip1559.effective_gas_price(), 50_000_000_000);
    }

    #[test]
    fn test_create_gas_strategy_chain_id_driven() {
        // 5000 (Mantle) is the known legacy-gas chain.
        let legacy = create_gas_strategy(5000, 1.0, 10.0, 2.0);
        assert_eq!(legacy.strategy_name(), "Legacy");

        // Everything else gets EIP-1559.
        let eip1559 = create_gas_strategy(1, 30.0, 500.0, 2.0);
        assert_eq!(eip1559.strategy_name(), "EIP-1559");
    }

    #[test]
    fn test_is_legacy_gas_chain() {
        assert!(is_legacy_gas_chain(5000));
        assert!(!is_legacy_gas_chain(1));
        assert!(!is_legacy_gas_chain(137));
    }
}
