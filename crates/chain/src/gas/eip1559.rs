//! EIP-1559 gas pricing strategy.
//!
//! Both fee components are fixed from chain configuration rather than
//! sampled from the chain: `maxFeePerGas` is the configured max gas price
//! for the chain, `maxPriorityFeePerGas` is a fixed, minimal tip. No RPC
//! round trip is needed to price a transaction.

use super::{GasParams, GasStrategy};
use alloy::network::TransactionBuilder;
use alloy::rpc::types::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;

/// EIP-1559 gas pricing strategy.
#[derive(Debug)]
pub struct Eip1559GasStrategy {
    /// Priority fee (tip) in wei, applied to every transaction.
    priority_fee_per_gas: u128,
    /// Max fee per gas in wei, applied to every transaction.
    max_fee_per_gas: u128,
}

impl Eip1559GasStrategy {
    /// Create a new EIP-1559 gas strategy.
    ///
    /// # Arguments
    /// * `priority_fee_per_gas` - Fixed priority fee (tip) in wei
    /// * `max_fee_per_gas` - Fixed maximum fee per gas in wei
    pub fn new(priority_fee_per_gas: u128, max_fee_per_gas: u128) -> Self {
        Self {
            priority_fee_per_gas,
            max_fee_per_gas,
        }
    }
}

#[async_trait]
impl GasStrategy for Eip1559GasStrategy {
    async fn fetch_params(&self, _rpc_url: &str) -> Result<GasParams> {
        Ok(GasParams::Eip1559 {
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.priority_fee_per_gas,
        })
    }

    fn apply_gas(&self, tx: &mut TransactionRequest, params: &GasParams) {
        match params {
            GasParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                tx.set_max_fee_per_gas(*max_fee_per_gas);
                tx.set_max_priority_fee_per_gas(*max_priority_fee_per_gas);
            }
            GasParams::Legacy { gas_price } => {
                // Fallback: treat gas_price as both max_fee and priority_fee.
                tx.set_max_fee_per_gas(*gas_price);
                tx.set_max_priority_fee_per_gas(self.priority_fee_per_gas.min(*gas_price));
            }
        }
    }

    fn strategy_name(&self) -> &'static str {
        "EIP-1559"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[tokio::test]
    async fn fetch_params_returns_the_fixed_fees_unchanged() {
        let strategy = Eip1559GasStrategy::new(1_000_000, 50_000_000_000);
        let params = strategy.fetch_params("http://unused").await.unwrap();
        match params {
            GasParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                assert_eq!(max_fee_per_gas, 50_000_000_000);
                assert_eq!(max_priority_fee_per_gas, 1_000_000);
            }
            GasParams::Legacy { .. } => panic!("expected eip1559 params"),
        }
    }

    #[test]
    fn apply_gas_sets_both_fee_fields() {
        let strategy = Eip1559GasStrategy::new(1_000_000, 50_000_000_000);
        let mut tx = TransactionRequest::default().with_to(Address::ZERO);

        let params = GasParams::Eip1559 {
            max_fee_per_gas: 50_000_000_000,
            max_priority_fee_per_gas: 1_000_000,
        };

        strategy.apply_gas(&mut tx, &params);
        assert_eq!(tx.max_fee_per_gas, Some(50_000_000_000));
        assert_eq!(tx.max_priority_fee_per_gas, Some(1_000_000));
    }

    #[test]
    fn apply_gas_caps_legacy_fallback_priority_at_gas_price() {
        let strategy = Eip1559GasStrategy::new(10_000_000_000, 50_000_000_000);
        let mut tx = TransactionRequest::default().with_to(Address::ZERO);

        let params = GasParams::Legacy {
            gas_price: 1_000_000_000,
        };

        strategy.apply_gas(&mut tx, &params);
        assert_eq!(tx.max_fee_per_gas, Some(1_000_000_000));
        assert_eq!(tx.max_priority_fee_per_gas, Some(1_000_000_000));
    }
}
