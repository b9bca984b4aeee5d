//! Transaction building and local signing for fulfillment calls.
//!
//! Signing never touches the network: the nonce comes from the local
//! [`NonceLedger`], gas parameters come from a cached [`GasStrategy`], and
//! the chain id is fixed at construction. The only RPC call in the whole
//! path is the dispatcher's broadcast.

use std::sync::Arc;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Result;
use tracing::debug;

use crate::gas::{GasParams, GasStrategy};
use crate::nonce::NonceLedger;

/// Gas limit applied to every fulfillment call. Coordinator callbacks are
/// bounded by `callbackGasLimit` on-chain; this only needs to cover the
/// coordinator's own bookkeeping plus the callback, so a fixed generous
/// limit avoids an estimation round trip per call.
pub const DEFAULT_FULFILL_GAS_LIMIT: u64 = 1_500_000;

/// Builds and signs `fulfillRandomWords` transactions for one signing
/// address on one chain.
pub struct TxBuilder {
    wallet: EthereumWallet,
    pub address: Address,
    chain_id: u64,
    coordinator: Address,
    nonce_ledger: NonceLedger,
    gas_strategy: Arc<dyn GasStrategy>,
}

impl TxBuilder {
    pub fn new(
        private_key: &str,
        chain_id: u64,
        coordinator: Address,
        starting_nonce: u64,
        gas_strategy: Arc<dyn GasStrategy>,
    ) -> Result<Self> {
        let key_str = private_key.trim_start_matches("0x");
        let signer: PrivateKeySigner = key_str.parse()?;
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        Ok(Self {
            wallet,
            address,
            chain_id,
            coordinator,
            nonce_ledger: NonceLedger::new(starting_nonce),
            gas_strategy,
        })
    }

    pub fn nonce_ledger(&self) -> &NonceLedger {
        &self.nonce_ledger
    }

    /// Build and sign a `fulfillRandomWords` call, returning the raw signed
    /// transaction bytes ready for broadcast. Draws the next nonce from the
    /// ledger as a side effect. Callers must call `nonce_ledger().acquire()`
    /// when the job is accepted and `nonce_ledger().release()` once it's no
    /// longer in flight, independent of whether this call ever runs.
    pub async fn build_fulfill_tx(&self, calldata: Bytes, gas_params: &GasParams) -> Result<Bytes> {
        let nonce = self.nonce_ledger.take_next();

        let mut tx = TransactionRequest::default()
            .with_to(self.coordinator)
            .with_input(calldata)
            .with_value(U256::ZERO)
            .with_nonce(nonce)
            .with_gas_limit(DEFAULT_FULFILL_GAS_LIMIT)
            .with_chain_id(self.chain_id);

        self.gas_strategy.apply_gas(&mut tx, gas_params);

        debug!(
            nonce,
            chain_id = self.chain_id,
            strategy = self.gas_strategy.strategy_name(),
            "signing fulfillment transaction"
        );

        let signed = <TransactionRequest as alloy::network::TransactionBuilder<
            alloy::network::Ethereum,
        >>::build(tx, &self.wallet)
        .await?;

        Ok(signed.encoded_2718().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::LegacyGasStrategy;

    fn test_builder() -> TxBuilder {
        let strategy: Arc<dyn GasStrategy> =
            Arc::new(LegacyGasStrategy::new(1_000_000_000, 10_000_000_000));
        TxBuilder::new(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            5000,
            Address::repeat_byte(0x01),
            0,
            strategy,
        )
        .unwrap()
    }

    #[test]
    fn builder_derives_address_from_key() {
        let builder = test_builder();
        assert_eq!(
            format!("{:?}", builder.address).to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[tokio::test]
    async fn build_fulfill_tx_draws_a_fresh_nonce_each_call() {
        let builder = test_builder();
        let params = GasParams::Legacy {
            gas_price: 1_000_000_000,
        };
        let raw_a = builder
            .build_fulfill_tx(Bytes::from_static(&[0xde, 0xad]), &params)
            .await
            .unwrap();
        let raw_b = builder
            .build_fulfill_tx(Bytes::from_static(&[0xde, 0xad]), &params)
            .await
            .unwrap();
        assert_ne!(raw_a, raw_b);
    }
}
