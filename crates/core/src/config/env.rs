//! Environment-variable-driven engine configuration.
//!
//! `.env` loading itself happens at the binary entry point via `dotenvy`,
//! per the `--dotenv <path>` flag; by the time `EngineConfig::from_env` runs
//! the process environment already reflects any dotfile plus real env var
//! overrides on top of it.

use alloy::primitives::Address;
use anyhow::{Context, Result};

use super::keys::deobfuscate;
use super::registry;
use vrf_chain::AbiVariant;

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("missing required env var {name}"))
}

fn env_var_opt(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Fully resolved runtime configuration for one fulfiller process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub chain_id: u64,
    pub vrf_address: Address,
    pub private_key: String,
    /// Blocks a backup fulfiller waits before acting on a request, so the
    /// primary gets first crack at it. Zero for a primary fulfiller.
    pub delay_blocks: u64,
    pub alert_hook_url: Option<String>,
    pub fulfillment_hook_url: Option<String>,
    pub abi_variant: AbiVariant,
    pub rpc_endpoints: Vec<String>,
    pub max_gas_price_gwei: f64,
    pub default_gas_price_gwei: f64,
    pub priority_fee_gwei: f64,
    /// Cold-start catch-up mode: scan 10,000 blocks back instead of the
    /// default 1,900 on first bootstrap.
    pub catchup_mode: bool,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let chain_id: u64 = env_var("CHAIN_ID")?
            .parse()
            .context("CHAIN_ID must be a positive integer")?;

        let vrf_address: Address = env_var("VRF_ADDRESS")?
            .parse()
            .context("VRF_ADDRESS must be a valid address")?;

        let obfuscated_key = env_var("OBFUSCATED_KEY")?;
        let private_key = deobfuscate(&obfuscated_key);
        // Fail fast: make sure the deobfuscated value actually parses as a key.
        private_key
            .trim_start_matches("0x")
            .parse::<alloy::signers::local::PrivateKeySigner>()
            .context("OBFUSCATED_KEY did not deobfuscate to a valid private key")?;

        let delay_blocks: u64 = env_var_opt("DELAY_BLOCKS")
            .map(|v| v.parse())
            .transpose()
            .context("DELAY_BLOCKS must be an integer")?
            .unwrap_or(0);

        let abi_variant = if env_var_opt("USE_VRF_V25").as_deref() == Some("1") {
            AbiVariant::V25
        } else {
            AbiVariant::V2
        };

        let rpc_override = env_var_opt("RPC_ENDPOINT");
        let rpc_endpoints = registry::rpc_endpoints(chain_id, rpc_override.as_deref());
        if rpc_endpoints.is_empty() {
            anyhow::bail!(
                "no RPC endpoints known for chain {chain_id}; set RPC_ENDPOINT explicitly"
            );
        }

        let max_gas_price_gwei = env_var_opt("MAX_GAS_PRICE_GWEI")
            .map(|v| v.parse())
            .transpose()
            .context("MAX_GAS_PRICE_GWEI must be a number")?
            .or_else(|| registry::max_gas_price_gwei(chain_id))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no max gas price known for chain {chain_id}; set MAX_GAS_PRICE_GWEI"
                )
            })?;

        let default_gas_price_gwei = env_var_opt("DEFAULT_GAS_PRICE_GWEI")
            .map(|v| v.parse())
            .transpose()
            .context("DEFAULT_GAS_PRICE_GWEI must be a number")?
            .unwrap_or(max_gas_price_gwei / 2.0);

        let priority_fee_gwei = env_var_opt("PRIORITY_FEE_GWEI")
            .map(|v| v.parse())
            .transpose()
            .context("PRIORITY_FEE_GWEI must be a number")?
            .unwrap_or(0.001);

        let catchup_mode = env_var_opt("COLD_START").as_deref() == Some("catchup");

        Ok(Self {
            chain_id,
            vrf_address,
            private_key,
            delay_blocks,
            alert_hook_url: env_var_opt("ALERT_HOOK_URL"),
            fulfillment_hook_url: env_var_opt("FULFILLMENT_HOOK_URL"),
            abi_variant,
            rpc_endpoints,
            max_gas_price_gwei,
            default_gas_price_gwei,
            priority_fee_gwei,
            catchup_mode,
        })
    }

    pub fn is_backup_fulfiller(&self) -> bool {
        self.delay_blocks > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env var tests share process-global state; serialize them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "CHAIN_ID",
            "VRF_ADDRESS",
            "OBFUSCATED_KEY",
            "DELAY_BLOCKS",
            "USE_VRF_V25",
            "RPC_ENDPOINT",
            "MAX_GAS_PRICE_GWEI",
            "DEFAULT_GAS_PRICE_GWEI",
            "PRIORITY_FEE_GWEI",
            "COLD_START",
            "ALERT_HOOK_URL",
            "FULFILLMENT_HOOK_URL",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn missing_chain_id_errors() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let result = EngineConfig::from_env();
        assert!(result.is_err());
    }

    #[test]
    fn resolves_defaults_from_registry() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("CHAIN_ID", "5000");
        std::env::set_var("VRF_ADDRESS", format!("0x{}", "11".repeat(20)));
        let obfuscated = super::super::keys::obfuscate(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff8",
        );
        std::env::set_var("OBFUSCATED_KEY", obfuscated);

        let config = EngineConfig::from_env().expect("config should resolve");
        assert_eq!(config.chain_id, 5000);
        assert_eq!(config.max_gas_price_gwei, 0.06);
        assert!(!config.is_backup_fulfiller());
        assert_eq!(config.abi_variant, vrf_chain::AbiVariant::V2);
        clear_env();
    }
}
