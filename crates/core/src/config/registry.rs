//! Immutable chain registry: RPC endpoint lists and max gas per chain.
//!
//! Replaces the module-level dict literals of the original service with a
//! typed, queryable structure. Endpoint lists feed the multi-send
//! dispatcher directly; an explicit RPC override (env var) is always
//! promoted to the front of its list so it's tried first without being
//! the only endpoint raced.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// One chain's static configuration: its RPC fan-out list and the max
/// gas price (in gwei) the engine will ever sign a transaction with.
#[derive(Debug, Clone)]
pub struct ChainEntry {
    pub rpc_endpoints: Vec<&'static str>,
    pub max_gas_price_gwei: f64,
}

static REGISTRY: Lazy<HashMap<u64, ChainEntry>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        8453,
        ChainEntry {
            rpc_endpoints: vec![
                "https://mainnet.base.org",
                "https://base-mainnet.public.blastapi.io",
                "https://base.publicnode.com",
            ],
            max_gas_price_gwei: 2.0,
        },
    );
    m.insert(
        84531,
        ChainEntry {
            rpc_endpoints: vec![
                "https://goerli.base.org",
                "https://base-goerli.publicnode.com",
                "https://base-goerli.blockpi.network/v1/rpc/public",
            ],
            max_gas_price_gwei: 2.0,
        },
    );
    m.insert(
        43114,
        ChainEntry {
            rpc_endpoints: vec![
                "https://api.avax.network/ext/bc/C/rpc",
                "https://rpc.ankr.com/avalanche",
                "https://avalanche.blockpi.network/v1/rpc/public",
                "https://avalanche-c-chain.publicnode.com",
                "https://ava-mainnet.public.blastapi.io/ext/bc/C/rpc",
                "https://1rpc.io/avax/c",
            ],
            max_gas_price_gwei: 100.0,
        },
    );
    m.insert(
        43113,
        ChainEntry {
            rpc_endpoints: vec![
                "https://api.avax-test.network/ext/bc/C/rpc",
                "https://rpc.ankr.com/avalanche_fuji",
                "https://avalanche-fuji.blockpi.network/v1/rpc/public",
            ],
            max_gas_price_gwei: 40.0,
        },
    );
    m.insert(
        5000,
        ChainEntry {
            rpc_endpoints: vec![
                "https://rpc.mantle.xyz",
                "https://rpc.ankr.com/mantle",
                "https://mantle-mainnet.public.blastapi.io",
            ],
            max_gas_price_gwei: 0.06,
        },
    );
    m.insert(
        336,
        ChainEntry {
            rpc_endpoints: vec!["https://mevm.devnet.m1.movementlabs.xyz/v1"],
            max_gas_price_gwei: 1.0,
        },
    );
    m
});

/// Look up a chain's static entry. Unknown chains must be configured via
/// explicit env vars instead; this registry covers the well-known set.
pub fn lookup(chain_id: u64) -> Option<&'static ChainEntry> {
    REGISTRY.get(&chain_id)
}

/// Endpoint list for a chain, with `override_url` (if any) promoted to
/// the front. If the override isn't already in the list it's prepended;
/// if the chain is unknown the override becomes the sole endpoint.
pub fn rpc_endpoints(chain_id: u64, override_url: Option<&str>) -> Vec<String> {
    let mut endpoints: Vec<String> = lookup(chain_id)
        .map(|entry| entry.rpc_endpoints.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default();

    if let Some(url) = override_url {
        endpoints.retain(|e| e != url);
        endpoints.insert(0, url.to_string());
    }

    endpoints
}

pub fn max_gas_price_gwei(chain_id: u64) -> Option<f64> {
    lookup(chain_id).map(|entry| entry.max_gas_price_gwei)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_chain_returns_entry() {
        let entry = lookup(5000).unwrap();
        assert_eq!(entry.max_gas_price_gwei, 0.06);
        assert!(!entry.rpc_endpoints.is_empty());
    }

    #[test]
    fn unknown_chain_is_none() {
        assert!(lookup(999_999).is_none());
    }

    #[test]
    fn override_promoted_to_front_without_duplication() {
        let endpoints = rpc_endpoints(8453, Some("https://base.publicnode.com"));
        assert_eq!(endpoints[0], "https://base.publicnode.com");
        assert_eq!(
            endpoints.iter().filter(|e| *e == "https://base.publicnode.com").count(),
            1
        );
    }

    #[test]
    fn override_on_unknown_chain_is_sole_endpoint() {
        let endpoints = rpc_endpoints(1, Some("https://my-custom-rpc.example"));
        assert_eq!(endpoints, vec!["https://my-custom-rpc.example".to_string()]);
    }
}
