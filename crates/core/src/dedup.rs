//! Local dedup set for request ids already claimed for fulfillment.
//!
//! A request id enters this set the moment a worker picks it up — not
//! when the fulfillment transaction lands — so two scanner passes racing
//! over overlapping block ranges never both dispatch a fulfillment for
//! the same request. Entries are never removed on failure: a request
//! that failed to fulfill is abandoned rather than retried, matching the
//! at-most-once semantics the coordinator itself enforces on-chain.

use alloy::primitives::U256;
use dashmap::DashSet;

/// Unbounded by default. An LRU eviction policy would bound memory for an
/// engine that runs for months, but no chain in scope here produces
/// enough VRF requests for that to matter within a single process
/// lifetime, so it's left unbounded until that changes.
pub struct FulfilledIds {
    seen: DashSet<U256>,
}

impl FulfilledIds {
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Returns `true` if this is the first time `request_id` has been
    /// claimed — the caller should proceed with fulfillment. Returns
    /// `false` if another caller already claimed it.
    pub fn claim(&self, request_id: U256) -> bool {
        self.seen.insert(request_id)
    }

    pub fn contains(&self, request_id: U256) -> bool {
        self.seen.contains(&request_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for FulfilledIds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exactly_once() {
        let ids = FulfilledIds::new();
        assert!(ids.claim(U256::from(1u64)));
        assert!(!ids.claim(U256::from(1u64)));
        assert!(ids.claim(U256::from(2u64)));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn claim_is_never_released_on_failure() {
        let ids = FulfilledIds::new();
        ids.claim(U256::from(7u64));
        // Simulate a failed fulfillment: nothing removes the id.
        assert!(ids.contains(U256::from(7u64)));
        assert!(!ids.claim(U256::from(7u64)));
    }
}
