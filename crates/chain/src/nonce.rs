//! Local nonce ledger.
//!
//! Every in-flight fulfillment needs a unique, monotonically increasing
//! nonce before its RPC race even starts, so nonces cannot be sourced from
//! `eth_getTransactionCount` per transaction — two workers racing that call
//! would get the same answer. Instead the ledger hands out nonces from a
//! local counter and only ever re-syncs against the chain when it's
//! provably safe: no fulfillment is outstanding, and none has completed
//! recently enough that its receipt might still be in flight.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Minimum idle window, in seconds, before a rebase is allowed even when
/// no fulfillment is outstanding. Guards against a nonce bump landing
/// between "worker decremented outstanding" and "receipt actually final".
pub const REBASE_IDLE_SECONDS: u64 = 4;

/// Tracks the next nonce to hand out for one signing address, plus enough
/// bookkeeping to know when it's safe to resync from the chain.
pub struct NonceLedger {
    next: Mutex<u64>,
    outstanding: AtomicI64,
    last_action: AtomicU64,
    started_at: Instant,
}

impl NonceLedger {
    pub fn new(starting_nonce: u64) -> Self {
        Self {
            next: Mutex::new(starting_nonce),
            outstanding: AtomicI64::new(0),
            last_action: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Mark one fulfillment as outstanding. Called the moment a job is
    /// accepted, before any of its RPC calls run, so `outstanding` and the
    /// matching `release()` are balanced regardless of which step the job
    /// ultimately fails at.
    pub fn acquire(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.touch();
    }

    /// Reserve the next nonce. Linearizable: callers never observe the
    /// same value twice. Does not touch `outstanding` — call `acquire()`
    /// when the job is accepted, not when its nonce happens to be drawn.
    pub fn take_next(&self) -> u64 {
        let mut guard = self.next.lock();
        let nonce = *guard;
        *guard += 1;
        self.touch();
        nonce
    }

    /// Called when a fulfillment is no longer in flight (landed, or given
    /// up on), exactly once per prior `acquire()`. Never rolls the nonce
    /// counter back — a nonce that was reserved and broadcast stays
    /// consumed even if the submission ultimately failed, matching how the
    /// chain itself treats a dropped-but-signed transaction.
    pub fn release(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.touch();
    }

    pub fn outstanding(&self) -> i64 {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// True when no fulfillment is outstanding and the last ledger action
    /// was at least `REBASE_IDLE_SECONDS` ago. Callers should only invoke
    /// `rebase` when this holds.
    pub fn is_idle(&self) -> bool {
        self.outstanding() <= 0 && self.idle_seconds() >= REBASE_IDLE_SECONDS
    }

    fn idle_seconds(&self) -> u64 {
        let last = self.last_action.load(Ordering::SeqCst);
        if last == 0 {
            return self.started_at.elapsed().as_secs();
        }
        now_unix().saturating_sub(last)
    }

    /// Overwrite the counter with a chain-reported transaction count.
    /// Callers are responsible for only calling this when `is_idle()`.
    pub fn rebase(&self, chain_tx_count: u64) {
        let mut guard = self.next.lock();
        *guard = chain_tx_count;
    }

    fn touch(&self) {
        self.last_action.store(now_unix(), Ordering::SeqCst);
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_next_is_monotonic_and_never_repeats() {
        let ledger = NonceLedger::new(10);
        assert_eq!(ledger.take_next(), 10);
        assert_eq!(ledger.take_next(), 11);
        assert_eq!(ledger.take_next(), 12);
    }

    #[test]
    fn acquire_and_release_are_independent_of_take_next() {
        let ledger = NonceLedger::new(0);
        ledger.acquire();
        ledger.acquire();
        assert_eq!(ledger.outstanding(), 2);
        // A job can fail before ever drawing a nonce.
        ledger.release();
        assert_eq!(ledger.outstanding(), 1);
        ledger.take_next();
        ledger.release();
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn release_never_rolls_back_the_counter() {
        let ledger = NonceLedger::new(0);
        ledger.acquire();
        let a = ledger.take_next();
        ledger.acquire();
        let b = ledger.take_next();
        ledger.release();
        ledger.acquire();
        let c = ledger.take_next();
        assert_eq!([a, b, c], [0, 1, 2]);
    }

    #[test]
    fn is_idle_false_while_outstanding() {
        let ledger = NonceLedger::new(0);
        ledger.acquire();
        ledger.take_next();
        assert!(!ledger.is_idle());
        ledger.release();
        // just released: idle window hasn't elapsed yet.
        assert!(!ledger.is_idle());
    }

    #[test]
    fn rebase_overwrites_counter() {
        let ledger = NonceLedger::new(0);
        ledger.acquire();
        ledger.take_next();
        ledger.rebase(50);
        assert_eq!(ledger.take_next(), 50);
    }
}
