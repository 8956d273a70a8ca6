//! Clock - discrete slots and unix time
//!
//! Freshness is scoped to a slot: a price refreshed in slot `n` may only be
//! used by operations executing in slot `n`. Maturity is measured in unix
//! seconds.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Source of the current slot and unix timestamp
pub trait Clock: Send + Sync {
    fn current_slot(&self) -> u64;

    fn unix_timestamp(&self) -> i64;
}

/// A clock driven by hand. Used by tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    slot: AtomicU64,
    timestamp: AtomicI64,
}

impl ManualClock {
    pub fn new(slot: u64, unix_timestamp: i64) -> Self {
        Self {
            slot: AtomicU64::new(slot),
            timestamp: AtomicI64::new(unix_timestamp),
        }
    }

    pub fn set_slot(&self, slot: u64) {
        self.slot.store(slot, Ordering::SeqCst);
    }

    /// Move to the next slot; returns the new slot
    pub fn advance_slot(&self) -> u64 {
        self.slot.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn set_timestamp(&self, unix_timestamp: i64) {
        self.timestamp.store(unix_timestamp, Ordering::SeqCst);
    }

    pub fn advance_seconds(&self, seconds: i64) {
        self.timestamp.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn current_slot(&self) -> u64 {
        self.slot.load(Ordering::SeqCst)
    }

    fn unix_timestamp(&self) -> i64 {
        self.timestamp.load(Ordering::SeqCst)
    }
}

/// Wall-clock time with fixed-length slots counted from a genesis instant
#[derive(Debug, Clone)]
pub struct SystemClock {
    genesis: DateTime<Utc>,
    slot_millis: u64,
}

impl SystemClock {
    pub fn new(genesis: DateTime<Utc>, slot_millis: u64) -> Self {
        Self {
            genesis,
            slot_millis: slot_millis.max(1),
        }
    }

    /// Slots counted from `genesis` at the given instant
    pub fn slot_at(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = now.signed_duration_since(self.genesis).num_milliseconds();
        if elapsed <= 0 {
            0
        } else {
            elapsed as u64 / self.slot_millis
        }
    }
}

impl Clock for SystemClock {
    fn current_slot(&self) -> u64 {
        self.slot_at(Utc::now())
    }

    fn unix_timestamp(&self) -> i64 {
        Utc::now().timestamp()
    }
}
