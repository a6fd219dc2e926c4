//! # Series Cache
//!
//! Per-series bookkeeping between fetches: when a specifier was last
//! successfully fetched, and which specifier (at most one per identifier)
//! is the live-tracking series whose re-fetch is triggered by push events.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default, Clone)]
struct SeriesEntry {
    last_fetch_ms: Option<i64>,
}

#[derive(Debug, Default)]
struct CacheState {
    // specifier key -> entry
    entries: HashMap<String, SeriesEntry>,
    // identifier -> specifier key of its live-tracking series
    live: HashMap<String, String>,
}

/// Shared series bookkeeping table. All state is mutated under one lock
/// held only across non-await sections.
#[derive(Debug, Default)]
pub struct SeriesCache {
    state: Mutex<CacheState>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent entry creation; the fetch time starts unset.
    pub fn lookup_or_create(&self, key: &str) {
        let mut state = self.state.lock().expect("series cache lock poisoned");
        state.entries.entry(key.to_string()).or_default();
    }

    /// Records a successful fetch. Monotonic: a call with an earlier time
    /// than the stored one is a logged no-op.
    pub fn mark_fetched(&self, key: &str, now_ms: i64) {
        let mut state = self.state.lock().expect("series cache lock poisoned");
        let entry = state.entries.entry(key.to_string()).or_default();
        match entry.last_fetch_ms {
            Some(stored) if stored > now_ms => {
                log::warn!(
                    "ignoring out-of-order fetch stamp for '{}': {} < stored {}",
                    key,
                    now_ms,
                    stored
                );
            }
            _ => entry.last_fetch_ms = Some(now_ms),
        }
    }

    /// True when the entry is missing, never fetched, or last fetched more
    /// than `threshold_secs` before `now_ms`.
    pub fn is_stale(&self, key: &str, threshold_secs: u64, now_ms: i64) -> bool {
        let state = self.state.lock().expect("series cache lock poisoned");
        match state.entries.get(key).and_then(|e| e.last_fetch_ms) {
            Some(fetched) => now_ms - fetched > (threshold_secs as i64) * 1_000,
            None => true,
        }
    }

    /// Flags `key` as the live-tracking series for `item`. At most one series
    /// per identifier holds the flag; a second assignment clears the first
    /// (last writer wins) with a warning.
    pub fn set_live(&self, item: &str, key: &str) {
        let mut state = self.state.lock().expect("series cache lock poisoned");
        if let Some(previous) = state.live.insert(item.to_string(), key.to_string()) {
            if previous != key {
                log::warn!(
                    "live-tracking series for '{}' replaced: '{}' -> '{}'",
                    item,
                    previous,
                    key
                );
            }
        }
    }

    /// The specifier key currently live-tracking `item`, if any.
    pub fn live_spec_for(&self, item: &str) -> Option<String> {
        let state = self.state.lock().expect("series cache lock poisoned");
        state.live.get(item).cloned()
    }

    /// Stored fetch time for a specifier key (unset until the first success).
    pub fn last_fetch(&self, key: &str) -> Option<i64> {
        let state = self.state.lock().expect("series cache lock poisoned");
        state.entries.get(key).and_then(|e| e.last_fetch_ms)
    }

    /// Number of known series entries.
    pub fn len(&self) -> usize {
        let state = self.state.lock().expect("series cache lock poisoned");
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
