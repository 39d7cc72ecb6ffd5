//! # Filter Result Cache
//!
//! ## Description
//! Content-addressed TTL cache for filter outputs. One cache instance per
//! data kind keeps the stored type concrete: the chain carries a
//! `FilterCache<Vec<OptionContract>>` and a `FilterCache<Vec<VerticalSpread>>`
//! rather than one map of boxed values. Keys are the hex SHA-256 of the
//! serialized input slice, so identical books hit regardless of where they
//! came from.
//!
//! Stale entries are evicted lazily on lookup and swept every TTL/2 by a
//! detached thread that holds only a `Weak` reference and exits once the
//! cache is dropped.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, RwLock, Weak};
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
}

struct CacheState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<T> Default for CacheState<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }
}

/// Snapshot of cache accounting.
///
/// # Fields
/// * `hits` / `misses` - Lookup outcomes since creation or last clear
/// * `evictions` - Entries removed because their TTL elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from cache; 0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Thread-safe TTL cache keyed by input content.
pub struct FilterCache<T> {
    state: Arc<RwLock<CacheState<T>>>,
    ttl: Duration,
}

impl<T: Clone + Send + Sync + 'static> FilterCache<T> {
    /// Creates a cache and starts its background sweeper.
    pub fn new(ttl: Duration) -> Self {
        let state: Arc<RwLock<CacheState<T>>> = Arc::new(RwLock::new(CacheState::default()));
        spawn_sweeper(Arc::downgrade(&state), ttl);
        Self { state, ttl }
    }

    /// Looks up the cached output for `input`.
    ///
    /// A stale entry counts as a miss and is evicted on the spot. Inputs
    /// that fail to serialize bypass the cache entirely.
    pub fn get<K: Serialize + ?Sized>(&self, input: &K) -> Option<T> {
        let key = content_key(input)?;
        let Ok(mut state) = self.state.write() else { return None };

        match state.entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() <= self.ttl => {
                let value = entry.value.clone();
                state.hits += 1;
                metrics::counter!("drishti_filter_cache_hits_total").increment(1);
                Some(value)
            }
            Some(_) => {
                // Stale: evict on the spot and count a miss.
                if state.entries.remove(&key).is_some() {
                    state.evictions += 1;
                }
                state.misses += 1;
                metrics::counter!("drishti_filter_cache_misses_total").increment(1);
                None
            }
            None => {
                state.misses += 1;
                metrics::counter!("drishti_filter_cache_misses_total").increment(1);
                None
            }
        }
    }

    /// Stores the output computed for `input`.
    pub fn set<K: Serialize + ?Sized>(&self, input: &K, value: T) {
        let Some(key) = content_key(input) else { return };
        if let Ok(mut state) = self.state.write() {
            state.entries.insert(
                key,
                CacheEntry {
                    value,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            state.entries.clear();
            state.hits = 0;
            state.misses = 0;
            state.evictions = 0;
        }
    }

    pub fn stats(&self) -> CacheStats {
        match self.state.read() {
            Ok(state) => CacheStats {
                hits: state.hits,
                misses: state.misses,
                evictions: state.evictions,
            },
            Err(_) => CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hex SHA-256 of the serialized input; `None` when serialization fails.
fn content_key<K: Serialize + ?Sized>(input: &K) -> Option<String> {
    let bytes = serde_json::to_vec(input).ok()?;
    let digest = Sha256::digest(&bytes);
    let mut key = String::with_capacity(64);
    for byte in digest {
        let _ = write!(key, "{byte:02x}");
    }
    Some(key)
}

/// Sweeps expired entries every TTL/2 until the cache is dropped.
fn spawn_sweeper<T: Send + Sync + 'static>(state: Weak<RwLock<CacheState<T>>>, ttl: Duration) {
    let interval = (ttl / 2).max(Duration::from_millis(1));
    std::thread::spawn(move || loop {
        std::thread::sleep(interval);
        let Some(state) = state.upgrade() else { return };
        if let Ok(mut state) = state.write() {
            let before = state.entries.len();
            state.entries.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
            let swept = before - state.entries.len();
            state.evictions += swept as u64;
            if swept > 0 {
                debug!(swept, "cache sweep evicted expired entries");
            }
        };
    });
}
