//! # Filter Chain Orchestrator
//!
//! ## Description
//! Runs the registered filters over contracts, spreads, and the combined
//! populations, recording per-filter execution statistics in an injected
//! [`StatsRegistry`]. Contract filtering runs sequentially (order-preserving
//! fold) or in parallel, where every filter sees the full input and the
//! survivor sets are intersected by full contract identity — symbol alone is
//! not an identity, so two strikes on the same underlying never collapse.
//!
//! The registry is an `Arc` shared with whoever built the chain; there is
//! no process-global state, and dropping the chain drops its accounting.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use drishti_models::{ContractKey, OptionContract, VerticalSpread};
use tracing::debug;

use crate::cache::FilterCache;
use crate::config::{CombinedFilter, ContractFilter, FilterConfig, FilterError, SpreadFilter};

/// Default TTL for chain-attached result caches.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Execution accounting for one filter.
///
/// # Fields
/// * `execution_count` - Times the filter ran
/// * `items_processed` - Total items seen across runs
/// * `items_filtered` - Total items removed across runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterStats {
    pub execution_count: u64,
    pub total_duration: Duration,
    pub average_duration: Duration,
    pub items_processed: u64,
    pub items_filtered: u64,
    pub last_execution: Option<DateTime<Utc>>,
}

/// Shared per-filter statistics store.
///
/// Injected into the chain at build time and shared as an `Arc`, so callers
/// inspect execution accounting without reaching into the chain.
#[derive(Default)]
pub struct StatsRegistry {
    stats: RwLock<HashMap<String, FilterStats>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one filter run. Also emits to the metrics facade.
    pub fn record(&self, filter: &'static str, items_in: usize, items_out: usize, duration: Duration) {
        if let Ok(mut stats) = self.stats.write() {
            let entry = stats.entry(filter.to_string()).or_default();
            entry.execution_count += 1;
            entry.total_duration += duration;
            entry.average_duration = entry.total_duration / entry.execution_count as u32;
            entry.items_processed += items_in as u64;
            entry.items_filtered += items_in.saturating_sub(items_out) as u64;
            entry.last_execution = Some(Utc::now());
        }

        metrics::histogram!("drishti_filter_execution_seconds", "filter" => filter)
            .record(duration.as_secs_f64());
        metrics::counter!("drishti_filter_items_processed_total", "filter" => filter)
            .increment(items_in as u64);
        metrics::counter!("drishti_filter_items_removed_total", "filter" => filter)
            .increment(items_in.saturating_sub(items_out) as u64);
    }

    /// Registers a filter so it shows up with zeroed stats before first run.
    pub fn register(&self, filter: &'static str) {
        if let Ok(mut stats) = self.stats.write() {
            stats.entry(filter.to_string()).or_default();
        }
    }

    pub fn get(&self, filter: &str) -> Option<FilterStats> {
        self.stats.read().ok()?.get(filter).cloned()
    }

    /// Snapshot copy of every filter's stats.
    pub fn snapshot(&self) -> HashMap<String, FilterStats> {
        self.stats.read().map(|s| s.clone()).unwrap_or_default()
    }
}

/// Orchestrates contract, spread, and combined filters.
pub struct FilterChain {
    contract_filters: Vec<Arc<dyn ContractFilter>>,
    spread_filters: Vec<Arc<dyn SpreadFilter>>,
    combined_filters: Vec<Arc<dyn CombinedFilter>>,
    stats: Arc<StatsRegistry>,
    parallel: bool,
    contract_cache: Option<FilterCache<Vec<OptionContract>>>,
    spread_cache: Option<FilterCache<Vec<VerticalSpread>>>,
}

impl FilterChain {
    /// Builds a chain from a declarative config.
    ///
    /// # Parameters
    /// * `config` - Which filters to register, in fixed field order
    /// * `enable_cache` - Attach content-addressed result caches
    /// * `parallel` - Scatter contract filters and intersect survivors
    pub fn from_config(config: &FilterConfig, enable_cache: bool, parallel: bool) -> Self {
        let mut chain = Self {
            contract_filters: Vec::new(),
            spread_filters: Vec::new(),
            combined_filters: Vec::new(),
            stats: Arc::new(StatsRegistry::new()),
            parallel,
            contract_cache: enable_cache.then(|| FilterCache::new(DEFAULT_CACHE_TTL)),
            spread_cache: enable_cache.then(|| FilterCache::new(DEFAULT_CACHE_TTL)),
        };

        if let Some(f) = &config.delta {
            chain.add_contract_filter(Arc::new(f.clone()));
        }
        if let Some(f) = &config.dte {
            chain.add_contract_filter(Arc::new(f.clone()));
        }
        if let Some(f) = &config.liquidity {
            chain.add_contract_filter(Arc::new(f.clone()));
        }
        if let Some(f) = &config.theta {
            chain.add_contract_filter(Arc::new(f.clone()));
        }
        if let Some(f) = &config.vega {
            chain.add_contract_filter(Arc::new(f.clone()));
        }
        if let Some(f) = &config.iv {
            chain.add_contract_filter(Arc::new(f.clone()));
        }
        if let Some(f) = &config.iv_percentile {
            chain.add_contract_filter(Arc::new(f.clone()));
        }

        if let Some(f) = &config.spread_width {
            chain.add_spread_filter(Arc::new(f.clone()));
        }
        if let Some(f) = &config.prob_of_profit {
            chain.add_spread_filter(Arc::new(f.clone()));
        }

        chain
    }

    pub fn add_contract_filter(&mut self, filter: Arc<dyn ContractFilter>) {
        self.stats.register(filter.name());
        self.contract_filters.push(filter);
    }

    pub fn add_spread_filter(&mut self, filter: Arc<dyn SpreadFilter>) {
        self.stats.register(filter.name());
        self.spread_filters.push(filter);
    }

    pub fn add_combined_filter(&mut self, filter: Arc<dyn CombinedFilter>) {
        self.stats.register(filter.name());
        self.combined_filters.push(filter);
    }

    /// Shared statistics registry for this chain.
    pub fn stats_registry(&self) -> Arc<StatsRegistry> {
        Arc::clone(&self.stats)
    }

    /// Snapshot copy of every filter's execution stats.
    pub fn stats(&self) -> HashMap<String, FilterStats> {
        self.stats.snapshot()
    }

    /// Accounting for the attached contract cache, if any.
    pub fn contract_cache_stats(&self) -> Option<crate::cache::CacheStats> {
        self.contract_cache.as_ref().map(FilterCache::stats)
    }

    /// Runs every contract filter over the book.
    ///
    /// Cached lookup first (when enabled), then a sequential fold or the
    /// parallel scatter/intersect, then cache store. A cache hit does not
    /// execute any filter, so execution counts stay put.
    pub fn apply_to_contracts(&self, contracts: &[OptionContract]) -> Vec<OptionContract> {
        if let Some(cache) = &self.contract_cache {
            if let Some(hit) = cache.get(contracts) {
                debug!(n = hit.len(), "contract filter result served from cache");
                return hit;
            }
        }

        let result = if self.parallel && self.contract_filters.len() > 1 {
            self.apply_contracts_parallel(contracts)
        } else {
            self.apply_contracts_sequential(contracts)
        };

        if let Some(cache) = &self.contract_cache {
            cache.set(contracts, result.clone());
        }
        result
    }

    fn apply_contracts_sequential(&self, contracts: &[OptionContract]) -> Vec<OptionContract> {
        let mut result = contracts.to_vec();
        for filter in &self.contract_filters {
            let start = Instant::now();
            let items_in = result.len();
            result = filter.apply(&result);
            self.stats
                .record(filter.name(), items_in, result.len(), start.elapsed());
            debug!(
                filter = filter.name(),
                items_in,
                items_out = result.len(),
                "contract filter pass"
            );
        }
        result
    }

    /// Every filter sees the full input; survivors are intersected by full
    /// contract identity. First-filter order is preserved.
    fn apply_contracts_parallel(&self, contracts: &[OptionContract]) -> Vec<OptionContract> {
        let mut survivor_sets: Vec<Vec<OptionContract>> =
            Vec::with_capacity(self.contract_filters.len());

        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .contract_filters
                .iter()
                .map(|filter| {
                    let stats = &self.stats;
                    scope.spawn(move || {
                        let start = Instant::now();
                        let filtered = filter.apply(contracts);
                        stats.record(filter.name(), contracts.len(), filtered.len(), start.elapsed());
                        filtered
                    })
                })
                .collect();

            for handle in handles {
                if let Ok(filtered) = handle.join() {
                    survivor_sets.push(filtered);
                }
            }
        });

        let mut sets = survivor_sets.into_iter();
        let Some(mut result) = sets.next() else {
            return contracts.to_vec();
        };
        for other in sets {
            let keys: HashSet<ContractKey> = other.iter().map(OptionContract::key).collect();
            result.retain(|c| keys.contains(&c.key()));
        }
        result
    }

    /// Runs every spread filter over each spread, short-circuiting on the
    /// first rejection. Stats are charged only to filters that actually ran.
    pub fn apply_to_spreads(&self, spreads: &[VerticalSpread]) -> Vec<VerticalSpread> {
        if let Some(cache) = &self.spread_cache {
            if let Some(hit) = cache.get(spreads) {
                debug!(n = hit.len(), "spread filter result served from cache");
                return hit;
            }
        }

        let mut result = Vec::new();
        for spread in spreads {
            let mut passed = true;
            for filter in &self.spread_filters {
                let start = Instant::now();
                if filter.matches(spread) {
                    self.stats.record(filter.name(), 1, 1, start.elapsed());
                } else {
                    self.stats.record(filter.name(), 1, 0, start.elapsed());
                    passed = false;
                    break;
                }
            }
            if passed {
                result.push(spread.clone());
            }
        }

        if let Some(cache) = &self.spread_cache {
            cache.set(spreads, result.clone());
        }
        result
    }

    /// Folds the combined filters over both populations.
    pub fn apply_combined(
        &self,
        contracts: &[OptionContract],
        spreads: &[VerticalSpread],
    ) -> (Vec<OptionContract>, Vec<VerticalSpread>) {
        let mut result_contracts = contracts.to_vec();
        let mut result_spreads = spreads.to_vec();

        for filter in &self.combined_filters {
            let start = Instant::now();
            let items_in = result_contracts.len() + result_spreads.len();
            let (c, s) = filter.apply_combined(&result_contracts, &result_spreads);
            result_contracts = c;
            result_spreads = s;
            let items_out = result_contracts.len() + result_spreads.len();
            self.stats
                .record(filter.name(), items_in, items_out, start.elapsed());
        }

        (result_contracts, result_spreads)
    }

    /// Validates every registered filter; first failure wins.
    pub fn validate(&self) -> Result<(), FilterError> {
        for filter in &self.contract_filters {
            filter.validate()?;
        }
        for filter in &self.spread_filters {
            filter.validate()?;
        }
        for filter in &self.combined_filters {
            filter.validate()?;
        }
        Ok(())
    }
}
