//! # Filter Builder and Strategy Presets
//!
//! ## Description
//! Fluent construction of a [`FilterChain`] from code or JSON. Setter calls
//! accumulate into a [`FilterConfig`]; `build*` validates every registered
//! filter and refuses to hand out a chain on any [`FilterError`], so a chain
//! in circulation is always well-formed. The [`presets`] module carries the
//! five canned strategy profiles.

use tracing::warn;

use crate::chain::FilterChain;
use crate::config::{FilterConfig, FilterError};
use crate::contract_filters::{
    DeltaFilter, DteFilter, IvFilter, IvPercentileFilter, LiquidityFilter, ThetaFilter, VegaFilter,
};
use crate::spread_filters::{PopFilter, SpreadWidthFilter};

/// Fluent builder over a [`FilterConfig`].
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    config: FilterConfig,
    parse_error: Option<String>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delta_filter(mut self, min_delta: f64, max_delta: f64) -> Self {
        self.config.delta = Some(DeltaFilter {
            min_delta,
            max_delta,
            absolute: false,
        });
        self
    }

    /// Delta band compared on `|delta|`, covering puts and calls alike.
    pub fn with_absolute_delta_filter(mut self, min_delta: f64, max_delta: f64) -> Self {
        self.config.delta = Some(DeltaFilter {
            min_delta,
            max_delta,
            absolute: true,
        });
        self
    }

    pub fn with_dte_filter(mut self, min_dte: i64, max_dte: i64) -> Self {
        self.config.dte = Some(DteFilter { min_dte, max_dte });
        self
    }

    pub fn with_liquidity_filter(mut self, min_open_interest: i64, min_volume: i64) -> Self {
        self.config.liquidity = Some(LiquidityFilter {
            min_volume,
            min_open_interest,
            max_bid_ask_spread: 0.0,
        });
        self
    }

    pub fn with_theta_filter(mut self, min_theta: f64, max_theta: f64) -> Self {
        self.config.theta = Some(ThetaFilter { min_theta, max_theta });
        self
    }

    pub fn with_vega_filter(mut self, min_vega: f64, max_vega: f64) -> Self {
        self.config.vega = Some(VegaFilter { min_vega, max_vega });
        self
    }

    pub fn with_iv_filter(mut self, min_iv: f64, max_iv: f64) -> Self {
        self.config.iv = Some(IvFilter { min_iv, max_iv });
        self
    }

    pub fn with_iv_percentile_filter(mut self, min_percentile: f64, max_percentile: f64) -> Self {
        self.config.iv_percentile = Some(IvPercentileFilter {
            min_percentile,
            max_percentile,
        });
        self
    }

    pub fn with_spread_width_filter(mut self, min_width: f64, max_width: f64) -> Self {
        self.config.spread_width = Some(SpreadWidthFilter { min_width, max_width });
        self
    }

    pub fn with_pop_filter(mut self, min_pop: f64, max_pop: f64) -> Self {
        self.config.prob_of_profit = Some(PopFilter { min_pop, max_pop });
        self
    }

    pub fn with_max_positions(mut self, max_positions: usize) -> Self {
        self.config.max_positions = max_positions;
        self
    }

    pub fn with_risk_limit(mut self, risk_limit: f64) -> Self {
        self.config.risk_limit = risk_limit;
        self
    }

    /// Replaces the accumulated config with one parsed from JSON.
    ///
    /// A parse failure is held until `build*`, keeping the fluent style.
    pub fn from_json(mut self, json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(config) => self.config = config,
            Err(err) => {
                warn!(%err, "rejected filter configuration JSON");
                self.parse_error = Some(err.to_string());
            }
        }
        self
    }

    /// Serializes the accumulated config.
    pub fn to_json(&self) -> Result<String, FilterError> {
        Ok(serde_json::to_string_pretty(&self.config)?)
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Builds a plain sequential chain.
    pub fn build(self) -> Result<FilterChain, FilterError> {
        self.build_chain(false, false)
    }

    /// Builds a sequential chain with result caching.
    pub fn build_with_cache(self) -> Result<FilterChain, FilterError> {
        self.build_chain(true, false)
    }

    /// Builds a caching chain with parallel contract filtering.
    pub fn build_parallel(self) -> Result<FilterChain, FilterError> {
        self.build_chain(true, true)
    }

    fn build_chain(self, enable_cache: bool, parallel: bool) -> Result<FilterChain, FilterError> {
        if let Some(message) = self.parse_error {
            warn!(%message, "refusing to build chain from unparsed configuration");
            return Err(FilterError::Config(serde::de::Error::custom(message)));
        }

        let chain = FilterChain::from_config(&self.config, enable_cache, parallel);
        if let Err(err) = chain.validate() {
            warn!(%err, "filter validation failed at build time");
            return Err(err);
        }
        Ok(chain)
    }
}

/// Canned strategy profiles.
pub mod presets {
    use super::FilterBuilder;

    /// Wide safety margins, long DTE, deep liquidity.
    pub fn conservative() -> FilterBuilder {
        FilterBuilder::new()
            .with_delta_filter(0.15, 0.30)
            .with_dte_filter(30, 60)
            .with_liquidity_filter(100, 50)
            .with_iv_percentile_filter(30.0, 70.0)
            .with_pop_filter(0.70, 0.90)
            .with_max_positions(5)
            .with_risk_limit(5_000.0)
    }

    /// Balanced middle-of-the-road profile.
    pub fn moderate() -> FilterBuilder {
        FilterBuilder::new()
            .with_delta_filter(0.20, 0.40)
            .with_dte_filter(20, 45)
            .with_liquidity_filter(50, 25)
            .with_iv_percentile_filter(40.0, 80.0)
            .with_pop_filter(0.60, 0.85)
            .with_max_positions(10)
            .with_risk_limit(10_000.0)
    }

    /// Tighter strikes, shorter DTE, looser liquidity floors.
    pub fn aggressive() -> FilterBuilder {
        FilterBuilder::new()
            .with_delta_filter(0.25, 0.50)
            .with_dte_filter(7, 30)
            .with_liquidity_filter(25, 10)
            .with_iv_percentile_filter(50.0, 90.0)
            .with_pop_filter(0.50, 0.80)
            .with_max_positions(20)
            .with_risk_limit(20_000.0)
    }

    /// Premium selling into elevated implied volatility.
    pub fn high_iv() -> FilterBuilder {
        FilterBuilder::new()
            .with_delta_filter(0.10, 0.25)
            .with_dte_filter(30, 60)
            .with_liquidity_filter(100, 50)
            .with_iv_filter(0.30, 1.0)
            .with_iv_percentile_filter(70.0, 100.0)
            .with_vega_filter(0.05, 0.20)
            .with_max_positions(8)
            .with_risk_limit(8_000.0)
    }

    /// Maximizes daily time-decay collection.
    pub fn theta_harvesting() -> FilterBuilder {
        FilterBuilder::new()
            .with_delta_filter(0.20, 0.35)
            .with_dte_filter(15, 45)
            .with_liquidity_filter(50, 25)
            .with_theta_filter(0.02, 0.10)
            .with_pop_filter(0.65, 0.85)
            .with_max_positions(15)
            .with_risk_limit(15_000.0)
    }
}
