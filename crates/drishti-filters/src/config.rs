//! # Filter Traits and Declarative Configuration
//!
//! ## Description
//! Defines the three filter seams of the pipeline and the serde-backed
//! [`FilterConfig`] that declares which concrete filters a chain carries.
//! A filter kind left as `None` is simply not registered, so an empty
//! config yields an identity chain. All bound checking happens once, at
//! build time, through [`FilterError`]; `apply`/`matches` never fail.

use drishti_models::{OptionContract, VerticalSpread};
use serde::{Deserialize, Serialize};

use crate::contract_filters::{
    DeltaFilter, DteFilter, IvFilter, IvPercentileFilter, LiquidityFilter, ThetaFilter, VegaFilter,
};
use crate::spread_filters::{PopFilter, SpreadWidthFilter};

/// Configuration rejected at chain build time.
///
/// # Variants
/// * `OutOfDomain` - A bound lies outside its legal interval
/// * `InvertedBounds` - Minimum bound exceeds maximum bound
/// * `NegativeThreshold` - A count or width threshold is negative
/// * `Config` - Configuration JSON failed to parse
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// A bound lies outside its legal interval.
    #[error("{filter}: {field} must be between {min} and {max}")]
    OutOfDomain {
        filter: &'static str,
        field: &'static str,
        min: f64,
        max: f64,
    },
    /// Minimum bound exceeds maximum bound.
    #[error("{filter}: minimum bound cannot exceed maximum bound")]
    InvertedBounds { filter: &'static str },
    /// A count or width threshold is negative.
    #[error("{filter}: {field} cannot be negative")]
    NegativeThreshold {
        filter: &'static str,
        field: &'static str,
    },
    /// Configuration JSON failed to parse.
    #[error("invalid filter configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Filters an option book contract by contract.
///
/// Implementations preserve input order and never mutate their input; the
/// returned vector holds clones of the surviving records.
pub trait ContractFilter: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, contracts: &[OptionContract]) -> Vec<OptionContract>;
    fn validate(&self) -> Result<(), FilterError> {
        Ok(())
    }
}

/// Accepts or rejects one assembled vertical spread.
pub trait SpreadFilter: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, spread: &VerticalSpread) -> bool;
    fn validate(&self) -> Result<(), FilterError> {
        Ok(())
    }
}

/// Portfolio-level pass over both populations at once.
///
/// Combined filters see contracts and spreads together so they can enforce
/// cross-cutting limits (correlation, allocation, ranking). They return
/// fresh vectors; score adjustments happen on the returned copies only.
pub trait CombinedFilter: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply_combined(
        &self,
        contracts: &[OptionContract],
        spreads: &[VerticalSpread],
    ) -> (Vec<OptionContract>, Vec<VerticalSpread>);
    fn validate(&self) -> Result<(), FilterError> {
        Ok(())
    }
}

/// Declarative filter selection for one chain.
///
/// # Fields
/// * `delta` .. `iv_percentile` - Contract filters, registered in field order
/// * `spread_width`, `prob_of_profit` - Spread filters
/// * `max_positions` - Position count limit carried for downstream sizing
/// * `risk_limit` - Capital-at-risk limit carried for downstream sizing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    // Contract filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dte: Option<DteFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<LiquidityFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<ThetaFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vega: Option<VegaFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<IvFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv_percentile: Option<IvPercentileFilter>,

    // Spread filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread_width: Option<SpreadWidthFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prob_of_profit: Option<PopFilter>,

    // Position limits
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub max_positions: usize,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub risk_limit: f64,
}

fn is_zero_usize(v: &usize) -> bool {
    *v == 0
}

fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}
