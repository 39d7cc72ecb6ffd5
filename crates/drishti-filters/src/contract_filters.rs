//! # Contract Filters
//!
//! ## Description
//! Per-contract predicates over the option book: delta band, days to
//! expiration, liquidity floors, Greek bands, and implied-volatility bands.
//! Each filter keeps the contracts whose field falls inside the configured
//! band, preserving order. Bound sanity is enforced by `validate()` at
//! build time; zero liquidity thresholds mean "not enforced".

use drishti_models::OptionContract;
use serde::{Deserialize, Serialize};

use crate::config::{ContractFilter, FilterError};

/// Keeps contracts whose delta lies in `[min_delta, max_delta]`.
///
/// # Fields
/// * `absolute` - Compare `|delta|` instead of the signed value, so one
///   band covers puts and calls alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaFilter {
    pub min_delta: f64,
    pub max_delta: f64,
    #[serde(default)]
    pub absolute: bool,
}

impl ContractFilter for DeltaFilter {
    fn name(&self) -> &'static str {
        "DeltaFilter"
    }

    fn apply(&self, contracts: &[OptionContract]) -> Vec<OptionContract> {
        contracts
            .iter()
            .filter(|c| {
                let delta = if self.absolute { c.delta.abs() } else { c.delta };
                delta >= self.min_delta && delta <= self.max_delta
            })
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<(), FilterError> {
        if !(-1.0..=1.0).contains(&self.min_delta) {
            return Err(FilterError::OutOfDomain {
                filter: self.name(),
                field: "min_delta",
                min: -1.0,
                max: 1.0,
            });
        }
        if !(-1.0..=1.0).contains(&self.max_delta) {
            return Err(FilterError::OutOfDomain {
                filter: self.name(),
                field: "max_delta",
                min: -1.0,
                max: 1.0,
            });
        }
        if self.min_delta > self.max_delta {
            return Err(FilterError::InvertedBounds { filter: self.name() });
        }
        Ok(())
    }
}

/// Keeps contracts expiring within `[min_dte, max_dte]` days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DteFilter {
    pub min_dte: i64,
    pub max_dte: i64,
}

impl ContractFilter for DteFilter {
    fn name(&self) -> &'static str {
        "DteFilter"
    }

    fn apply(&self, contracts: &[OptionContract]) -> Vec<OptionContract> {
        contracts
            .iter()
            .filter(|c| c.dte >= self.min_dte && c.dte <= self.max_dte)
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.min_dte < 0 {
            return Err(FilterError::NegativeThreshold {
                filter: self.name(),
                field: "min_dte",
            });
        }
        if self.max_dte < 0 {
            return Err(FilterError::NegativeThreshold {
                filter: self.name(),
                field: "max_dte",
            });
        }
        if self.min_dte > self.max_dte {
            return Err(FilterError::InvertedBounds { filter: self.name() });
        }
        Ok(())
    }
}

/// Liquidity floors: volume, open interest, and quoted spread width.
///
/// A threshold of zero disables that check, so partial configs stay usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityFilter {
    #[serde(default)]
    pub min_volume: i64,
    #[serde(default)]
    pub min_open_interest: i64,
    #[serde(default)]
    pub max_bid_ask_spread: f64,
}

impl ContractFilter for LiquidityFilter {
    fn name(&self) -> &'static str {
        "LiquidityFilter"
    }

    fn apply(&self, contracts: &[OptionContract]) -> Vec<OptionContract> {
        contracts
            .iter()
            .filter(|c| {
                if self.min_volume > 0 && c.volume < self.min_volume {
                    return false;
                }
                if self.min_open_interest > 0 && c.open_interest < self.min_open_interest {
                    return false;
                }
                if self.max_bid_ask_spread > 0.0 && c.bid_ask_spread > self.max_bid_ask_spread {
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.min_volume < 0 {
            return Err(FilterError::NegativeThreshold {
                filter: self.name(),
                field: "min_volume",
            });
        }
        if self.min_open_interest < 0 {
            return Err(FilterError::NegativeThreshold {
                filter: self.name(),
                field: "min_open_interest",
            });
        }
        if self.max_bid_ask_spread < 0.0 {
            return Err(FilterError::NegativeThreshold {
                filter: self.name(),
                field: "max_bid_ask_spread",
            });
        }
        Ok(())
    }
}

/// Keeps contracts whose theta lies in `[min_theta, max_theta]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThetaFilter {
    pub min_theta: f64,
    pub max_theta: f64,
}

impl ContractFilter for ThetaFilter {
    fn name(&self) -> &'static str {
        "ThetaFilter"
    }

    fn apply(&self, contracts: &[OptionContract]) -> Vec<OptionContract> {
        contracts
            .iter()
            .filter(|c| c.theta >= self.min_theta && c.theta <= self.max_theta)
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.min_theta > self.max_theta {
            return Err(FilterError::InvertedBounds { filter: self.name() });
        }
        Ok(())
    }
}

/// Keeps contracts whose vega lies in `[min_vega, max_vega]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegaFilter {
    pub min_vega: f64,
    pub max_vega: f64,
}

impl ContractFilter for VegaFilter {
    fn name(&self) -> &'static str {
        "VegaFilter"
    }

    fn apply(&self, contracts: &[OptionContract]) -> Vec<OptionContract> {
        contracts
            .iter()
            .filter(|c| c.vega >= self.min_vega && c.vega <= self.max_vega)
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.min_vega > self.max_vega {
            return Err(FilterError::InvertedBounds { filter: self.name() });
        }
        Ok(())
    }
}

/// Keeps contracts whose implied volatility lies in `[min_iv, max_iv]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvFilter {
    pub min_iv: f64,
    pub max_iv: f64,
}

impl ContractFilter for IvFilter {
    fn name(&self) -> &'static str {
        "IvFilter"
    }

    fn apply(&self, contracts: &[OptionContract]) -> Vec<OptionContract> {
        contracts
            .iter()
            .filter(|c| c.iv >= self.min_iv && c.iv <= self.max_iv)
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.min_iv > self.max_iv {
            return Err(FilterError::InvertedBounds { filter: self.name() });
        }
        Ok(())
    }
}

/// Keeps contracts whose IV percentile lies in `[min_percentile, max_percentile]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvPercentileFilter {
    pub min_percentile: f64,
    pub max_percentile: f64,
}

impl ContractFilter for IvPercentileFilter {
    fn name(&self) -> &'static str {
        "IvPercentileFilter"
    }

    fn apply(&self, contracts: &[OptionContract]) -> Vec<OptionContract> {
        contracts
            .iter()
            .filter(|c| {
                c.iv_percentile >= self.min_percentile && c.iv_percentile <= self.max_percentile
            })
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.min_percentile > self.max_percentile {
            return Err(FilterError::InvertedBounds { filter: self.name() });
        }
        Ok(())
    }
}
