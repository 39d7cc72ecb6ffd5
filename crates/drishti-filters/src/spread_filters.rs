//! # Spread Filters
//!
//! ## Description
//! Predicates over assembled vertical spreads: structural bands (width,
//! probability of profit), economics (risk/reward, breakeven distance,
//! expected value, margin efficiency), and Greeks exposure (delta
//! neutrality, combined Greeks gate, volatility edge, per-leg liquidity).
//! A spread must satisfy every registered filter to survive; the chain
//! short-circuits on the first rejection.

use drishti_models::VerticalSpread;
use serde::{Deserialize, Serialize};

use crate::config::{FilterError, SpreadFilter};

/// Keeps spreads whose strike width lies in `[min_width, max_width]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadWidthFilter {
    pub min_width: f64,
    pub max_width: f64,
}

impl SpreadFilter for SpreadWidthFilter {
    fn name(&self) -> &'static str {
        "SpreadWidthFilter"
    }

    fn matches(&self, spread: &VerticalSpread) -> bool {
        let width = spread.short_leg.strike - spread.long_leg.strike;
        width >= self.min_width && width <= self.max_width
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.min_width < 0.0 {
            return Err(FilterError::NegativeThreshold {
                filter: self.name(),
                field: "min_width",
            });
        }
        if self.min_width > self.max_width {
            return Err(FilterError::InvertedBounds { filter: self.name() });
        }
        Ok(())
    }
}

/// Keeps spreads whose probability of profit lies in `[min_pop, max_pop]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopFilter {
    pub min_pop: f64,
    pub max_pop: f64,
}

impl SpreadFilter for PopFilter {
    fn name(&self) -> &'static str {
        "PopFilter"
    }

    fn matches(&self, spread: &VerticalSpread) -> bool {
        spread.prob_of_profit >= self.min_pop && spread.prob_of_profit <= self.max_pop
    }

    fn validate(&self) -> Result<(), FilterError> {
        if !(0.0..=1.0).contains(&self.min_pop) {
            return Err(FilterError::OutOfDomain {
                filter: self.name(),
                field: "min_pop",
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&self.max_pop) {
            return Err(FilterError::OutOfDomain {
                filter: self.name(),
                field: "max_pop",
                min: 0.0,
                max: 1.0,
            });
        }
        if self.min_pop > self.max_pop {
            return Err(FilterError::InvertedBounds { filter: self.name() });
        }
        Ok(())
    }
}

/// Keeps spreads whose max-profit / max-loss ratio lies in the band.
///
/// Max loss here is per share (width minus credit); a non-positive max
/// loss marks a malformed spread and fails the filter outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRewardFilter {
    pub min_ratio: f64,
    pub max_ratio: f64,
}

impl SpreadFilter for RiskRewardFilter {
    fn name(&self) -> &'static str {
        "RiskRewardFilter"
    }

    fn matches(&self, spread: &VerticalSpread) -> bool {
        let max_profit = spread.credit;
        let max_loss = (spread.short_leg.strike - spread.long_leg.strike) - spread.credit;
        if max_loss <= 0.0 {
            return false;
        }
        let ratio = max_profit / max_loss;
        ratio >= self.min_ratio && ratio <= self.max_ratio
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.min_ratio > self.max_ratio {
            return Err(FilterError::InvertedBounds { filter: self.name() });
        }
        Ok(())
    }
}

/// Keeps spreads whose breakeven sits the right distance from spot.
///
/// Distance is `|breakeven - spot| / spot` expressed in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakevenFilter {
    pub min_distance: f64,
    pub max_distance: f64,
}

impl SpreadFilter for BreakevenFilter {
    fn name(&self) -> &'static str {
        "BreakevenFilter"
    }

    fn matches(&self, spread: &VerticalSpread) -> bool {
        if spread.underlying_price <= 0.0 {
            return false;
        }
        let breakeven = spread.short_leg.strike - spread.credit;
        let distance =
            ((breakeven - spread.underlying_price) / spread.underlying_price * 100.0).abs();
        distance >= self.min_distance && distance <= self.max_distance
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.min_distance > self.max_distance {
            return Err(FilterError::InvertedBounds { filter: self.name() });
        }
        Ok(())
    }
}

/// Expected-value floor: `EV = maxProfit * PoP - maxLoss * (1 - PoP)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedValueFilter {
    pub min_ev: f64,
}

impl SpreadFilter for ExpectedValueFilter {
    fn name(&self) -> &'static str {
        "ExpectedValueFilter"
    }

    fn matches(&self, spread: &VerticalSpread) -> bool {
        let max_profit = spread.credit;
        let max_loss = (spread.short_leg.strike - spread.long_leg.strike) - spread.credit;
        let ev = max_profit * spread.prob_of_profit - max_loss * (1.0 - spread.prob_of_profit);
        ev >= self.min_ev
    }
}

/// Caps the absolute net delta of the position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaNeutralFilter {
    pub max_net_delta: f64,
}

impl SpreadFilter for DeltaNeutralFilter {
    fn name(&self) -> &'static str {
        "DeltaNeutralFilter"
    }

    fn matches(&self, spread: &VerticalSpread) -> bool {
        let net_delta = (spread.short_leg.delta + spread.long_leg.delta).abs();
        net_delta <= self.max_net_delta
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.max_net_delta < 0.0 {
            return Err(FilterError::NegativeThreshold {
                filter: self.name(),
                field: "max_net_delta",
            });
        }
        Ok(())
    }
}

/// Return-on-margin floor, with margin approximated as the width notional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginEfficiencyFilter {
    pub min_efficiency: f64,
}

impl SpreadFilter for MarginEfficiencyFilter {
    fn name(&self) -> &'static str {
        "MarginEfficiencyFilter"
    }

    fn matches(&self, spread: &VerticalSpread) -> bool {
        let margin = (spread.short_leg.strike - spread.long_leg.strike) * 100.0;
        if margin <= 0.0 {
            return false;
        }
        let return_on_margin = (spread.credit * 100.0) / margin;
        return_on_margin >= self.min_efficiency
    }
}

/// Requires a volatility edge: the short leg's IV must exceed the long
/// leg's by at least `min_iv_diff`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityEdgeFilter {
    pub min_iv_diff: f64,
}

impl SpreadFilter for VolatilityEdgeFilter {
    fn name(&self) -> &'static str {
        "VolatilityEdgeFilter"
    }

    fn matches(&self, spread: &VerticalSpread) -> bool {
        spread.short_leg.iv - spread.long_leg.iv >= self.min_iv_diff
    }
}

/// Combined Greeks gate over the whole position.
///
/// # Fields
/// * `max_gamma_risk` - Cap on `|gamma_short + gamma_long|`
/// * `max_vega_risk` - Cap on `|vega_short + vega_long|`
/// * `min_theta_decay` - Floor on combined theta (positive = collecting)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedGreeksFilter {
    pub max_gamma_risk: f64,
    pub max_vega_risk: f64,
    pub min_theta_decay: f64,
}

impl SpreadFilter for CombinedGreeksFilter {
    fn name(&self) -> &'static str {
        "CombinedGreeksFilter"
    }

    fn matches(&self, spread: &VerticalSpread) -> bool {
        let net_gamma = (spread.short_leg.gamma + spread.long_leg.gamma).abs();
        let net_vega = (spread.short_leg.vega + spread.long_leg.vega).abs();
        let net_theta = spread.short_leg.theta + spread.long_leg.theta;

        net_gamma <= self.max_gamma_risk
            && net_vega <= self.max_vega_risk
            && net_theta >= self.min_theta_decay
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.max_gamma_risk < 0.0 {
            return Err(FilterError::NegativeThreshold {
                filter: self.name(),
                field: "max_gamma_risk",
            });
        }
        if self.max_vega_risk < 0.0 {
            return Err(FilterError::NegativeThreshold {
                filter: self.name(),
                field: "max_vega_risk",
            });
        }
        Ok(())
    }
}

/// Requires both legs to quote tightly enough to fill.
///
/// # Fields
/// * `min_bid_ask_ratio` - Floor on `bid / ask` per leg
/// * `max_spread_width` - Cap on `(ask - bid) / ask` per leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegLiquidityFilter {
    pub min_bid_ask_ratio: f64,
    pub max_spread_width: f64,
}

impl SpreadFilter for LegLiquidityFilter {
    fn name(&self) -> &'static str {
        "LegLiquidityFilter"
    }

    fn matches(&self, spread: &VerticalSpread) -> bool {
        for leg in [&spread.short_leg, &spread.long_leg] {
            if leg.ask <= 0.0 {
                return false;
            }
            if leg.bid / leg.ask < self.min_bid_ask_ratio {
                return false;
            }
            if (leg.ask - leg.bid) / leg.ask > self.max_spread_width {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::spread;

    #[test]
    fn test_width_band() {
        let filter = SpreadWidthFilter {
            min_width: 2.0,
            max_width: 10.0,
        };
        assert!(filter.matches(&spread("SPY", 450.0, 445.0, 1.2)));
        assert!(!filter.matches(&spread("SPY", 450.0, 449.0, 0.4)));
        assert!(!filter.matches(&spread("SPY", 450.0, 430.0, 4.0)));
    }

    #[test]
    fn test_pop_band_and_domain_validation() {
        let filter = PopFilter {
            min_pop: 0.60,
            max_pop: 0.85,
        };
        let mut s = spread("SPY", 450.0, 445.0, 1.2);
        assert!(filter.matches(&s));
        s.prob_of_profit = 0.95;
        assert!(!filter.matches(&s));

        let bad = PopFilter {
            min_pop: -0.1,
            max_pop: 0.85,
        };
        assert!(matches!(
            bad.validate(),
            Err(FilterError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_risk_reward_rejects_malformed_spread() {
        let filter = RiskRewardFilter {
            min_ratio: 0.0,
            max_ratio: 100.0,
        };
        // Credit exceeding the per-share width: max loss is non-positive.
        assert!(!filter.matches(&spread("SPY", 450.0, 445.0, 6.0)));
        assert!(filter.matches(&spread("SPY", 450.0, 445.0, 1.0)));
    }

    #[test]
    fn test_expected_value_floor() {
        // credit 1.0, width 5.0, PoP 0.70: EV = 0.7 - 4.0 * 0.3 = -0.5
        let mut s = spread("SPY", 450.0, 445.0, 1.0);
        let filter = ExpectedValueFilter { min_ev: 0.0 };
        assert!(!filter.matches(&s));

        s.prob_of_profit = 0.90;
        // EV = 0.9 - 4.0 * 0.1 = 0.5
        assert!(filter.matches(&s));
    }

    #[test]
    fn test_margin_efficiency_floor() {
        // credit 1.0 on width 5.0: 100 / 500 = 20% return on margin
        let s = spread("SPY", 450.0, 445.0, 1.0);
        assert!(MarginEfficiencyFilter { min_efficiency: 0.15 }.matches(&s));
        assert!(!MarginEfficiencyFilter { min_efficiency: 0.25 }.matches(&s));
    }

    #[test]
    fn test_volatility_edge() {
        let mut s = spread("SPY", 450.0, 445.0, 1.0);
        s.short_leg.iv = 0.32;
        s.long_leg.iv = 0.26;
        assert!(VolatilityEdgeFilter { min_iv_diff: 0.05 }.matches(&s));
        assert!(!VolatilityEdgeFilter { min_iv_diff: 0.10 }.matches(&s));
    }

    #[test]
    fn test_leg_liquidity_rejects_wide_quotes() {
        let filter = LegLiquidityFilter {
            min_bid_ask_ratio: 0.80,
            max_spread_width: 0.15,
        };
        let mut s = spread("SPY", 450.0, 445.0, 1.0);
        assert!(filter.matches(&s));

        s.long_leg.bid = 0.50;
        s.long_leg.ask = 2.00;
        assert!(!filter.matches(&s));
    }
}
