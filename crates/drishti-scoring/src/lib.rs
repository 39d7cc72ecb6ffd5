//! # Spread Scoring Engine
//!
//! Weighted multi-factor ranking of vertical spread candidates.
//!
//! ## Description
//! Nine component scores, each on a 0-100 scale, combine under a
//! configurable weight profile into a single ranking score rounded to two
//! decimals. Three canned profiles shift emphasis between probability,
//! risk/reward, and liquidity. Scoring never mutates the caller's records:
//! `score_spreads` returns score-annotated copies.
//!
//! ## Components (in weight order, balanced profile)
//! 1. **Probability** - probability of profit above the coin-flip line
//! 2. **Risk/Reward** - max profit against max loss
//! 3. **Liquidity** - average volume and open interest of the legs
//! 4. **Delta** - long-leg delta positioning around 0.30-0.35
//! 5. **Theta** - daily decay collected relative to net debit
//! 6. **Vega** - penalty for net volatility exposure
//! 7. **Volatility** - average leg IV inside the tradeable band
//! 8. **Spread width** - strike distance in the fillable range
//! 9. **Time decay** - decay-curve placeholder, fixed at 75
//!
//! ## References
//! - IEEE Std 1016-2009: Software Design Descriptions

use drishti_models::VerticalSpread;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Weight profile for the nine scoring components.
///
/// Weights are fractions that should sum to 1; the engine does not
/// renormalize, so a profile that sums low simply scores low.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub probability_weight: f64,
    pub risk_reward_weight: f64,
    pub liquidity_weight: f64,
    pub delta_weight: f64,
    pub theta_weight: f64,
    pub vega_weight: f64,
    pub volatility_weight: f64,
    pub spread_width_weight: f64,
    pub time_decay_weight: f64,
}

impl Default for ScoringConfig {
    /// Balanced profile.
    fn default() -> Self {
        Self {
            probability_weight: 0.25,
            risk_reward_weight: 0.20,
            liquidity_weight: 0.15,
            delta_weight: 0.10,
            theta_weight: 0.10,
            vega_weight: 0.05,
            volatility_weight: 0.05,
            spread_width_weight: 0.05,
            time_decay_weight: 0.05,
        }
    }
}

impl ScoringConfig {
    /// Risk-averse profile: probability and liquidity dominate.
    pub fn conservative() -> Self {
        Self {
            probability_weight: 0.35,
            risk_reward_weight: 0.15,
            liquidity_weight: 0.20,
            delta_weight: 0.10,
            theta_weight: 0.05,
            vega_weight: 0.05,
            volatility_weight: 0.03,
            spread_width_weight: 0.05,
            time_decay_weight: 0.02,
        }
    }

    /// Profit-focused profile: risk/reward, delta, and theta dominate.
    pub fn aggressive() -> Self {
        Self {
            probability_weight: 0.15,
            risk_reward_weight: 0.30,
            liquidity_weight: 0.10,
            delta_weight: 0.15,
            theta_weight: 0.15,
            vega_weight: 0.05,
            volatility_weight: 0.05,
            spread_width_weight: 0.03,
            time_decay_weight: 0.02,
        }
    }
}

/// Detailed scoring breakdown for one spread.
///
/// # Fields
/// * `total_score` - Weighted sum, rounded to 2 decimals
/// * `component_scores` - Each component on its raw 0-100 scale
/// * `recommendations` - Human-readable flags for weak components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub total_score: f64,
    pub component_scores: HashMap<String, f64>,
    pub recommendations: Vec<String>,
}

/// Calculates spread scores under a weight profile.
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Weighted total score for one spread, rounded to two decimals.
    pub fn score_spread(&self, spread: &VerticalSpread) -> f64 {
        let weighted = self.score_probability(spread.prob_of_profit) * self.config.probability_weight
            + self.score_risk_reward(spread) * self.config.risk_reward_weight
            + self.score_liquidity(spread) * self.config.liquidity_weight
            + self.score_delta(spread) * self.config.delta_weight
            + self.score_theta(spread) * self.config.theta_weight
            + self.score_vega(spread) * self.config.vega_weight
            + self.score_volatility(spread) * self.config.volatility_weight
            + self.score_spread_width(spread) * self.config.spread_width_weight
            + self.score_time_decay(spread) * self.config.time_decay_weight;

        (weighted * 100.0).round() / 100.0
    }

    /// Scores a whole population, returning annotated copies ranked as
    /// given. Caller-owned records are never written to.
    pub fn score_spreads(&self, spreads: &[VerticalSpread]) -> Vec<VerticalSpread> {
        let scored = spreads
            .iter()
            .map(|spread| {
                let mut annotated = spread.clone();
                annotated.score = self.score_spread(spread);
                annotated
            })
            .collect::<Vec<_>>();
        debug!(n = scored.len(), "scored spread population");
        scored
    }

    /// Full per-component breakdown plus textual recommendations.
    pub fn generate_report(&self, spread: &VerticalSpread) -> ScoreReport {
        let mut component_scores = HashMap::new();
        component_scores.insert("probability".to_string(), self.score_probability(spread.prob_of_profit));
        component_scores.insert("risk_reward".to_string(), self.score_risk_reward(spread));
        component_scores.insert("liquidity".to_string(), self.score_liquidity(spread));
        component_scores.insert("delta".to_string(), self.score_delta(spread));
        component_scores.insert("theta".to_string(), self.score_theta(spread));
        component_scores.insert("vega".to_string(), self.score_vega(spread));
        component_scores.insert("volatility".to_string(), self.score_volatility(spread));
        component_scores.insert("spread_width".to_string(), self.score_spread_width(spread));
        component_scores.insert("time_decay".to_string(), self.score_time_decay(spread));

        let mut recommendations = Vec::new();
        if component_scores["probability"] < 50.0 {
            recommendations
                .push("Low probability of profit - consider more conservative strikes".to_string());
        }
        if component_scores["liquidity"] < 30.0 {
            recommendations.push("Low liquidity - wider bid-ask spreads expected".to_string());
        }
        if component_scores["theta"] < 20.0 {
            recommendations
                .push("Low theta collection - consider different strike selection".to_string());
        }

        ScoreReport {
            total_score: self.score_spread(spread),
            component_scores,
            recommendations,
        }
    }

    /// 50% PoP scores 0; 90% and above score 100.
    fn score_probability(&self, probability: f64) -> f64 {
        if probability < 0.5 {
            return 0.0;
        }
        ((probability - 0.5) * 250.0).min(100.0)
    }

    /// 1:1 profit-to-loss scores 50; 2:1 and above score 100.
    fn score_risk_reward(&self, spread: &VerticalSpread) -> f64 {
        if spread.max_loss == 0.0 {
            return 0.0;
        }
        (spread.max_profit / spread.max_loss * 50.0).min(100.0)
    }

    /// Volume contributes up to 50 points, open interest the other 50.
    fn score_liquidity(&self, spread: &VerticalSpread) -> f64 {
        let avg_volume = (spread.long_leg.volume + spread.short_leg.volume) as f64 / 2.0;
        let avg_oi = (spread.long_leg.open_interest + spread.short_leg.open_interest) as f64 / 2.0;
        (avg_volume / 100.0).min(50.0) + (avg_oi / 1000.0).min(50.0)
    }

    /// Peak at 0.30-0.35 |long delta|, zero outside [0.20, 0.50].
    fn score_delta(&self, spread: &VerticalSpread) -> f64 {
        let long_delta = spread.long_leg.delta.abs();
        if !(0.20..=0.50).contains(&long_delta) {
            return 0.0;
        }
        if (0.30..=0.35).contains(&long_delta) {
            return 100.0;
        }
        if long_delta < 0.30 {
            (long_delta - 0.20) * 1000.0
        } else {
            (0.50 - long_delta) * 667.0
        }
    }

    /// Positive net decay relative to the net debit; 1% daily scores 100.
    fn score_theta(&self, spread: &VerticalSpread) -> f64 {
        let net_theta = spread.short_leg.theta - spread.long_leg.theta;
        if net_theta <= 0.0 {
            return 0.0;
        }
        if spread.net_debit > 0.0 {
            let theta_percent = net_theta / spread.net_debit * 100.0;
            return (theta_percent * 100.0).min(100.0);
        }
        // Percentage unavailable without a debit basis.
        50.0
    }

    /// Near-neutral vega scores 100; exposure above 0.20 scores 0.
    fn score_vega(&self, spread: &VerticalSpread) -> f64 {
        let net_vega = (spread.long_leg.vega - spread.short_leg.vega).abs();
        if net_vega < 0.05 {
            return 100.0;
        }
        if net_vega > 0.20 {
            return 0.0;
        }
        (0.20 - net_vega) * 667.0
    }

    /// Average leg IV in [0.20, 0.40] scores 100, zero outside [0.15, 0.60].
    fn score_volatility(&self, spread: &VerticalSpread) -> f64 {
        let avg_iv = (spread.long_leg.iv + spread.short_leg.iv) / 2.0;
        if !(0.15..=0.60).contains(&avg_iv) {
            return 0.0;
        }
        if (0.20..=0.40).contains(&avg_iv) {
            return 100.0;
        }
        if avg_iv < 0.20 {
            (avg_iv - 0.15) * 2000.0
        } else {
            (0.60 - avg_iv) * 250.0
        }
    }

    /// Peak at 2.5-5 point width, zero below 1 or above 10.
    fn score_spread_width(&self, spread: &VerticalSpread) -> f64 {
        let width = spread.short_leg.strike - spread.long_leg.strike;
        if !(1.0..=10.0).contains(&width) {
            return 0.0;
        }
        if (2.5..=5.0).contains(&width) {
            return 100.0;
        }
        if width < 2.5 {
            (width - 1.0) * 67.0
        } else {
            (10.0 - width) * 20.0
        }
    }

    /// Decay-curve placeholder until DTE-aware curve modelling lands.
    fn score_time_decay(&self, _spread: &VerticalSpread) -> f64 {
        75.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use drishti_models::{OptionContract, OptionType, SpreadType};

    fn leg(strike: f64, delta: f64, theta: f64, vega: f64, iv: f64) -> OptionContract {
        OptionContract {
            symbol: "SPY".to_string(),
            contract_id: format!("SPY-{strike}"),
            underlying: "SPY".to_string(),
            strike,
            expiry: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            option_type: OptionType::Put,
            bid: 1.90,
            ask: 2.10,
            last: 2.00,
            volume: 5000,
            open_interest: 50_000,
            delta,
            gamma: 0.02,
            theta,
            vega,
            rho: 0.01,
            iv,
            iv_rank: 55.0,
            iv_percentile: 60.0,
            dte: 40,
            bid_ask_spread: 0.20,
            moneyness: 0.05,
            score: 0.0,
            last_update: Utc::now(),
        }
    }

    /// Strong candidate: every component lands at or near its peak.
    fn good_spread() -> VerticalSpread {
        VerticalSpread {
            symbol: "SPY".to_string(),
            short_leg: leg(450.0, -0.30, -0.03, 0.10, 0.30),
            long_leg: leg(446.0, -0.32, -0.08, 0.08, 0.28),
            spread_type: SpreadType::Credit,
            credit: 130.0,
            net_debit: 1.0,
            max_profit: 130.0,
            max_loss: 270.0,
            breakeven: 448.7,
            prob_of_profit: 0.90,
            net_delta: 0.02,
            net_theta: -0.05,
            net_vega: 0.02,
            underlying_price: 455.0,
            score: 0.0,
        }
    }

    #[test]
    fn test_score_is_bounded_and_rounded() {
        for config in [
            ScoringConfig::default(),
            ScoringConfig::conservative(),
            ScoringConfig::aggressive(),
        ] {
            let scorer = Scorer::new(config);
            let score = scorer.score_spread(&good_spread());
            assert!((0.0..=100.0).contains(&score), "score {score} out of bounds");
            assert!((score * 100.0 - (score * 100.0).round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_probability_component_scale() {
        let scorer = Scorer::new(ScoringConfig::default());
        let mut s = good_spread();

        s.prob_of_profit = 0.40;
        assert_eq!(scorer.generate_report(&s).component_scores["probability"], 0.0);

        s.prob_of_profit = 0.70;
        assert!((scorer.generate_report(&s).component_scores["probability"] - 50.0).abs() < 1e-9);

        s.prob_of_profit = 0.95;
        assert_eq!(scorer.generate_report(&s).component_scores["probability"], 100.0);
    }

    #[test]
    fn test_risk_reward_zero_max_loss_scores_zero() {
        let scorer = Scorer::new(ScoringConfig::default());
        let mut s = good_spread();
        s.max_loss = 0.0;
        assert_eq!(scorer.generate_report(&s).component_scores["risk_reward"], 0.0);
    }

    #[test]
    fn test_theta_component_zero_when_not_collecting() {
        let scorer = Scorer::new(ScoringConfig::default());
        let mut s = good_spread();
        // Long leg decays faster than the short: net theta negative.
        s.short_leg.theta = -0.08;
        s.long_leg.theta = -0.02;
        assert_eq!(scorer.generate_report(&s).component_scores["theta"], 0.0);
    }

    #[test]
    fn test_theta_component_falls_back_without_debit() {
        let scorer = Scorer::new(ScoringConfig::default());
        let mut s = good_spread();
        s.net_debit = 0.0;
        assert_eq!(scorer.generate_report(&s).component_scores["theta"], 50.0);
    }

    #[test]
    fn test_delta_component_peak_and_edges() {
        let scorer = Scorer::new(ScoringConfig::default());
        let mut s = good_spread();

        s.long_leg.delta = -0.32;
        assert_eq!(scorer.generate_report(&s).component_scores["delta"], 100.0);

        s.long_leg.delta = -0.25;
        assert!((scorer.generate_report(&s).component_scores["delta"] - 50.0).abs() < 1e-9);

        s.long_leg.delta = -0.60;
        assert_eq!(scorer.generate_report(&s).component_scores["delta"], 0.0);
    }

    #[test]
    fn test_score_spreads_returns_annotated_copies() {
        let scorer = Scorer::new(ScoringConfig::default());
        let population = vec![good_spread(), good_spread()];

        let scored = scorer.score_spreads(&population);
        assert_eq!(scored.len(), 2);
        assert!(scored.iter().all(|s| s.score > 0.0));
        // Caller's records stay untouched.
        assert!(population.iter().all(|s| s.score == 0.0));
    }

    #[test]
    fn test_report_flags_weak_components() {
        let scorer = Scorer::new(ScoringConfig::default());
        let mut s = good_spread();
        s.prob_of_profit = 0.55; // probability component 12.5
        s.short_leg.volume = 0;
        s.long_leg.volume = 0;
        s.short_leg.open_interest = 100;
        s.long_leg.open_interest = 100; // liquidity 0.1
        s.short_leg.theta = -0.02;
        s.long_leg.theta = -0.02; // net theta 0

        let report = scorer.generate_report(&s);
        assert_eq!(report.recommendations.len(), 3);
        assert!(report.recommendations[0].contains("probability"));
        assert!(report.recommendations[1].contains("liquidity"));
        assert!(report.recommendations[2].contains("theta"));
    }

    #[test]
    fn test_profiles_rank_differently() {
        let mut lottery = good_spread();
        lottery.prob_of_profit = 0.55;
        lottery.max_profit = 400.0;
        lottery.max_loss = 100.0;

        let conservative = Scorer::new(ScoringConfig::conservative());
        let aggressive = Scorer::new(ScoringConfig::aggressive());
        // A low-probability, high-payoff spread appeals to the aggressive
        // profile more than the conservative one.
        assert!(aggressive.score_spread(&lottery) > conservative.score_spread(&lottery));
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = ScoringConfig::aggressive();
        let json = serde_json::to_string(&config).unwrap();
        let back: ScoringConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.risk_reward_weight, 0.30);
    }
}
