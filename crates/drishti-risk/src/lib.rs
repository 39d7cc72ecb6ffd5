//! # Greeks Risk Analyzer
//!
//! Position-level Greeks analysis for vertical spread candidates.
//!
//! ## Description
//! Computes the net Greeks of a spread (short minus long), buckets delta,
//! gamma, and vega exposure into [`RiskLevel`]s against configurable
//! thresholds, measures theta capture relative to the net debit, and folds
//! everything into a composite risk score on a 0-100 scale where lower is
//! better. A spread is "balanced" when no dimension runs hot and the
//! composite stays under 50.
//!
//! ## Risk dimensions (25 points each)
//! 1. **Delta** - long-leg positioning against the preferred band
//! 2. **Gamma** - worst-leg gamma against warning and max thresholds
//! 3. **Theta** - direction and capture rate of time decay
//! 4. **Vega** - absolute net volatility exposure
//!
//! ## References
//! - IEEE Std 1016-2009: Software Design Descriptions

use drishti_models::VerticalSpread;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Exposure bucket for one risk dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Composite-score contribution of this bucket.
    fn points(self) -> f64 {
        match self {
            RiskLevel::Low => 5.0,
            RiskLevel::Medium => 15.0,
            RiskLevel::High => 25.0,
        }
    }
}

/// Thresholds and targets for Greeks analysis.
///
/// # Fields
/// * `delta_min` / `delta_max` - Preferred band for `|long delta|`
/// * `gamma_warning` / `gamma_max_risk` - Per-leg gamma escalation points
/// * `theta_min_daily` - Minimum acceptable daily capture (percent)
/// * `theta_as_percent` - Express capture as % of net debit when possible
/// * `vega_max_exposure` - `|net vega|` above this is HIGH
/// * `rho_max_exposure` - Warn when `|net rho|` exceeds this
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreeksConfig {
    pub delta_min: f64,
    pub delta_max: f64,
    pub delta_neutral: bool,
    pub gamma_max_risk: f64,
    pub gamma_warning: f64,
    pub theta_min_daily: f64,
    pub theta_as_percent: bool,
    pub vega_max_exposure: f64,
    pub vega_neutral: bool,
    pub rho_max_exposure: f64,
}

impl Default for GreeksConfig {
    fn default() -> Self {
        Self {
            delta_min: 0.20,
            delta_max: 0.40,
            delta_neutral: false,
            gamma_max_risk: 0.10,
            gamma_warning: 0.05,
            theta_min_daily: 0.01,
            theta_as_percent: true,
            vega_max_exposure: 0.20,
            vega_neutral: false,
            rho_max_exposure: 0.05,
        }
    }
}

/// Full analysis output for one spread.
///
/// # Fields
/// * `net_*` - Position Greeks, short leg minus long leg
/// * `theta_capture` - Daily theta as % of net debit (raw theta otherwise)
/// * `risk_score` - Composite 0-100, lower is better
/// * `is_balanced` - No dimension HIGH, collecting theta, score under 50
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreeksReport {
    pub net_delta: f64,
    pub net_gamma: f64,
    pub net_theta: f64,
    pub net_vega: f64,
    pub net_rho: f64,

    pub delta_risk: RiskLevel,
    pub gamma_risk: RiskLevel,
    pub theta_capture: f64,
    pub vega_exposure: RiskLevel,

    pub is_balanced: bool,
    pub risk_score: f64,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// One entry of a comparative ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreeksComparison {
    pub spread: VerticalSpread,
    pub report: GreeksReport,
    /// 1-based rank, ascending risk score.
    pub ranking: usize,
}

/// Analyzes spread Greeks against a [`GreeksConfig`].
pub struct GreeksAnalyzer {
    config: GreeksConfig,
}

impl GreeksAnalyzer {
    pub fn new(config: GreeksConfig) -> Self {
        Self { config }
    }

    /// Full Greeks analysis of one spread.
    pub fn analyze_spread(&self, spread: &VerticalSpread) -> GreeksReport {
        let net_delta = spread.short_leg.delta - spread.long_leg.delta;
        let net_gamma = spread.short_leg.gamma - spread.long_leg.gamma;
        let net_theta = spread.short_leg.theta - spread.long_leg.theta;
        let net_vega = spread.short_leg.vega - spread.long_leg.vega;
        let net_rho = self.net_rho(spread);

        let mut warnings = Vec::new();

        let delta_risk = self.bucket_delta(spread, net_delta, &mut warnings);
        let gamma_risk = self.bucket_gamma(spread, net_gamma, &mut warnings);
        let theta_capture = self.theta_capture(spread, net_theta, &mut warnings);
        let vega_exposure = self.bucket_vega(net_vega, &mut warnings);
        self.check_rho(net_rho, &mut warnings);

        let risk_score =
            self.risk_score(delta_risk, gamma_risk, vega_exposure, net_theta, theta_capture);
        let is_balanced = delta_risk != RiskLevel::High
            && gamma_risk != RiskLevel::High
            && net_theta > 0.0
            && vega_exposure != RiskLevel::High
            && risk_score < 50.0;

        let recommendations = self.recommendations(
            delta_risk,
            gamma_risk,
            vega_exposure,
            net_theta,
            theta_capture,
            is_balanced,
        );

        debug!(
            symbol = %spread.symbol,
            risk_score,
            is_balanced,
            "spread Greeks analyzed"
        );

        GreeksReport {
            net_delta,
            net_gamma,
            net_theta,
            net_vega,
            net_rho,
            delta_risk,
            gamma_risk,
            theta_capture,
            vega_exposure,
            is_balanced,
            risk_score,
            warnings,
            recommendations,
        }
    }

    /// Analyzes a population and ranks it by ascending risk score.
    pub fn compare_spreads(&self, spreads: &[VerticalSpread]) -> Vec<GreeksComparison> {
        let mut comparisons: Vec<GreeksComparison> = spreads
            .iter()
            .map(|spread| GreeksComparison {
                spread: spread.clone(),
                report: self.analyze_spread(spread),
                ranking: 0,
            })
            .collect();

        comparisons.sort_by(|a, b| a.report.risk_score.total_cmp(&b.report.risk_score));
        for (i, comparison) in comparisons.iter_mut().enumerate() {
            comparison.ranking = i + 1;
        }
        comparisons
    }

    fn bucket_delta(
        &self,
        spread: &VerticalSpread,
        net_delta: f64,
        warnings: &mut Vec<String>,
    ) -> RiskLevel {
        let long_delta = spread.long_leg.delta.abs();

        let bucket = if long_delta < self.config.delta_min {
            warnings.push(format!(
                "Long delta {:.2} below minimum {:.2} - low probability of profit",
                long_delta, self.config.delta_min
            ));
            RiskLevel::Low
        } else if long_delta > self.config.delta_max {
            warnings.push(format!(
                "Long delta {:.2} above maximum {:.2} - high directional risk",
                long_delta, self.config.delta_max
            ));
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };

        if self.config.delta_neutral && net_delta.abs() > 0.10 {
            warnings.push(format!(
                "Net delta {net_delta:.2} not neutral - directional bias present"
            ));
        }
        bucket
    }

    fn bucket_gamma(
        &self,
        spread: &VerticalSpread,
        net_gamma: f64,
        warnings: &mut Vec<String>,
    ) -> RiskLevel {
        // Gamma risk is highest near the money; judge the worst leg.
        let max_gamma = spread.long_leg.gamma.abs().max(spread.short_leg.gamma.abs());

        let bucket = if max_gamma > self.config.gamma_max_risk {
            warnings.push(format!(
                "High gamma risk {max_gamma:.3} - large delta changes possible"
            ));
            RiskLevel::High
        } else if max_gamma > self.config.gamma_warning {
            warnings.push(format!("Moderate gamma exposure {max_gamma:.3}"));
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        if net_gamma > 0.0 {
            warnings.push("Positive net gamma - unusual for credit spreads".to_string());
        }
        bucket
    }

    fn theta_capture(
        &self,
        spread: &VerticalSpread,
        net_theta: f64,
        warnings: &mut Vec<String>,
    ) -> f64 {
        let capture = if self.config.theta_as_percent && spread.net_debit > 0.0 {
            let capture = net_theta / spread.net_debit * 100.0;
            if capture < self.config.theta_min_daily {
                warnings.push(format!("Low theta capture {capture:.2}% per day"));
            }
            capture
        } else {
            net_theta
        };

        if net_theta <= 0.0 {
            warnings
                .push("Negative net theta - paying time decay instead of collecting".to_string());
        }
        capture
    }

    fn bucket_vega(&self, net_vega: f64, warnings: &mut Vec<String>) -> RiskLevel {
        let abs_net_vega = net_vega.abs();

        let bucket = if abs_net_vega > self.config.vega_max_exposure {
            warnings.push(format!(
                "High vega exposure {abs_net_vega:.3} - sensitive to IV changes"
            ));
            RiskLevel::High
        } else if abs_net_vega > self.config.vega_max_exposure * 0.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        if self.config.vega_neutral && abs_net_vega > 0.05 {
            warnings.push("Spread not vega neutral - volatility risk present".to_string());
        }
        bucket
    }

    fn check_rho(&self, net_rho: f64, warnings: &mut Vec<String>) {
        if net_rho.abs() > self.config.rho_max_exposure {
            warnings.push(format!(
                "High rho exposure {net_rho:.3} - sensitive to interest rate changes"
            ));
        }
    }

    /// Broker feeds rarely carry rho; estimate a small positive exposure
    /// until real values flow through.
    fn net_rho(&self, _spread: &VerticalSpread) -> f64 {
        0.01
    }

    fn risk_score(
        &self,
        delta: RiskLevel,
        gamma: RiskLevel,
        vega: RiskLevel,
        net_theta: f64,
        theta_capture: f64,
    ) -> f64 {
        let theta_points = if net_theta <= 0.0 {
            25.0
        } else if theta_capture < 0.5 {
            15.0
        } else if theta_capture < 1.0 {
            10.0
        } else {
            5.0
        };
        delta.points() + gamma.points() + theta_points + vega.points()
    }

    fn recommendations(
        &self,
        delta: RiskLevel,
        gamma: RiskLevel,
        vega: RiskLevel,
        net_theta: f64,
        theta_capture: f64,
        is_balanced: bool,
    ) -> Vec<String> {
        let mut recs = Vec::new();

        match delta {
            RiskLevel::Low => recs
                .push("Consider strikes closer to the money for higher probability".to_string()),
            RiskLevel::High => recs.push(
                "Consider strikes further out of the money to reduce directional risk".to_string(),
            ),
            RiskLevel::Medium => {}
        }

        if gamma == RiskLevel::High {
            recs.push("High gamma risk - consider wider strikes or different expiration".to_string());
        }

        if net_theta <= 0.0 {
            recs.push("Negative theta - restructure spread to collect time decay".to_string());
        } else if theta_capture < 0.5 {
            recs.push("Low theta capture - consider strikes with higher time decay".to_string());
        }

        if vega == RiskLevel::High {
            recs.push(
                "High vega exposure - consider different expirations to reduce IV sensitivity"
                    .to_string(),
            );
        }

        if !is_balanced {
            recs.push(
                "Spread is not well-balanced - review strike selection and expiration".to_string(),
            );
        }
        recs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use drishti_models::{OptionContract, OptionType, SpreadType};

    fn leg(strike: f64, delta: f64, gamma: f64, theta: f64, vega: f64) -> OptionContract {
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
            volume: 500,
            open_interest: 2500,
            delta,
            gamma,
            theta,
            vega,
            rho: 0.01,
            iv: 0.28,
            iv_rank: 55.0,
            iv_percentile: 60.0,
            dte: 40,
            bid_ask_spread: 0.20,
            moneyness: 0.05,
            score: 0.0,
            last_update: Utc::now(),
        }
    }

    /// Collecting decay, moderate delta, quiet gamma and vega.
    fn balanced_spread() -> VerticalSpread {
        VerticalSpread {
            symbol: "SPY".to_string(),
            short_leg: leg(450.0, -0.30, 0.03, -0.02, 0.10),
            long_leg: leg(445.0, -0.25, 0.04, -0.06, 0.09),
            spread_type: SpreadType::Credit,
            credit: 1.30,
            net_debit: 1.0,
            max_profit: 1.30,
            max_loss: 3.70,
            breakeven: 448.7,
            prob_of_profit: 0.72,
            net_delta: -0.05,
            net_theta: 0.04,
            net_vega: 0.01,
            underlying_price: 455.0,
            score: 0.0,
        }
    }

    #[test]
    fn test_net_greeks_are_short_minus_long() {
        let analyzer = GreeksAnalyzer::new(GreeksConfig::default());
        let report = analyzer.analyze_spread(&balanced_spread());

        assert!((report.net_delta - (-0.05)).abs() < 1e-12);
        assert!((report.net_gamma - (-0.01)).abs() < 1e-12);
        assert!((report.net_theta - 0.04).abs() < 1e-12);
        assert!((report.net_vega - 0.01).abs() < 1e-12);
        assert_eq!(report.net_rho, 0.01);
    }

    #[test]
    fn test_balanced_spread_passes_all_gates() {
        let analyzer = GreeksAnalyzer::new(GreeksConfig::default());
        let report = analyzer.analyze_spread(&balanced_spread());

        assert_eq!(report.delta_risk, RiskLevel::Medium);
        assert_eq!(report.gamma_risk, RiskLevel::Low);
        assert_eq!(report.vega_exposure, RiskLevel::Low);
        // theta capture: 0.04 / 1.0 * 100 = 4% per day
        assert!((report.theta_capture - 4.0).abs() < 1e-9);
        // 15 (delta) + 5 (gamma) + 5 (theta) + 5 (vega)
        assert_eq!(report.risk_score, 30.0);
        assert!(report.is_balanced);
    }

    #[test]
    fn test_non_positive_theta_scores_25_and_unbalances() {
        let analyzer = GreeksAnalyzer::new(GreeksConfig::default());
        let mut spread = balanced_spread();
        // Long leg decays slower than the short: paying decay.
        spread.short_leg.theta = -0.06;
        spread.long_leg.theta = -0.02;

        let report = analyzer.analyze_spread(&spread);
        assert!(report.net_theta <= 0.0);
        // 15 + 5 + 25 + 5
        assert_eq!(report.risk_score, 50.0);
        assert!(!report.is_balanced);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("Negative net theta")));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("restructure spread")));
    }

    #[test]
    fn test_theta_risk_is_monotonic_in_capture() {
        let analyzer = GreeksAnalyzer::new(GreeksConfig::default());
        let mut spread = balanced_spread();

        // Capture 4%: best band.
        let strong = analyzer.analyze_spread(&spread).risk_score;

        // Capture 0.7%: middle band.
        spread.short_leg.theta = -0.053;
        spread.long_leg.theta = -0.06;
        let middling = analyzer.analyze_spread(&spread).risk_score;

        // Capture 0.3%: weak band.
        spread.short_leg.theta = -0.057;
        let weak = analyzer.analyze_spread(&spread).risk_score;

        // No collection at all.
        spread.short_leg.theta = -0.08;
        let none = analyzer.analyze_spread(&spread).risk_score;

        assert!(strong < middling);
        assert!(middling < weak);
        assert!(weak < none);
    }

    #[test]
    fn test_high_delta_bucket_and_warning() {
        let analyzer = GreeksAnalyzer::new(GreeksConfig::default());
        let mut spread = balanced_spread();
        spread.long_leg.delta = -0.55;

        let report = analyzer.analyze_spread(&spread);
        assert_eq!(report.delta_risk, RiskLevel::High);
        assert!(!report.is_balanced);
        assert!(report.warnings.iter().any(|w| w.contains("above maximum")));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("further out of the money")));
    }

    #[test]
    fn test_gamma_buckets_on_worst_leg() {
        let analyzer = GreeksAnalyzer::new(GreeksConfig::default());
        let mut spread = balanced_spread();

        spread.long_leg.gamma = 0.07;
        let report = analyzer.analyze_spread(&spread);
        assert_eq!(report.gamma_risk, RiskLevel::Medium);

        spread.long_leg.gamma = 0.15;
        let report = analyzer.analyze_spread(&spread);
        assert_eq!(report.gamma_risk, RiskLevel::High);
        assert!(!report.is_balanced);
    }

    #[test]
    fn test_vega_buckets_against_exposure_cap() {
        let analyzer = GreeksAnalyzer::new(GreeksConfig::default());
        let mut spread = balanced_spread();

        spread.short_leg.vega = 0.24;
        spread.long_leg.vega = 0.09; // |net| = 0.15 in (0.10, 0.20]
        let report = analyzer.analyze_spread(&spread);
        assert_eq!(report.vega_exposure, RiskLevel::Medium);

        spread.short_leg.vega = 0.35; // |net| = 0.26 > 0.20
        let report = analyzer.analyze_spread(&spread);
        assert_eq!(report.vega_exposure, RiskLevel::High);
        assert!(!report.is_balanced);
    }

    #[test]
    fn test_compare_spreads_ranks_ascending_risk() {
        let analyzer = GreeksAnalyzer::new(GreeksConfig::default());

        let calm = balanced_spread();
        let mut risky = balanced_spread();
        risky.long_leg.delta = -0.55;
        risky.long_leg.gamma = 0.15;

        let ranked = analyzer.compare_spreads(&[risky, calm]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].ranking, 1);
        assert_eq!(ranked[1].ranking, 2);
        assert!(ranked[0].report.risk_score <= ranked[1].report.risk_score);
        assert!(ranked[0].report.is_balanced);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = GreeksConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: GreeksConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.vega_max_exposure, 0.20);
    }
}
