//! # Combined Filters
//!
//! ## Description
//! Portfolio-level passes that see contracts and spreads together:
//! correlation caps across symbol groups, allocation balancing, score-based
//! ranking with truncation, and a time-decay optimizer. All of them return
//! fresh vectors; score adjustments land on the returned copies, never on
//! the caller's records.

use std::collections::{HashMap, HashSet};

use drishti_models::{OptionContract, VerticalSpread};
use serde::{Deserialize, Serialize};

use crate::config::{CombinedFilter, FilterError};

/// Caps exposure within groups of correlated symbols.
///
/// # Fields
/// * `max_correlation` - Maximum fraction of a group that may carry positions
/// * `symbol_groups` - Named groups of symbols that move together
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationFilter {
    pub max_correlation: f64,
    #[serde(default)]
    pub symbol_groups: HashMap<String, Vec<String>>,
}

impl CorrelationFilter {
    fn group_of(&self, symbol: &str) -> Option<&str> {
        self.symbol_groups
            .iter()
            .find(|(_, symbols)| symbols.iter().any(|s| s == symbol))
            .map(|(group, _)| group.as_str())
    }
}

impl CombinedFilter for CorrelationFilter {
    fn name(&self) -> &'static str {
        "CorrelationFilter"
    }

    fn apply_combined(
        &self,
        contracts: &[OptionContract],
        spreads: &[VerticalSpread],
    ) -> (Vec<OptionContract>, Vec<VerticalSpread>) {
        if self.symbol_groups.is_empty() {
            return (contracts.to_vec(), spreads.to_vec());
        }

        // Symbols already holding spread positions, per group.
        let mut occupied: HashMap<&str, HashSet<&str>> = HashMap::new();
        for spread in spreads {
            if let Some(group) = self.group_of(&spread.symbol) {
                occupied.entry(group).or_default().insert(&spread.symbol);
            }
        }

        let kept_contracts = contracts
            .iter()
            .filter(|contract| {
                match self.group_of(&contract.symbol) {
                    Some(group) => {
                        let used = occupied.get(group).map_or(0, HashSet::len);
                        if used == 0 {
                            return true;
                        }
                        let group_size = self.symbol_groups[group].len().max(1);
                        (used + 1) as f64 / group_size as f64 <= self.max_correlation
                    }
                    None => true,
                }
            })
            .cloned()
            .collect();

        let mut group_counts: HashMap<&str, usize> = HashMap::new();
        let mut kept_spreads = Vec::new();
        for spread in spreads {
            match self.group_of(&spread.symbol) {
                Some(group) => {
                    let count = group_counts.get(group).copied().unwrap_or(0);
                    let group_size = self.symbol_groups[group].len().max(1);
                    if (count + 1) as f64 / group_size as f64 <= self.max_correlation {
                        kept_spreads.push(spread.clone());
                        group_counts.insert(group, count + 1);
                    }
                }
                None => kept_spreads.push(spread.clone()),
            }
        }

        (kept_contracts, kept_spreads)
    }

    fn validate(&self) -> Result<(), FilterError> {
        if !(0.0..=1.0).contains(&self.max_correlation) {
            return Err(FilterError::OutOfDomain {
                filter: self.name(),
                field: "max_correlation",
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// Balances allocation across symbols, sectors, and strategies.
///
/// # Fields
/// * `max_allocation` - Maximum credit-value fraction per symbol
/// * `strategy_limits` - Maximum open positions per strategy name
/// * `sector_limits` - Maximum credit-value fraction per sector
/// * `symbol_to_sector` - Symbol to sector mapping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioBalanceFilter {
    pub max_allocation: f64,
    #[serde(default)]
    pub strategy_limits: HashMap<String, usize>,
    #[serde(default)]
    pub sector_limits: HashMap<String, f64>,
    #[serde(default)]
    pub symbol_to_sector: HashMap<String, String>,
}

impl CombinedFilter for PortfolioBalanceFilter {
    fn name(&self) -> &'static str {
        "PortfolioBalanceFilter"
    }

    fn apply_combined(
        &self,
        contracts: &[OptionContract],
        spreads: &[VerticalSpread],
    ) -> (Vec<OptionContract>, Vec<VerticalSpread>) {
        let mut symbol_alloc: HashMap<&str, f64> = HashMap::new();
        let mut sector_alloc: HashMap<&str, f64> = HashMap::new();
        let mut total_value = 0.0;
        let vertical_count = spreads.len();

        for spread in spreads {
            let value = spread.credit * 100.0;
            *symbol_alloc.entry(spread.symbol.as_str()).or_default() += value;
            total_value += value;
            if let Some(sector) = self.symbol_to_sector.get(&spread.symbol) {
                *sector_alloc.entry(sector.as_str()).or_default() += value;
            }
        }

        let kept_contracts = contracts
            .iter()
            .filter(|contract| {
                if total_value <= 0.0 {
                    return true;
                }
                let alloc =
                    symbol_alloc.get(contract.symbol.as_str()).copied().unwrap_or(0.0) / total_value;
                if alloc >= self.max_allocation {
                    return false;
                }
                if let Some(sector) = self.symbol_to_sector.get(&contract.symbol) {
                    if let Some(limit) = self.sector_limits.get(sector) {
                        let alloc =
                            sector_alloc.get(sector.as_str()).copied().unwrap_or(0.0) / total_value;
                        if alloc >= *limit {
                            return false;
                        }
                    }
                }
                true
            })
            .cloned()
            .collect();

        let kept_spreads = spreads
            .iter()
            .filter(|_| match self.strategy_limits.get("vertical") {
                Some(limit) => vertical_count < *limit,
                None => true,
            })
            .cloned()
            .collect();

        (kept_contracts, kept_spreads)
    }

    fn validate(&self) -> Result<(), FilterError> {
        if !(0.0..=1.0).contains(&self.max_allocation) {
            return Err(FilterError::OutOfDomain {
                filter: self.name(),
                field: "max_allocation",
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// Ranks both populations by score and truncates to the best.
///
/// Sorting happens on copies; the caller's ordering is untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingFilter {
    pub max_contracts: usize,
    pub max_spreads: usize,
    pub score_threshold: f64,
}

impl CombinedFilter for RankingFilter {
    fn name(&self) -> &'static str {
        "RankingFilter"
    }

    fn apply_combined(
        &self,
        contracts: &[OptionContract],
        spreads: &[VerticalSpread],
    ) -> (Vec<OptionContract>, Vec<VerticalSpread>) {
        let mut ranked_contracts = contracts.to_vec();
        ranked_contracts.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked_contracts.retain(|c| c.score >= self.score_threshold);
        ranked_contracts.truncate(self.max_contracts);

        let mut ranked_spreads = spreads.to_vec();
        ranked_spreads.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked_spreads.retain(|s| s.score >= self.score_threshold);
        ranked_spreads.truncate(self.max_spreads);

        (ranked_contracts, ranked_spreads)
    }
}

/// Optimizes for theta collection around a preferred DTE.
///
/// Survivors get their score discounted by distance from `preferred_dte`;
/// the discount lands on the returned copies only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeDecayOptimizer {
    pub min_daily_theta: f64,
    pub max_theta_risk: f64,
    pub preferred_dte: i64,
    pub dte_weight: f64,
}

impl TimeDecayOptimizer {
    fn dte_discount(&self, dte: i64) -> f64 {
        let distance = (dte - self.preferred_dte).abs() as f64;
        1.0 - self.dte_weight * distance / 100.0
    }
}

impl CombinedFilter for TimeDecayOptimizer {
    fn name(&self) -> &'static str {
        "TimeDecayOptimizer"
    }

    fn apply_combined(
        &self,
        contracts: &[OptionContract],
        spreads: &[VerticalSpread],
    ) -> (Vec<OptionContract>, Vec<VerticalSpread>) {
        let kept_contracts = contracts
            .iter()
            .filter(|c| c.theta >= self.min_daily_theta)
            .map(|c| {
                let mut adjusted = c.clone();
                adjusted.score *= self.dte_discount(c.dte);
                adjusted
            })
            .collect();

        let kept_spreads = spreads
            .iter()
            .filter(|s| {
                let net_theta = s.short_leg.theta + s.long_leg.theta;
                net_theta >= self.min_daily_theta && net_theta <= self.max_theta_risk
            })
            .map(|s| {
                let mut adjusted = s.clone();
                let avg_dte = (s.short_leg.dte + s.long_leg.dte) / 2;
                adjusted.score *= self.dte_discount(avg_dte);
                adjusted
            })
            .collect();

        (kept_contracts, kept_spreads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{contract, spread};

    #[test]
    fn test_ranking_sorts_and_truncates_copies() {
        let mut a = contract("SPY", 450.0, 0.30, 40);
        a.score = 40.0;
        let mut b = contract("SPY", 455.0, 0.30, 40);
        b.score = 90.0;
        let mut c = contract("SPY", 460.0, 0.30, 40);
        c.score = 10.0;
        let book = vec![a, b, c];

        let filter = RankingFilter {
            max_contracts: 2,
            max_spreads: 2,
            score_threshold: 20.0,
        };
        let (ranked, _) = filter.apply_combined(&book, &[]);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].score, 90.0);
        assert_eq!(ranked[1].score, 40.0);
        // Caller's ordering untouched.
        assert_eq!(book[0].score, 40.0);
        assert_eq!(book[2].score, 10.0);
    }

    #[test]
    fn test_time_decay_discounts_returned_copies_only() {
        let mut c = contract("SPY", 450.0, 0.30, 55);
        c.theta = 0.05;
        c.score = 80.0;
        let book = vec![c];

        let filter = TimeDecayOptimizer {
            min_daily_theta: 0.01,
            max_theta_risk: 1.0,
            preferred_dte: 45,
            dte_weight: 0.5,
        };
        let (kept, _) = filter.apply_combined(&book, &[]);

        assert_eq!(kept.len(), 1);
        // 10 days from preferred: 80 * (1 - 0.5 * 10 / 100) = 76
        assert!((kept[0].score - 76.0).abs() < 1e-9);
        assert_eq!(book[0].score, 80.0);
    }

    #[test]
    fn test_time_decay_drops_negative_theta_contracts() {
        let c = contract("SPY", 450.0, 0.30, 40); // theta -0.04
        let filter = TimeDecayOptimizer {
            min_daily_theta: 0.01,
            max_theta_risk: 1.0,
            preferred_dte: 45,
            dte_weight: 0.0,
        };
        let (kept, _) = filter.apply_combined(&[c], &[]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_correlation_caps_group_exposure() {
        let mut groups = HashMap::new();
        groups.insert(
            "index".to_string(),
            vec!["SPY".to_string(), "QQQ".to_string(), "IWM".to_string(), "DIA".to_string()],
        );
        let filter = CorrelationFilter {
            max_correlation: 0.50,
            symbol_groups: groups,
        };

        let spreads = vec![
            spread("SPY", 450.0, 445.0, 1.0),
            spread("QQQ", 380.0, 375.0, 1.0),
            spread("IWM", 200.0, 195.0, 1.0),
        ];
        let contracts = vec![contract("DIA", 350.0, 0.30, 40)];

        let (kept_contracts, kept_spreads) = filter.apply_combined(&contracts, &spreads);
        // Two of four group members already hold positions: a third breaches 0.50.
        assert!(kept_contracts.is_empty());
        assert_eq!(kept_spreads.len(), 2);
    }

    #[test]
    fn test_portfolio_balance_strategy_limit() {
        let mut limits = HashMap::new();
        limits.insert("vertical".to_string(), 2);
        let filter = PortfolioBalanceFilter {
            max_allocation: 1.0,
            strategy_limits: limits,
            ..PortfolioBalanceFilter::default()
        };

        let spreads = vec![
            spread("SPY", 450.0, 445.0, 1.0),
            spread("QQQ", 380.0, 375.0, 1.0),
            spread("IWM", 200.0, 195.0, 1.0),
        ];
        let (_, kept) = filter.apply_combined(&[], &spreads);
        assert!(kept.is_empty());

        let two = vec![spread("SPY", 450.0, 445.0, 1.0)];
        let (_, kept) = filter.apply_combined(&[], &two);
        assert_eq!(kept.len(), 1);
    }
}
