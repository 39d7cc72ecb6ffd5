//! # Vertical Spread Record
//!
//! Two-leg vertical spread candidate and scan result envelope.
//!
//! ## Description
//! A vertical spread pairs a short and a long contract of the same right
//! and expiry at different strikes. The spread is the unit the scoring
//! engine and Greeks analyzer operate on. `max_loss()` defines validity:
//! a candidate whose max loss is not positive is malformed and must be
//! filtered out, never scored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::OptionContract;

/// Whether the spread was opened for a net credit or net debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpreadType {
    Credit,
    Debit,
}

/// A vertical spread candidate produced by the spread constructor.
///
/// # Fields
/// * `short_leg` / `long_leg` - The sold and bought contracts.
/// * `credit` - Net premium received (short premium minus long premium).
/// * `prob_of_profit` - Model probability the spread expires profitable.
/// * `underlying_price` - Spot price of the underlying at scan time.
/// * `score` - Ranking score written by the scoring engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerticalSpread {
    pub symbol: String,
    pub short_leg: OptionContract,
    pub long_leg: OptionContract,
    pub spread_type: SpreadType,

    // Spread economics
    pub credit: f64,
    pub net_debit: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub breakeven: f64,
    pub prob_of_profit: f64,

    // Combined Greeks snapshot from construction time
    pub net_delta: f64,
    pub net_theta: f64,
    pub net_vega: f64,

    pub underlying_price: f64,
    pub score: f64,
}

impl VerticalSpread {
    /// Strike distance between the legs.
    pub fn width(&self) -> f64 {
        (self.short_leg.strike - self.long_leg.strike).abs()
    }

    /// Maximum loss per contract: strike width on 100 shares minus the
    /// credit collected.
    pub fn computed_max_loss(&self) -> f64 {
        self.width() * 100.0 - self.credit
    }

    /// A spread is valid only when its legs differ in strike and its max
    /// loss is positive. Invalid spreads are filtered, never scored.
    pub fn is_valid(&self) -> bool {
        self.short_leg.strike != self.long_leg.strike && self.computed_max_loss() > 0.0
    }

    /// Net theta of the position (short minus long).
    pub fn computed_net_theta(&self) -> f64 {
        self.short_leg.theta - self.long_leg.theta
    }

    /// Net vega of the position (short minus long).
    pub fn computed_net_vega(&self) -> f64 {
        self.short_leg.vega - self.long_leg.vega
    }
}

/// Result envelope for one scan pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub spreads: Vec<VerticalSpread>,
    pub total_found: usize,
    pub filtered: usize,
    pub duration_ms: u64,
}

impl ScanResult {
    /// Builds a result envelope for survivors of a scan over `total_found`
    /// candidates.
    pub fn new(symbol: String, spreads: Vec<VerticalSpread>, total_found: usize, duration_ms: u64) -> Self {
        let filtered = total_found.saturating_sub(spreads.len());
        Self {
            scan_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            symbol,
            spreads,
            total_found,
            filtered,
            duration_ms,
        }
    }
}
