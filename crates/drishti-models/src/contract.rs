//! # Option Contract Record
//!
//! Fully-populated option contract as produced by the market-data layer.
//!
//! ## Description
//! A contract carries quoted market data, broker-supplied Greeks, implied
//! volatility statistics, and fields derived at ingestion time (DTE,
//! bid-ask spread, moneyness). The `score` field is written only by the
//! scoring engine, and only on owned copies — filtering never mutates a
//! caller's records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Classification of the option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionType {
    /// Right to buy.
    Call,
    /// Right to sell.
    Put,
}

/// A single option contract with market data, Greeks, and derived fields.
///
/// # Fields
/// * `symbol` - Exchange ticker for the contract.
/// * `strike` - Exercise price.
/// * `expiry` - Contract expiration date.
/// * `option_type` - Call or Put.
/// * `dte` - Days to expiration, derived against a scan-time "today".
/// * `score` - Ranking score written by the scoring engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    // Identification
    pub symbol: String,
    pub contract_id: String,
    pub underlying: String,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub option_type: OptionType,

    // Market data
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub volume: i64,
    pub open_interest: i64,

    // Greeks
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,

    // Implied volatility
    pub iv: f64,
    pub iv_rank: f64,
    pub iv_percentile: f64,

    // Derived fields
    pub dte: i64,
    pub bid_ask_spread: f64,
    pub moneyness: f64,

    /// Ranking score, written by the scoring engine on owned copies.
    pub score: f64,

    pub last_update: DateTime<Utc>,
}

impl OptionContract {
    /// Full contract identity.
    ///
    /// Symbol alone is not an identity: the same underlying lists many
    /// strikes, expiries, and both rights. The parallel filter mode
    /// intersects per-filter survivors by this key.
    pub fn key(&self) -> ContractKey {
        ContractKey {
            symbol: self.symbol.clone(),
            strike_bits: self.strike.to_bits(),
            expiry: self.expiry,
            option_type: self.option_type,
        }
    }

    /// Recomputes days-to-expiration against the supplied date.
    ///
    /// # Returns
    /// The new DTE; negative once the contract has expired.
    pub fn recompute_dte(&mut self, today: NaiveDate) -> i64 {
        self.dte = (self.expiry - today).num_days();
        self.dte
    }

    /// Quoted bid-ask spread, recomputed from the current quote.
    pub fn recompute_bid_ask_spread(&mut self) -> f64 {
        self.bid_ask_spread = (self.ask - self.bid).max(0.0);
        self.bid_ask_spread
    }

    /// Quote midpoint, falling back to the bid when the ask is unusable.
    pub fn mid(&self) -> f64 {
        if self.ask > 0.0 && self.ask.is_finite() {
            0.5 * (self.bid + self.ask)
        } else {
            self.bid
        }
    }
}

/// Hashable identity key for an option contract.
///
/// The strike is carried as its IEEE-754 bit pattern so the key is
/// `Eq + Hash` without tolerance games; contracts originate from a single
/// feed, so equal strikes are bit-identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractKey {
    pub symbol: String,
    pub strike_bits: u64,
    pub expiry: NaiveDate,
    pub option_type: OptionType,
}
