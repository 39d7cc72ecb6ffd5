//! # Option Filter Framework
//!
//! Composable filtering pipeline for option contracts and vertical spreads.
//!
//! ## Description
//! Provides the filter traits, a declarative [`FilterConfig`], a fluent
//! [`FilterBuilder`] with strategy presets, and a [`FilterChain`] orchestrator
//! that runs registered filters sequentially or in parallel with per-filter
//! execution statistics. Result caching, batch fan-out, and streaming
//! processing sit on top of the chain.
//!
//! ## Pipeline (in order)
//! 1. **Contract filters** - narrow the option book per contract
//! 2. **Spread filters** - accept or reject assembled vertical spreads
//! 3. **Combined filters** - portfolio-level passes over both populations
//!
//! Every entry point is side-effect-free on its arguments: filters return
//! fresh vectors and never mutate caller-owned records.
//!
//! ## References
//! - IEEE Std 1016-2009: Software Design Descriptions

pub mod batch;
pub mod builder;
pub mod cache;
pub mod chain;
pub mod combined;
pub mod config;
pub mod contract_filters;
pub mod spread_filters;

pub use batch::{BatchProcessor, BatchProgress, StreamingProcessor};
pub use builder::{presets, FilterBuilder};
pub use cache::{CacheStats, FilterCache};
pub use chain::{FilterChain, FilterStats, StatsRegistry};
pub use config::{CombinedFilter, ContractFilter, FilterConfig, FilterError, SpreadFilter};
