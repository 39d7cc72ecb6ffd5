//! # Scanner Data Model
//!
//! Shared types for the option scanning pipeline.
//!
//! ## Description
//! Defines the option contract and vertical spread records consumed by the
//! filter chain, scoring engine, and Greeks risk analyzer. Records arrive
//! fully populated from the market-data layer; nothing in this crate fetches
//! data. Identity semantics matter here: two contracts that share a symbol
//! but differ in strike, expiry, or right are distinct instruments, and the
//! filter chain's parallel mode depends on that distinction.

pub mod contract;
pub mod spread;

pub use contract::{ContractKey, OptionContract, OptionType};
pub use spread::{ScanResult, SpreadType, VerticalSpread};
