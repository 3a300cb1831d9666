//! TradeDesk Core
//!
//! Quantitative building blocks for the trading coordinator: domain types,
//! statistics and financial-series primitives, the pluggable algorithm
//! registry, and the confidence-weighted ensemble combiner.

pub mod algos;
pub mod domain;
pub mod ensemble;
pub mod rng;
pub mod series;
pub mod stats;
