//! Algorithm contract: uniform lifecycle, configuration envelope, result
//! envelope, and the factory registry.
//!
//! Every algorithm implements [`Algorithm`]: construct via the registry,
//! `configure` from an [`AlgorithmConfig`], `process` a symbol against
//! current + historical market data, and `explain` the last decision.
//! Generic option maps are accepted only at this boundary; each algorithm
//! translates them into typed options with explicit validation inside
//! `configure`.

pub mod cusum;
pub mod entropy_pooling;
pub mod frac_diff;
pub mod hrp;
pub mod indicators;
pub mod manager;
pub mod meta_labeling;
pub mod mvo;
pub mod position_sizing;
pub mod purged_cv;
pub mod registry;
pub mod seq_bootstrap;
pub mod triple_barrier;

pub use manager::{AlgorithmManager, ManagerError};
pub use registry::{AlgorithmRegistry, RegistryError};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{MarketData, OrderKind, Signal, TradeSignal};
use crate::series::barrier::BarrierError;
use crate::series::bootstrap::BootstrapError;
use crate::series::fracdiff::FracDiffError;
use crate::series::validation::ValidationError;
use crate::stats::StatsError;

// ─── Kinds ───────────────────────────────────────────────────────────

/// Stable identifier for each registered algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    Hrp,
    Mvo,
    EntropyPooling,
    CusumFilter,
    SequentialBootstrap,
    FractionalDiff,
    TripleBarrier,
    MetaLabeling,
    PurgedCv,
    PositionSizing,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 10] = [
        AlgorithmKind::Hrp,
        AlgorithmKind::Mvo,
        AlgorithmKind::EntropyPooling,
        AlgorithmKind::CusumFilter,
        AlgorithmKind::SequentialBootstrap,
        AlgorithmKind::FractionalDiff,
        AlgorithmKind::TripleBarrier,
        AlgorithmKind::MetaLabeling,
        AlgorithmKind::PurgedCv,
        AlgorithmKind::PositionSizing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmKind::Hrp => "hrp",
            AlgorithmKind::Mvo => "mvo",
            AlgorithmKind::EntropyPooling => "entropy_pooling",
            AlgorithmKind::CusumFilter => "cusum_filter",
            AlgorithmKind::SequentialBootstrap => "sequential_bootstrap",
            AlgorithmKind::FractionalDiff => "fractional_diff",
            AlgorithmKind::TripleBarrier => "triple_barrier",
            AlgorithmKind::MetaLabeling => "meta_labeling",
            AlgorithmKind::PurgedCv => "purged_cv",
            AlgorithmKind::PositionSizing => "position_sizing",
        }
    }
}

impl std::fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlgorithmKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlgorithmKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| RegistryError::UnknownKind(s.to_string()))
    }
}

// ─── Configuration ───────────────────────────────────────────────────

/// Configuration envelope shared by all algorithms.
///
/// The common fields apply broadly; `params` carries algorithm-specific
/// scalar options, validated (unknown keys rejected) by each `configure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    pub risk_aversion: f64,
    pub max_position_weight: f64,
    pub min_position_weight: f64,
    pub target_return: f64,
    pub historical_days: u32,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            risk_aversion: 2.0,
            max_position_weight: 0.3,
            min_position_weight: 0.01,
            target_return: 0.1,
            historical_days: 30,
            params: BTreeMap::new(),
        }
    }
}

impl AlgorithmConfig {
    /// Builder-style option setter, mostly for tests and presets.
    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("option {option} out of range: {reason}")]
    OutOfRange { option: String, reason: String },
}

/// Reject any option key outside the algorithm's accepted set.
pub(crate) fn ensure_known_options(
    params: &BTreeMap<String, f64>,
    accepted: &[&str],
) -> Result<(), ConfigError> {
    for key in params.keys() {
        if !accepted.contains(&key.as_str()) {
            return Err(ConfigError::UnknownOption(key.clone()));
        }
    }
    Ok(())
}

// ─── Results ─────────────────────────────────────────────────────────

/// Output of one `process` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmResult {
    pub signal: Signal,
    pub order_kind: OrderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    /// Per-asset weights, populated only by portfolio-style algorithms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<BTreeMap<String, f64>>,
    pub confidence: f64,
    pub explanation: String,
}

impl AlgorithmResult {
    /// Neutral hold at 0.5 confidence.
    pub fn hold(explanation: impl Into<String>) -> Self {
        Self {
            signal: Signal::Hold,
            order_kind: OrderKind::Market,
            limit_price: None,
            weights: None,
            confidence: 0.5,
            explanation: explanation.into(),
        }
    }

    /// Convert to a stored trade signal, stamping the current time.
    pub fn into_trade_signal(self, symbol: impl Into<String>) -> TradeSignal {
        // A market-order result never carries a limit price forward.
        let limit_price = match self.order_kind {
            OrderKind::Limit => self.limit_price,
            OrderKind::Market => None,
        };
        TradeSignal {
            symbol: symbol.into(),
            signal: self.signal,
            order_kind: self.order_kind,
            limit_price,
            timestamp: Utc::now(),
            reasoning: self.explanation,
            confidence: Some(self.confidence),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum ProcessError {
    #[error("insufficient historical data: got {got}, need at least {need}")]
    InsufficientHistory { got: usize, need: usize },

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    FracDiff(#[from] FracDiffError),

    #[error(transparent)]
    Barrier(#[from] BarrierError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("volatility must be positive, got {0}")]
    NonPositiveVolatility(f64),

    /// A composed primary stage failed to build or configure.
    #[error("primary algorithm failed: {0}")]
    Primary(String),
}

// ─── Lifecycle ───────────────────────────────────────────────────────

/// Uniform algorithm lifecycle: construct, configure, process, explain.
///
/// # Invariants
/// - `configure` never partially applies: on error the previous options
///   remain in force.
/// - `process` is serial on a given instance; instances are `Send` but not
///   shared between threads. Factories hand out distinct instances for
///   concurrent callers.
/// - `explain` returns the explanation computed by the most recent
///   `process` call.
pub trait Algorithm: Send {
    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// Registry tag.
    fn kind(&self) -> AlgorithmKind;

    /// One-paragraph description.
    fn description(&self) -> &'static str;

    /// Accepted option names with a short description of each.
    fn parameters(&self) -> BTreeMap<&'static str, &'static str>;

    /// Apply a configuration envelope, validating every option.
    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError>;

    /// Produce a trading decision for `symbol`.
    fn process(
        &mut self,
        symbol: &str,
        current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ProcessError>;

    /// Explanation computed on the last `process`.
    fn explain(&self) -> &str;
}

/// Last-run bookkeeping embedded in each algorithm.
#[derive(Debug, Clone, Default)]
pub struct Explanation {
    text: String,
    last_run: Option<DateTime<Utc>>,
}

impl Explanation {
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.last_run = Some(Utc::now());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }
}

/// Closing prices out of a market-data history.
pub(crate) fn price_series(history: &[MarketData]) -> Vec<f64> {
    history.iter().map(|d| d.price).collect()
}
