//! CUSUM filter: structural-break detection on standardized returns.
//!
//! The positive and negative cumulative sums persist across `process` calls
//! on one instance, so an instance belongs to a single symbol. Sharing one
//! across symbols would mix their drift state.

use std::collections::BTreeMap;

use crate::algos::{
    ensure_known_options, price_series, Algorithm, AlgorithmConfig, AlgorithmKind,
    AlgorithmResult, ConfigError, Explanation, ProcessError,
};
use crate::domain::{MarketData, OrderKind, Signal};
use crate::stats;

#[derive(Debug, Clone, PartialEq)]
struct CusumOptions {
    threshold: f64,
    drift: f64,
}

impl Default for CusumOptions {
    fn default() -> Self {
        Self { threshold: 1.0, drift: 0.02 }
    }
}

impl CusumOptions {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, ConfigError> {
        ensure_known_options(&config.params, &["threshold", "drift"])?;

        let mut options = Self::default();
        if let Some(&threshold) = config.params.get("threshold") {
            if threshold <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    option: "threshold".into(),
                    reason: "must be positive".into(),
                });
            }
            options.threshold = threshold;
        }
        if let Some(&drift) = config.params.get("drift") {
            if drift < 0.0 {
                return Err(ConfigError::OutOfRange {
                    option: "drift".into(),
                    reason: "must be non-negative".into(),
                });
            }
            options.drift = drift;
        }
        Ok(options)
    }
}

/// Cumulative-sum control chart over standardized log returns.
pub struct CusumFilter {
    options: CusumOptions,
    sp_prev: f64,
    sn_prev: f64,
    explanation: Explanation,
}

impl CusumFilter {
    pub fn new() -> Self {
        Self {
            options: CusumOptions::default(),
            sp_prev: 0.0,
            sn_prev: 0.0,
            explanation: Explanation::default(),
        }
    }
}

impl Default for CusumFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn floor_to_cent(price: f64) -> f64 {
    (price * 100.0).floor() / 100.0
}

impl Algorithm for CusumFilter {
    fn name(&self) -> &'static str {
        "CUSUM Filter"
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::CusumFilter
    }

    fn description(&self) -> &'static str {
        "Detects structural breaks in a return series using cumulative sum control charts"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("threshold", "Cumulative sum level that triggers a signal (default: 1.0)"),
            ("drift", "Expected drift subtracted each step (default: 0.02)"),
        ])
    }

    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError> {
        self.options = CusumOptions::from_config(config)?;
        // A reconfiguration restarts the accumulation.
        self.sp_prev = 0.0;
        self.sn_prev = 0.0;
        Ok(())
    }

    fn process(
        &mut self,
        _symbol: &str,
        current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ProcessError> {
        if history.len() < 2 {
            return Err(ProcessError::InsufficientHistory { got: history.len(), need: 2 });
        }

        let prices = price_series(history);
        let returns = stats::log_returns(&prices);
        let mean = stats::mean(&returns);
        let sd = stats::stddev(&returns);

        let last = returns[returns.len() - 1];
        let z = if sd > 0.0 { (last - mean) / sd } else { 0.0 };

        let sp = (self.sp_prev + z - self.options.drift).max(0.0);
        let sn = (self.sn_prev - z - self.options.drift).max(0.0);
        self.sp_prev = sp;
        self.sn_prev = sn;

        let result = if sp > self.options.threshold {
            let limit = floor_to_cent(current.price * 0.99);
            self.explanation.set(format!(
                "CUSUM positive drift detected (sp: {sp:.4}) exceeding threshold of {:.2}, \
                 indicating potential upward trend",
                self.options.threshold
            ));
            AlgorithmResult {
                signal: Signal::Buy,
                order_kind: OrderKind::Limit,
                limit_price: Some(limit),
                weights: None,
                confidence: (0.5 + sp / 10.0).min(0.95),
                explanation: self.explanation.text().to_string(),
            }
        } else if sn > self.options.threshold {
            let limit = floor_to_cent(current.price * 1.01);
            self.explanation.set(format!(
                "CUSUM negative drift detected (sn: {sn:.4}) exceeding threshold of {:.2}, \
                 indicating potential downward trend",
                self.options.threshold
            ));
            AlgorithmResult {
                signal: Signal::Sell,
                order_kind: OrderKind::Limit,
                limit_price: Some(limit),
                weights: None,
                confidence: (0.5 + sn / 10.0).min(0.95),
                explanation: self.explanation.text().to_string(),
            }
        } else {
            self.explanation.set(format!(
                "No significant drift detected (sp: {sp:.4}, sn: {sn:.4}), threshold: {:.2}",
                self.options.threshold
            ));
            AlgorithmResult::hold(self.explanation.text())
        };

        Ok(result)
    }

    fn explain(&self) -> &str {
        self.explanation.text()
    }
}
