//! Hierarchical Risk Parity, reduced to its single-asset decision rule.
//!
//! The multi-asset clustering and inverse-variance allocation collapse to a
//! Sharpe-ratio gate when only one instrument is in play: the full machinery
//! lives with the portfolio optimizer, not here.

use std::collections::BTreeMap;

use crate::algos::{
    ensure_known_options, price_series, Algorithm, AlgorithmConfig, AlgorithmKind,
    AlgorithmResult, ConfigError, Explanation, ProcessError,
};
use crate::domain::{MarketData, OrderKind, Signal};
use crate::stats;

/// Single-asset HRP reduction: buy on strong risk-adjusted returns.
pub struct HrpAlgorithm {
    explanation: Explanation,
}

impl HrpAlgorithm {
    pub fn new() -> Self {
        Self { explanation: Explanation::default() }
    }
}

impl Default for HrpAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for HrpAlgorithm {
    fn name(&self) -> &'static str {
        "Hierarchical Risk Parity"
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Hrp
    }

    fn description(&self) -> &'static str {
        "Allocates by hierarchical clustering and inverse variance; on a single asset it \
         reduces to a Sharpe-ratio decision rule"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::new()
    }

    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError> {
        ensure_known_options(&config.params, &[])
    }

    fn process(
        &mut self,
        symbol: &str,
        current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ProcessError> {
        let prices = price_series(history);
        let returns = stats::simple_returns(&prices);

        if returns.is_empty() {
            self.explanation
                .set("Insufficient historical data to make a reliable prediction using HRP.");
            return Ok(AlgorithmResult::hold(self.explanation.text()));
        }

        let mean_return = stats::mean(&returns);
        let volatility = stats::stddev(&returns);
        let sharpe = if volatility > 0.0 { mean_return / volatility } else { 0.0 };

        let result = if sharpe > 0.5 {
            self.explanation.set(format!(
                "Based on HRP analysis, {symbol} shows strong risk-adjusted returns \
                 (Sharpe: {sharpe:.2}) with moderate volatility ({:.2}%). The positive trend \
                 suggests continued upward movement.",
                volatility * 100.0
            ));
            AlgorithmResult {
                signal: Signal::Buy,
                order_kind: OrderKind::Limit,
                limit_price: Some(current.price * 0.99),
                weights: None,
                confidence: 0.7 + (sharpe / 10.0).min(0.3),
                explanation: self.explanation.text().to_string(),
            }
        } else if sharpe > 0.0 {
            self.explanation.set(format!(
                "Based on HRP analysis, {symbol} shows positive but weak risk-adjusted \
                 returns (Sharpe: {sharpe:.2}). Recommend holding current positions."
            ));
            AlgorithmResult {
                confidence: 0.6,
                ..AlgorithmResult::hold(self.explanation.text())
            }
        } else {
            self.explanation.set(format!(
                "Based on HRP analysis, {symbol} shows negative risk-adjusted returns \
                 (Sharpe: {sharpe:.2}) with volatility of {:.2}%. The negative trend suggests \
                 downward movement.",
                volatility * 100.0
            ));
            AlgorithmResult {
                signal: Signal::Sell,
                order_kind: OrderKind::Market,
                limit_price: None,
                weights: None,
                confidence: 0.6 + (sharpe.abs() / 5.0).min(0.3),
                explanation: self.explanation.text().to_string(),
            }
        };

        Ok(result)
    }

    fn explain(&self) -> &str {
        self.explanation.text()
    }
}
