//! Mean-Variance Optimization, reduced to a single-asset utility rule.
//!
//! With one instrument the quadratic program collapses to evaluating
//! `utility = mu - (lambda / 2) * sigma^2` and the Sharpe ratio.

use std::collections::BTreeMap;

use crate::algos::{
    ensure_known_options, price_series, Algorithm, AlgorithmConfig, AlgorithmKind,
    AlgorithmResult, ConfigError, Explanation, ProcessError,
};
use crate::domain::{MarketData, OrderKind, Signal};
use crate::stats;

#[derive(Debug, Clone, PartialEq)]
struct MvoOptions {
    min_sharpe: f64,
    risk_aversion: f64,
}

impl MvoOptions {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, ConfigError> {
        ensure_known_options(&config.params, &["min_sharpe"])?;

        let mut min_sharpe = 0.5;
        if let Some(&value) = config.params.get("min_sharpe") {
            if value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    option: "min_sharpe".into(),
                    reason: "must be non-negative".into(),
                });
            }
            min_sharpe = value;
        }
        Ok(Self { min_sharpe, risk_aversion: config.risk_aversion })
    }
}

/// Single-asset mean-variance rule: buy when risk-adjusted return clears
/// the bar and utility is positive.
pub struct MvoAlgorithm {
    options: MvoOptions,
    explanation: Explanation,
}

impl MvoAlgorithm {
    pub fn new() -> Self {
        Self {
            options: MvoOptions { min_sharpe: 0.5, risk_aversion: 2.0 },
            explanation: Explanation::default(),
        }
    }
}

impl Default for MvoAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for MvoAlgorithm {
    fn name(&self) -> &'static str {
        "Mean-Variance Optimization"
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Mvo
    }

    fn description(&self) -> &'static str {
        "Balances expected return against variance; on a single asset it reduces to a \
         Sharpe-and-utility decision rule"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([("min_sharpe", "Minimum Sharpe ratio for a buy signal (default: 0.5)")])
    }

    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError> {
        self.options = MvoOptions::from_config(config)?;
        Ok(())
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
                .set("Insufficient historical data to perform Mean-Variance Optimization analysis.");
            return Ok(AlgorithmResult::hold(self.explanation.text()));
        }

        let expected_return = stats::mean(&returns);
        let risk = stats::stddev(&returns);
        let sharpe = if risk > 0.0 { expected_return / risk } else { 0.0 };
        let utility = expected_return - self.options.risk_aversion * risk * risk / 2.0;

        let result = if sharpe > self.options.min_sharpe && utility > 0.0 {
            self.explanation.set(format!(
                "Based on MVO analysis, {symbol} shows a favorable risk-return profile with \
                 Sharpe ratio of {sharpe:.2} and utility of {utility:.4}. Expected return \
                 ({:.2}%) outweighs risk ({:.2}%) given risk aversion of {:.1}.",
                expected_return * 100.0,
                risk * 100.0,
                self.options.risk_aversion
            ));
            AlgorithmResult {
                signal: Signal::Buy,
                order_kind: OrderKind::Limit,
                limit_price: Some(current.price * 0.99),
                weights: None,
                confidence: 0.65 + (sharpe / 4.0).min(0.25),
                explanation: self.explanation.text().to_string(),
            }
        } else if sharpe > 0.0 && utility >= -0.001 {
            self.explanation.set(format!(
                "Based on MVO analysis, {symbol} shows a moderate risk-return profile with \
                 Sharpe ratio of {sharpe:.2} and utility of {utility:.4}. Current position \
                 should be maintained."
            ));
            AlgorithmResult {
                confidence: 0.6,
                ..AlgorithmResult::hold(self.explanation.text())
            }
        } else {
            self.explanation.set(format!(
                "Based on MVO analysis, {symbol} shows an unfavorable risk-return profile \
                 with Sharpe ratio of {sharpe:.2} and utility of {utility:.4}. Expected \
                 return ({:.2}%) does not compensate for risk ({:.2}%).",
                expected_return * 100.0,
                risk * 100.0
            ));
            AlgorithmResult {
                signal: Signal::Sell,
                order_kind: OrderKind::Market,
                limit_price: None,
                weights: None,
                confidence: (0.7 - sharpe.min(0.2)).clamp(0.0, 0.95),
                explanation: self.explanation.text().to_string(),
            }
        };

        Ok(result)
    }

    fn explain(&self) -> &str {
        self.explanation.text()
    }
}
