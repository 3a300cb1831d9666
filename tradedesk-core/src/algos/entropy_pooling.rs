//! Entropy pooling, reduced to a prior/view blend on a single asset.
//!
//! The relative-entropy optimization over scenario probabilities collapses
//! to a confidence-weighted average of the historical mean return (prior)
//! and a short-window mean (view), cross-checked against momentum and the
//! volatility trend.

use std::collections::BTreeMap;

use crate::algos::{
    ensure_known_options, price_series, Algorithm, AlgorithmConfig, AlgorithmKind,
    AlgorithmResult, ConfigError, Explanation, ProcessError,
};
use crate::domain::{MarketData, OrderKind, Signal};
use crate::stats;

const SHORT_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq)]
struct EntropyPoolingOptions {
    view_confidence: f64,
}

impl EntropyPoolingOptions {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, ConfigError> {
        ensure_known_options(&config.params, &["view_confidence"])?;

        let mut view_confidence = 0.5;
        if let Some(&value) = config.params.get("view_confidence") {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    option: "view_confidence".into(),
                    reason: "must be between 0 and 1".into(),
                });
            }
            view_confidence = value;
        }
        Ok(Self { view_confidence })
    }
}

/// Prior/view blending rule with momentum and volatility-trend gates.
pub struct EntropyPoolingAlgorithm {
    options: EntropyPoolingOptions,
    explanation: Explanation,
}

impl EntropyPoolingAlgorithm {
    pub fn new() -> Self {
        Self {
            options: EntropyPoolingOptions { view_confidence: 0.5 },
            explanation: Explanation::default(),
        }
    }
}

impl Default for EntropyPoolingAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for EntropyPoolingAlgorithm {
    fn name(&self) -> &'static str {
        "Entropy Pooling"
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::EntropyPooling
    }

    fn description(&self) -> &'static str {
        "Blends prior return beliefs with recent market views while minimizing distributional \
         distortion; on a single asset it reduces to a confidence-weighted mean blend"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([(
            "view_confidence",
            "Weight given to the short-window view versus the historical prior (default: 0.5)",
        )])
    }

    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError> {
        self.options = EntropyPoolingOptions::from_config(config)?;
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
                .set("Insufficient historical data to perform Entropy Pooling analysis.");
            return Ok(AlgorithmResult::hold(self.explanation.text()));
        }

        let prior_mean = stats::mean(&returns);
        let volatility = stats::stddev(&returns);

        let short = if returns.len() > SHORT_WINDOW {
            &returns[returns.len() - SHORT_WINDOW..]
        } else {
            &returns[..]
        };
        let view_mean = stats::mean(short);
        let short_vol = stats::stddev(short);
        let vol_trend = if volatility > 0.0 { short_vol / volatility } else { 1.0 };

        let momentum =
            if prices[0] > 0.0 { (prices[prices.len() - 1] - prices[0]) / prices[0] } else { 0.0 };

        let vc = self.options.view_confidence;
        let adjusted_return = prior_mean * (1.0 - vc) + view_mean * vc;

        let result = if adjusted_return > 0.0 && momentum > 0.0 && vol_trend <= 1.1 {
            self.explanation.set(format!(
                "Based on Entropy Pooling analysis, {symbol} shows positive return \
                 expectations ({:.2}%) with favorable momentum ({:.2}%) and stable volatility \
                 trends. Market sentiment analysis indicates a probability of upward movement.",
                adjusted_return * 100.0,
                momentum * 100.0
            ));
            AlgorithmResult {
                signal: Signal::Buy,
                order_kind: OrderKind::Limit,
                limit_price: Some(current.price * 0.99),
                weights: None,
                confidence: 0.65 + momentum.min(0.3),
                explanation: self.explanation.text().to_string(),
            }
        } else if adjusted_return > 0.0 && vol_trend > 1.1 {
            self.explanation.set(format!(
                "Based on Entropy Pooling analysis, {symbol} shows positive adjusted returns \
                 ({:.2}%) but increasing volatility (trend: {vol_trend:.2}). Current market \
                 conditions suggest holding existing positions.",
                adjusted_return * 100.0
            ));
            AlgorithmResult {
                confidence: 0.6,
                ..AlgorithmResult::hold(self.explanation.text())
            }
        } else if adjusted_return < 0.0 && momentum < 0.0 {
            self.explanation.set(format!(
                "Based on Entropy Pooling analysis, {symbol} shows negative return \
                 expectations ({:.2}%) with negative momentum ({:.2}%). Market sentiment \
                 analysis indicates a high probability of continued downward movement.",
                adjusted_return * 100.0,
                momentum * 100.0
            ));
            AlgorithmResult {
                signal: Signal::Sell,
                order_kind: OrderKind::Market,
                limit_price: None,
                weights: None,
                confidence: 0.7 + momentum.abs().min(0.2),
                explanation: self.explanation.text().to_string(),
            }
        } else {
            self.explanation.set(format!(
                "Based on Entropy Pooling analysis, {symbol} shows mixed signals with \
                 adjusted returns of {:.2}% and momentum of {:.2}%. Entropy-adjusted \
                 probability distribution doesn't provide a clear directional signal.",
                adjusted_return * 100.0,
                momentum * 100.0
            ));
            AlgorithmResult::hold(self.explanation.text())
        };

        Ok(result)
    }

    fn explain(&self) -> &str {
        self.explanation.text()
    }
}
