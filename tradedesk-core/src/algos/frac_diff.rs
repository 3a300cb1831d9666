//! Fractional differentiation as a pipeline stage.
//!
//! A data-preparation algorithm, not a signal generator: it differences the
//! price history and always reports hold, with the transformed head of the
//! series in the explanation.

use std::collections::BTreeMap;

use crate::algos::{
    ensure_known_options, price_series, Algorithm, AlgorithmConfig, AlgorithmKind,
    AlgorithmResult, ConfigError, Explanation, ProcessError,
};
use crate::domain::MarketData;
use crate::series::fracdiff::{ffd, fixed_width_frac_diff};

#[derive(Debug, Clone, PartialEq)]
struct FracDiffOptions {
    d: f64,
    threshold: f64,
    window_size: usize,
    use_fixed_width: bool,
}

impl Default for FracDiffOptions {
    fn default() -> Self {
        Self { d: 0.5, threshold: 1e-5, window_size: 10, use_fixed_width: false }
    }
}

impl FracDiffOptions {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, ConfigError> {
        ensure_known_options(&config.params, &["d", "threshold", "window_size", "use_fixed_width"])?;

        let mut options = Self::default();
        if let Some(&d) = config.params.get("d") {
            if !(0.0..=1.0).contains(&d) {
                return Err(ConfigError::OutOfRange {
                    option: "d".into(),
                    reason: "must be between 0 and 1".into(),
                });
            }
            options.d = d;
        }
        if let Some(&threshold) = config.params.get("threshold") {
            if threshold <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    option: "threshold".into(),
                    reason: "must be positive".into(),
                });
            }
            options.threshold = threshold;
        }
        if let Some(&window) = config.params.get("window_size") {
            if window < 1.0 {
                return Err(ConfigError::OutOfRange {
                    option: "window_size".into(),
                    reason: "must be at least 1".into(),
                });
            }
            options.window_size = window as usize;
        }
        if let Some(&flag) = config.params.get("use_fixed_width") {
            options.use_fixed_width = flag > 0.5;
        }
        Ok(options)
    }
}

/// Differencing stage: stationarity with memory preservation.
pub struct FractionalDiffAlgorithm {
    options: FracDiffOptions,
    explanation: Explanation,
}

impl FractionalDiffAlgorithm {
    pub fn new() -> Self {
        Self { options: FracDiffOptions::default(), explanation: Explanation::default() }
    }
}

impl Default for FractionalDiffAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for FractionalDiffAlgorithm {
    fn name(&self) -> &'static str {
        "Fractional Differentiation"
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::FractionalDiff
    }

    fn description(&self) -> &'static str {
        "Fractionally differences a price series to make it stationary while preserving \
         long-range memory"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("d", "Differencing parameter between 0 and 1 (default: 0.5)"),
            ("threshold", "Minimum weight magnitude for the FFD method (default: 1e-5)"),
            ("window_size", "Window for the fixed-width method (default: 10)"),
            ("use_fixed_width", "Fixed-width window (1) or FFD (0) (default: 0)"),
        ])
    }

    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError> {
        self.options = FracDiffOptions::from_config(config)?;
        Ok(())
    }

    fn process(
        &mut self,
        _symbol: &str,
        _current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ProcessError> {
        if history.len() < 2 {
            return Err(ProcessError::InsufficientHistory { got: history.len(), need: 2 });
        }

        let prices = price_series(history);
        let diffed = if self.options.use_fixed_width {
            fixed_width_frac_diff(&prices, self.options.d, self.options.window_size)?
        } else {
            ffd(&prices, self.options.d, self.options.threshold)?
        };

        let mut text = String::from("Fractional differentiation applied to price series ");
        if self.options.use_fixed_width {
            text.push_str(&format!(
                "using fixed-width window approach with window size {}",
                self.options.window_size
            ));
        } else {
            text.push_str(&format!(
                "using FFD method with weight threshold {:.5}",
                self.options.threshold
            ));
        }
        text.push_str(&format!(" and d={:.2}", self.options.d));

        if !diffed.is_empty() {
            let head: Vec<String> =
                diffed.iter().take(5).map(|v| format!("{v:.4}")).collect();
            text.push_str(&format!("\nFirst few differenced values: [{}]", head.join(", ")));
        }
        self.explanation.set(text);

        // A transformation stage never trades on its own output.
        Ok(AlgorithmResult::hold(self.explanation.text()))
    }

    fn explain(&self) -> &str {
        self.explanation.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Signal;

    fn history_from_prices(prices: &[f64]) -> Vec<MarketData> {
        prices
            .iter()
            .map(|&p| MarketData { symbol: "SPY".into(), price: p, ..MarketData::default() })
            .collect()
    }

    #[test]
    fn always_holds() {
        let mut alg = FractionalDiffAlgorithm::new();
        let prices: Vec<f64> = (1..=30).map(|v| v as f64).collect();
        let history = history_from_prices(&prices);
        let current = history.last().unwrap().clone();
        let result = alg.process("SPY", &current, &history).unwrap();
        assert_eq!(result.signal, Signal::Hold);
        assert_eq!(result.confidence, 0.5);
        assert!(result.explanation.contains("FFD method"));
    }

    #[test]
    fn fixed_width_variant_runs() {
        let mut alg = FractionalDiffAlgorithm::new();
        alg.configure(
            &AlgorithmConfig::default()
                .with_param("use_fixed_width", 1.0)
                .with_param("window_size", 3.0),
        )
        .unwrap();
        let prices: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let history = history_from_prices(&prices);
        let current = history.last().unwrap().clone();
        let result = alg.process("SPY", &current, &history).unwrap();
        assert!(result.explanation.contains("fixed-width window"));
    }

    #[test]
    fn invalid_d_is_rejected() {
        let mut alg = FractionalDiffAlgorithm::new();
        let err = alg.configure(&AlgorithmConfig::default().with_param("d", 1.5)).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn short_history_errors() {
        let mut alg = FractionalDiffAlgorithm::new();
        let history = history_from_prices(&[100.0]);
        assert!(matches!(
            alg.process("SPY", &history[0], &history),
            Err(ProcessError::InsufficientHistory { .. })
        ));
    }
}
