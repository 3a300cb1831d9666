//! Triple-barrier labeling as a trading signal.
//!
//! Synthesizes daily timestamps back from now (market snapshots carry no
//! time of their own), estimates volatility, labels the history, and trades
//! in the direction of the most recent label.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};

use crate::algos::{
    ensure_known_options, price_series, Algorithm, AlgorithmConfig, AlgorithmKind,
    AlgorithmResult, ConfigError, Explanation, ProcessError,
};
use crate::domain::{MarketData, OrderKind, Signal};
use crate::series::barrier::{apply_triple_barrier, Label, TripleBarrierConfig};
use crate::stats;

impl TripleBarrierConfig {
    fn from_algorithm_config(config: &AlgorithmConfig) -> Result<Self, ConfigError> {
        ensure_known_options(
            &config.params,
            &["profit_taking", "stop_loss", "time_horizon", "volatility_lookback"],
        )?;

        let mut options = Self::default();
        if let Some(&value) = config.params.get("profit_taking") {
            if value <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    option: "profit_taking".into(),
                    reason: "must be positive".into(),
                });
            }
            options.profit_taking = value;
        }
        if let Some(&value) = config.params.get("stop_loss") {
            if value <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    option: "stop_loss".into(),
                    reason: "must be positive".into(),
                });
            }
            options.stop_loss = value;
        }
        if let Some(&value) = config.params.get("time_horizon") {
            if value < 1.0 {
                return Err(ConfigError::OutOfRange {
                    option: "time_horizon".into(),
                    reason: "must be at least 1".into(),
                });
            }
            options.time_horizon = value as usize;
        }
        if let Some(&value) = config.params.get("volatility_lookback") {
            if value < 1.0 {
                return Err(ConfigError::OutOfRange {
                    option: "volatility_lookback".into(),
                    reason: "must be at least 1".into(),
                });
            }
            options.volatility_lookback = value as usize;
        }
        Ok(options)
    }
}

/// First-barrier-hit labeling turned into a market signal.
pub struct TripleBarrierAlgorithm {
    config: TripleBarrierConfig,
    explanation: Explanation,
}

impl TripleBarrierAlgorithm {
    pub fn new() -> Self {
        Self { config: TripleBarrierConfig::default(), explanation: Explanation::default() }
    }
}

impl Default for TripleBarrierAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for TripleBarrierAlgorithm {
    fn name(&self) -> &'static str {
        "Triple Barrier Method"
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::TripleBarrier
    }

    fn description(&self) -> &'static str {
        "Labels price history by the first of a profit-taking, stop-loss, or time barrier to \
         be hit, then trades the most recent label"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("profit_taking", "Upper barrier width as a volatility multiple (default: 2.0)"),
            ("stop_loss", "Lower barrier width as a volatility multiple (default: 1.0)"),
            ("time_horizon", "Vertical barrier in bars (default: 5)"),
            ("volatility_lookback", "Volatility estimation window in bars (default: 20)"),
        ])
    }

    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError> {
        self.config = TripleBarrierConfig::from_algorithm_config(config)?;
        Ok(())
    }

    fn process(
        &mut self,
        _symbol: &str,
        _current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ProcessError> {
        let lookback = self.config.volatility_lookback;
        if history.len() < lookback {
            return Err(ProcessError::InsufficientHistory { got: history.len(), need: lookback });
        }

        let prices = price_series(history);
        // Market snapshots have no timestamps: assume daily spacing ending now.
        let base = Utc::now() - Duration::days(prices.len() as i64);
        let times: Vec<_> = (0..prices.len()).map(|i| base + Duration::days(i as i64)).collect();

        let volatility = stats::daily_volatility(&prices, lookback)?;
        let results = apply_triple_barrier(&prices, &times, volatility, &self.config)?;

        let Some(latest) = results.last() else {
            self.explanation.set("Triple barrier method did not generate any labels");
            return Ok(AlgorithmResult::hold(self.explanation.text()));
        };

        let mut text = format!(
            "Triple barrier method applied with profit-taking={:.2}, stop-loss={:.2}, \
             time-horizon={} days.\n",
            self.config.profit_taking, self.config.stop_loss, self.config.time_horizon
        );
        text.push_str(&format!(
            "Entry at {:.2} on {}, exit at {:.2} on {}.\n",
            latest.entry_price,
            latest.entry_time.format("%Y-%m-%d"),
            latest.exit_price,
            latest.exit_time.format("%Y-%m-%d")
        ));
        text.push_str(&format!(
            "Barrier hit: {:?}, resulting label: {}",
            latest.barrier_hit,
            latest.label.as_i8()
        ));
        self.explanation.set(text);

        let result = match latest.label {
            Label::Buy => AlgorithmResult {
                signal: Signal::Buy,
                order_kind: OrderKind::Market,
                limit_price: None,
                weights: None,
                confidence: 0.7,
                explanation: self.explanation.text().to_string(),
            },
            Label::Sell => AlgorithmResult {
                signal: Signal::Sell,
                order_kind: OrderKind::Market,
                limit_price: None,
                weights: None,
                confidence: 0.7,
                explanation: self.explanation.text().to_string(),
            },
            Label::Hold => AlgorithmResult::hold(self.explanation.text()),
        };

        Ok(result)
    }

    fn explain(&self) -> &str {
        self.explanation.text()
    }
}
