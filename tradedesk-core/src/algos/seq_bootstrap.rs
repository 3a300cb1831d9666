//! Sequential-bootstrap trading signal.
//!
//! Samples recent bars by label uniqueness and votes on the next-bar
//! direction of the sampled labels. Draws are reproducible: a master seed
//! option expands into per-call sub-seeds, so repeated calls resample
//! without repeating themselves.

use std::collections::BTreeMap;

use crate::algos::{
    ensure_known_options, Algorithm, AlgorithmConfig, AlgorithmKind, AlgorithmResult,
    ConfigError, Explanation, ProcessError,
};
use crate::domain::{MarketData, OrderKind, Signal};
use crate::rng::SeedSequence;
use crate::series::bootstrap::{seq_bootstrap, standard_bootstrap, IndicatorMatrix};
use crate::stats;

const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq)]
struct SeqBootstrapOptions {
    lookback_period: usize,
    confidence_threshold: f64,
    use_sequential: bool,
    /// None samples one draw per label in the lookback window.
    sample_size: Option<usize>,
    seed: u64,
}

impl Default for SeqBootstrapOptions {
    fn default() -> Self {
        Self {
            lookback_period: 20,
            confidence_threshold: 0.65,
            use_sequential: true,
            sample_size: None,
            seed: DEFAULT_SEED,
        }
    }
}

impl SeqBootstrapOptions {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, ConfigError> {
        ensure_known_options(
            &config.params,
            &["lookback_period", "confidence_threshold", "use_sequential", "sample_size", "seed"],
        )?;

        let mut options = Self::default();
        if let Some(&value) = config.params.get("lookback_period") {
            if value < 1.0 {
                return Err(ConfigError::OutOfRange {
                    option: "lookback_period".into(),
                    reason: "must be at least 1".into(),
                });
            }
            options.lookback_period = value as usize;
        }
        if let Some(&value) = config.params.get("confidence_threshold") {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    option: "confidence_threshold".into(),
                    reason: "must be between 0 and 1".into(),
                });
            }
            options.confidence_threshold = value;
        }
        if let Some(&value) = config.params.get("use_sequential") {
            options.use_sequential = value > 0.5;
        }
        if let Some(&value) = config.params.get("sample_size") {
            if value < 1.0 {
                return Err(ConfigError::OutOfRange {
                    option: "sample_size".into(),
                    reason: "must be at least 1".into(),
                });
            }
            options.sample_size = Some(value as usize);
        }
        if let Some(&value) = config.params.get("seed") {
            options.seed = value as u64;
        }
        Ok(options)
    }
}

/// Uniqueness-weighted bootstrap vote over the recent window.
pub struct SequentialBootstrapAlgorithm {
    options: SeqBootstrapOptions,
    seeds: SeedSequence,
    draw: u64,
    explanation: Explanation,
}

impl SequentialBootstrapAlgorithm {
    pub fn new() -> Self {
        Self {
            options: SeqBootstrapOptions::default(),
            seeds: SeedSequence::new(DEFAULT_SEED),
            draw: 0,
            explanation: Explanation::default(),
        }
    }
}

impl Default for SequentialBootstrapAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for SequentialBootstrapAlgorithm {
    fn name(&self) -> &'static str {
        "Sequential Bootstrap"
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::SequentialBootstrap
    }

    fn description(&self) -> &'static str {
        "Bootstrap sampling that weights draws by label uniqueness, reducing the bias that \
         overlapping outcomes introduce into standard resampling"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("lookback_period", "Number of past observations to consider (default: 20)"),
            ("confidence_threshold", "Vote share required for a signal (default: 0.65)"),
            ("use_sequential", "Sequential bootstrap (1) or standard bootstrap (0) (default: 1)"),
            ("sample_size", "Bootstrap draws to take (default: one per label)"),
            ("seed", "Master seed for reproducible sampling (default: 42)"),
        ])
    }

    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError> {
        self.options = SeqBootstrapOptions::from_config(config)?;
        self.seeds = SeedSequence::new(self.options.seed);
        self.draw = 0;
        Ok(())
    }

    fn process(
        &mut self,
        symbol: &str,
        _current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ProcessError> {
        let lookback = self.options.lookback_period;
        if history.len() < lookback {
            return Err(ProcessError::InsufficientHistory { got: history.len(), need: lookback });
        }

        let window = &history[history.len() - lookback..];
        let bar_ix: Vec<usize> = (0..window.len()).collect();
        // One-bar-ahead horizons: the label for bar i resolves at bar i + 1.
        let t1: Vec<f64> = (0..window.len()).map(|i| (i + 1) as f64).collect();
        let matrix = IndicatorMatrix::from_events(&bar_ix, &t1)?;

        let mut rng = self.seeds.rng_for(symbol, self.draw);
        self.draw += 1;

        let sample_size = self.options.sample_size.unwrap_or(0);
        let samples = if self.options.use_sequential {
            seq_bootstrap(&matrix, sample_size, &mut rng)?
        } else {
            standard_bootstrap(&matrix, sample_size, &mut rng)
        };

        // Vote on the next-bar direction of each sampled label.
        let mut up = 0usize;
        let mut down = 0usize;
        for &idx in &samples {
            if idx >= window.len() - 1 {
                continue;
            }
            if window[idx + 1].price > window[idx].price {
                up += 1;
            } else {
                down += 1;
            }
        }

        let total = up + down;
        let (mut signal, confidence) = if total == 0 {
            (Signal::Hold, 0.5)
        } else if up > down {
            (Signal::Buy, up as f64 / total as f64)
        } else {
            (Signal::Sell, down as f64 / total as f64)
        };
        if confidence < self.options.confidence_threshold {
            signal = Signal::Hold;
        }

        let avg_uniqueness = stats::mean(&matrix.average_uniqueness_of(&samples));
        self.explanation.set(format!(
            "Sequential Bootstrap analysis on {} samples with {} lookback period.\n\
             Up signals: {up}, Down signals: {down}, Confidence: {:.2}%\n\
             Average uniqueness of samples: {avg_uniqueness:.2}\n\
             Confidence threshold: {:.2}",
            samples.len(),
            lookback,
            confidence * 100.0,
            self.options.confidence_threshold,
        ));

        Ok(AlgorithmResult {
            signal,
            order_kind: OrderKind::Market,
            limit_price: None,
            weights: None,
            confidence,
            explanation: self.explanation.text().to_string(),
        })
    }

    fn explain(&self) -> &str {
        self.explanation.text()
    }
}
