//! Meta-labeling: a secondary model that decides whether to act on a
//! primary signal.
//!
//! The primary algorithm proposes a direction; a logistic score over
//! normalized market features decides whether the proposal clears the
//! confidence bar. Rejected proposals are overridden to hold. The primary
//! is constructed fresh with default configuration on every call.

use std::collections::BTreeMap;

use crate::algos::registry::create_builtin;
use crate::algos::{
    ensure_known_options, indicators, price_series, Algorithm, AlgorithmConfig, AlgorithmKind,
    AlgorithmResult, ConfigError, Explanation, ProcessError,
};
use crate::domain::{MarketData, Signal};
use crate::stats;

/// Secondary model used to score the primary signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    /// Weighted feature score through a sigmoid.
    SimpleRules,
    /// Placeholder: passes the primary confidence through.
    LogisticRegression,
    /// Placeholder: passes the primary confidence through.
    RandomForest,
}

impl ModelType {
    fn from_code(code: f64) -> Result<Self, ConfigError> {
        match code as i64 {
            0 => Ok(ModelType::SimpleRules),
            1 => Ok(ModelType::LogisticRegression),
            2 => Ok(ModelType::RandomForest),
            _ => Err(ConfigError::OutOfRange {
                option: "model_type".into(),
                reason: "must be 0 (simple_rules), 1 (logistic_regression), or 2 (random_forest)"
                    .into(),
            }),
        }
    }
}

/// Feature families the extractor can draw on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFamily {
    Price,
    Volume,
    Volatility,
    Technical,
}

impl FeatureFamily {
    fn label(&self) -> &'static str {
        match self {
            FeatureFamily::Price => "price",
            FeatureFamily::Volume => "volume",
            FeatureFamily::Volatility => "volatility",
            FeatureFamily::Technical => "technical",
        }
    }

    /// Empirical family weight in the simple-rules score.
    fn weight(&self) -> f64 {
        match self {
            FeatureFamily::Price => 0.2,
            FeatureFamily::Volume => 0.2,
            FeatureFamily::Volatility => 0.3,
            FeatureFamily::Technical => 0.3,
        }
    }
}

/// Outcome of scoring one primary signal.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaLabelOutcome {
    pub take_the_trade: bool,
    pub confidence: f64,
    pub suggested_size: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct MetaLabelingOptions {
    confidence_threshold: f64,
    families: Vec<FeatureFamily>,
    model_type: ModelType,
}

impl Default for MetaLabelingOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            families: vec![
                FeatureFamily::Price,
                FeatureFamily::Volume,
                FeatureFamily::Volatility,
                FeatureFamily::Technical,
            ],
            model_type: ModelType::SimpleRules,
        }
    }
}

impl MetaLabelingOptions {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, ConfigError> {
        ensure_known_options(
            &config.params,
            &[
                "confidence_threshold",
                "model_type",
                "use_price_features",
                "use_volume_features",
                "use_volatility_features",
                "use_technical_features",
            ],
        )?;

        let mut options = Self::default();
        if let Some(&value) = config.params.get("confidence_threshold") {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    option: "confidence_threshold".into(),
                    reason: "must be between 0 and 1".into(),
                });
            }
            options.confidence_threshold = value;
        }
        if let Some(&code) = config.params.get("model_type") {
            options.model_type = ModelType::from_code(code)?;
        }

        let toggles = [
            ("use_price_features", FeatureFamily::Price),
            ("use_volume_features", FeatureFamily::Volume),
            ("use_volatility_features", FeatureFamily::Volatility),
            ("use_technical_features", FeatureFamily::Technical),
        ];
        for (option, family) in toggles {
            if let Some(&flag) = config.params.get(option) {
                if flag <= 0.5 {
                    options.families.retain(|f| *f != family);
                }
            }
        }
        if options.families.is_empty() {
            return Err(ConfigError::OutOfRange {
                option: "use_*_features".into(),
                reason: "at least one feature family must be enabled".into(),
            });
        }

        Ok(options)
    }
}

const MODEL_BIAS: f64 = -0.1;

/// Normalization ranges for each raw feature.
fn feature_range(name: &str) -> (f64, f64) {
    match name {
        "price_change" => (-0.05, 0.05),
        "volume_ratio" => (0.0, 3.0),
        "volatility" => (0.0, 0.05),
        "rsi" => (0.0, 100.0),
        "macd" => (-0.05, 0.05),
        "bollinger_pct_b" => (0.0, 1.0),
        _ => (0.0, 1.0),
    }
}

fn normalized(value: f64, range_name: &str) -> f64 {
    let (min, max) = feature_range(range_name);
    stats::normalize(value, min, max)
}

/// Signal filter scored by a logistic model over market features.
pub struct MetaLabelingAlgorithm {
    options: MetaLabelingOptions,
    primary: AlgorithmKind,
    explanation: Explanation,
}

impl MetaLabelingAlgorithm {
    pub fn new() -> Self {
        Self {
            options: MetaLabelingOptions::default(),
            primary: AlgorithmKind::SequentialBootstrap,
            explanation: Explanation::default(),
        }
    }

    /// Select the primary signal generator (default: sequential bootstrap).
    pub fn set_primary(&mut self, primary: AlgorithmKind) {
        self.primary = primary;
    }

    /// Per-feature (value, weight) pairs for the enabled families.
    ///
    /// Each family's empirical weight is split evenly across its features,
    /// so disabling a family redistributes nothing.
    fn extract_features(
        &self,
        current: &MarketData,
        history: &[MarketData],
    ) -> Vec<(f64, f64)> {
        let prices = price_series(history);
        let mut features = Vec::with_capacity(8);

        // Most recent history entry first.
        let back = |n: usize| -> Option<&MarketData> {
            history.len().checked_sub(1 + n).map(|i| &history[i])
        };

        for family in &self.options.families {
            match family {
                FeatureFamily::Price => {
                    let w = family.weight() / 2.0;
                    let one_day = back(0)
                        .filter(|d| d.price > 0.0)
                        .map(|d| (current.price - d.price) / d.price)
                        .unwrap_or(0.0);
                    features.push((normalized(one_day, "price_change"), w));

                    let five_day = back(4)
                        .filter(|d| d.price > 0.0)
                        .map(|d| (current.price - d.price) / d.price)
                        .unwrap_or(0.0);
                    features.push((normalized(five_day, "price_change"), w));
                }
                FeatureFamily::Volume => {
                    let w = family.weight();
                    let recent: Vec<f64> =
                        (0..5).filter_map(|n| back(n)).map(|d| d.volume_24h).collect();
                    let avg = stats::mean(&recent);
                    let ratio = if avg > 0.0 { current.volume_24h / avg } else { 0.0 };
                    features.push((normalized(ratio, "volume_ratio"), w));
                }
                FeatureFamily::Volatility => {
                    let w = family.weight() / 2.0;
                    let vol = indicators::realized_volatility(&prices, 10).unwrap_or(0.01);
                    features.push((normalized(vol, "volatility"), w));

                    let range = if current.price > 0.0 {
                        (current.high_24h - current.low_24h) / current.price
                    } else {
                        0.0
                    };
                    features.push((normalized(range, "volatility"), w));
                }
                FeatureFamily::Technical => {
                    let w = family.weight() / 3.0;
                    features.push((normalized(indicators::rsi(&prices, 14), "rsi"), w));
                    features.push((normalized(indicators::macd_normalized(&prices), "macd"), w));
                    features.push((
                        normalized(indicators::bollinger_pct_b(&prices, 20, 2.0), "bollinger_pct_b"),
                        w,
                    ));
                }
            }
        }

        features
    }

    fn score(&self, features: &[(f64, f64)], primary_confidence: f64) -> MetaLabelOutcome {
        let confidence = match self.options.model_type {
            ModelType::SimpleRules => {
                let weighted: f64 = features.iter().map(|(value, weight)| value * weight).sum();
                stats::sigmoid(weighted + MODEL_BIAS)
            }
            // The trained models are not wired in; defer to the primary.
            ModelType::LogisticRegression | ModelType::RandomForest => primary_confidence,
        };

        let take_the_trade = confidence >= self.options.confidence_threshold;
        let suggested_size = if take_the_trade {
            ((2.0 * confidence - 1.0) * 0.5).clamp(0.1, 1.0)
        } else {
            0.0
        };

        MetaLabelOutcome { take_the_trade, confidence, suggested_size }
    }
}

impl Default for MetaLabelingAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for MetaLabelingAlgorithm {
    fn name(&self) -> &'static str {
        "Meta-Labeling"
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::MetaLabeling
    }

    fn description(&self) -> &'static str {
        "Filters primary trading signals through a secondary model that estimates the \
         probability the trade will pay off"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("confidence_threshold", "Minimum meta-confidence to act (default: 0.6)"),
            (
                "model_type",
                "0 = simple_rules, 1 = logistic_regression, 2 = random_forest (default: 0)",
            ),
            ("use_price_features", "Enable price features (default: 1)"),
            ("use_volume_features", "Enable volume features (default: 1)"),
            ("use_volatility_features", "Enable volatility features (default: 1)"),
            ("use_technical_features", "Enable technical indicators (default: 1)"),
        ])
    }

    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError> {
        self.options = MetaLabelingOptions::from_config(config)?;
        Ok(())
    }

    fn process(
        &mut self,
        symbol: &str,
        current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ProcessError> {
        if history.len() < 10 {
            return Err(ProcessError::InsufficientHistory { got: history.len(), need: 10 });
        }

        // The primary runs fresh with default configuration every call.
        let mut primary = create_builtin(self.primary);
        primary
            .configure(&AlgorithmConfig::default())
            .map_err(|e| ProcessError::Primary(e.to_string()))?;
        let primary_result = primary.process(symbol, current, history)?;

        if primary_result.signal == Signal::Hold {
            self.explanation.set("Primary signal is 'hold'. No meta-labeling needed.");
            return Ok(primary_result);
        }

        let features = self.extract_features(current, history);
        let outcome = self.score(&features, primary_result.confidence);

        let mut text = format!(
            "Primary algorithm ({}) generated {} signal with confidence {:.2}. ",
            primary.name(),
            primary_result.signal,
            primary_result.confidence
        );
        if outcome.take_the_trade {
            text.push_str(&format!(
                "Meta-labeling confirmed signal with adjusted confidence {:.2}. ",
                outcome.confidence
            ));
            text.push_str(&format!(
                "Suggested position size: {:.2}%",
                outcome.suggested_size * 100.0
            ));
        } else {
            text.push_str(
                "Meta-labeling rejected signal (insufficient probability of profitability).",
            );
        }
        text.push_str("\nFeature importance:");
        for family in &self.options.families {
            text.push_str(&format!("\n - {}: {:.2}", family.label(), family.weight()));
        }
        self.explanation.set(text);

        let result = if outcome.take_the_trade {
            AlgorithmResult {
                signal: primary_result.signal,
                order_kind: primary_result.order_kind,
                limit_price: primary_result.limit_price,
                weights: None,
                confidence: outcome.confidence,
                explanation: self.explanation.text().to_string(),
            }
        } else {
            AlgorithmResult::hold(self.explanation.text())
        };

        Ok(result)
    }

    fn explain(&self) -> &str {
        self.explanation.text()
    }
}
