//! Position sizing: Kelly-based bet sizing with volatility adjustment and
//! an optional meta-labeling confidence gate.
//!
//! The final stage of the composed pipeline. The directional decision comes
//! from the primary (and optionally the meta-labeler); this stage only
//! decides how much. The computed size is reported in the explanation and
//! consumed by the coordinator gate.

use std::collections::BTreeMap;

use crate::algos::registry::create_builtin;
use crate::algos::{
    ensure_known_options, indicators, price_series, Algorithm, AlgorithmConfig, AlgorithmKind,
    AlgorithmResult, ConfigError, Explanation, ProcessError,
};
use crate::domain::{MarketData, Signal};
use crate::series::sizing::{kelly_fraction, volatility_adjusted_size};

const BASELINE_DAILY_VOL: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
struct PositionSizingOptions {
    max_size: f64,
    risk_fraction: f64,
    use_vol_adjustment: bool,
    vol_lookback: usize,
    max_drawdown: f64,
    use_meta_labeling: bool,
}

impl Default for PositionSizingOptions {
    fn default() -> Self {
        Self {
            max_size: 0.2,
            risk_fraction: 0.3,
            use_vol_adjustment: true,
            vol_lookback: 20,
            max_drawdown: 0.1,
            use_meta_labeling: true,
        }
    }
}

impl PositionSizingOptions {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, ConfigError> {
        ensure_known_options(
            &config.params,
            &[
                "max_size",
                "risk_fraction",
                "use_vol_adjustment",
                "vol_lookback",
                "max_drawdown",
                "use_meta_labeling",
            ],
        )?;

        let mut options = Self::default();
        if let Some(&value) = config.params.get("max_size") {
            if value <= 0.0 || value > 1.0 {
                return Err(ConfigError::OutOfRange {
                    option: "max_size".into(),
                    reason: "must be between 0 and 1".into(),
                });
            }
            options.max_size = value;
        }
        if let Some(&value) = config.params.get("risk_fraction") {
            if value <= 0.0 || value > 1.0 {
                return Err(ConfigError::OutOfRange {
                    option: "risk_fraction".into(),
                    reason: "must be between 0 and 1".into(),
                });
            }
            options.risk_fraction = value;
        }
        if let Some(&value) = config.params.get("use_vol_adjustment") {
            options.use_vol_adjustment = value > 0.5;
        }
        if let Some(&value) = config.params.get("vol_lookback") {
            if value < 1.0 {
                return Err(ConfigError::OutOfRange {
                    option: "vol_lookback".into(),
                    reason: "must be at least 1".into(),
                });
            }
            options.vol_lookback = value as usize;
        }
        if let Some(&value) = config.params.get("max_drawdown") {
            if value <= 0.0 || value > 0.5 {
                return Err(ConfigError::OutOfRange {
                    option: "max_drawdown".into(),
                    reason: "must be between 0 and 0.5".into(),
                });
            }
            options.max_drawdown = value;
        }
        if let Some(&value) = config.params.get("use_meta_labeling") {
            options.use_meta_labeling = value > 0.5;
        }
        Ok(options)
    }
}

/// Sizing outcome for one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSize {
    /// Fraction of capital to commit.
    pub size: f64,
    pub vol_adjusted: bool,
    /// Size times the volatility used as the stop distance.
    pub risk_per_trade: f64,
}

/// Kelly-with-guardrails sizing stage.
pub struct PositionSizingAlgorithm {
    options: PositionSizingOptions,
    primary: AlgorithmKind,
    explanation: Explanation,
}

impl PositionSizingAlgorithm {
    pub fn new() -> Self {
        Self {
            options: PositionSizingOptions::default(),
            primary: AlgorithmKind::SequentialBootstrap,
            explanation: Explanation::default(),
        }
    }

    /// Select the primary signal generator (default: sequential bootstrap).
    pub fn set_primary(&mut self, primary: AlgorithmKind) {
        self.primary = primary;
    }

    fn size_position(&self, confidence: f64, volatility: f64) -> Result<PositionSize, ProcessError> {
        if volatility <= 0.0 {
            return Err(ProcessError::NonPositiveVolatility(volatility));
        }

        // Even odds: the win/loss ratio defaults to 1 until per-strategy
        // stop/target levels feed a better estimate.
        let kelly = kelly_fraction(confidence, 1.0).max(0.0) * self.options.risk_fraction;

        let (mut size, vol_adjusted) = if self.options.use_vol_adjustment {
            (volatility_adjusted_size(kelly, volatility, BASELINE_DAILY_VOL), true)
        } else {
            (kelly, false)
        };
        size = size.min(self.options.max_size);

        Ok(PositionSize { size, vol_adjusted, risk_per_trade: size * volatility })
    }
}

impl Default for PositionSizingAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for PositionSizingAlgorithm {
    fn name(&self) -> &'static str {
        "Advanced Position Sizing"
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::PositionSizing
    }

    fn description(&self) -> &'static str {
        "Sizes positions from Kelly betting, volatility scaling, and meta-labeling confidence"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("max_size", "Maximum position size as a fraction of capital (default: 0.2)"),
            ("risk_fraction", "Fractional Kelly multiplier (default: 0.3)"),
            ("use_vol_adjustment", "Scale size inversely with volatility (default: 1)"),
            ("vol_lookback", "Volatility lookback in bars (default: 20)"),
            ("max_drawdown", "Maximum acceptable drawdown (default: 0.1)"),
            ("use_meta_labeling", "Gate confidence through meta-labeling (default: 1)"),
        ])
    }

    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError> {
        self.options = PositionSizingOptions::from_config(config)?;
        Ok(())
    }

    fn process(
        &mut self,
        symbol: &str,
        current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ProcessError> {
        let lookback = self.options.vol_lookback.max(2);
        if history.len() < lookback {
            return Err(ProcessError::InsufficientHistory { got: history.len(), need: lookback });
        }

        // Stage 1: the primary runs fresh with default configuration.
        let mut primary = create_builtin(self.primary);
        primary
            .configure(&AlgorithmConfig::default())
            .map_err(|e| ProcessError::Primary(e.to_string()))?;
        let primary_result = primary.process(symbol, current, history)?;

        if primary_result.signal == Signal::Hold {
            self.explanation.set("Primary signal is 'hold'. No position sizing needed.");
            return Ok(primary_result);
        }

        // Stage 2: optionally gate confidence through meta-labeling.
        let mut confidence = primary_result.confidence;
        let mut meta_applied = false;
        if self.options.use_meta_labeling {
            let mut meta = create_builtin(AlgorithmKind::MetaLabeling);
            meta.configure(&AlgorithmConfig::default())
                .map_err(|e| ProcessError::Primary(e.to_string()))?;
            let meta_result = meta.process(symbol, current, history)?;

            if meta_result.signal == Signal::Hold {
                self.explanation
                    .set("Meta-labeling rejected the primary signal. No position taken.");
                return Ok(AlgorithmResult::hold(self.explanation.text()));
            }
            confidence = meta_result.confidence;
            meta_applied = true;
        }

        // Stage 3: volatility, then the size itself.
        let prices = price_series(history);
        let volatility = indicators::realized_volatility(&prices, self.options.vol_lookback)
            .ok_or(ProcessError::InsufficientHistory { got: prices.len(), need: lookback })?;
        let sized = self.size_position(confidence, volatility)?;

        let mut text = format!(
            "Primary algorithm ({}) generated {} signal with confidence {:.2}.\n",
            primary.name(),
            primary_result.signal,
            primary_result.confidence
        );
        if meta_applied {
            text.push_str(&format!("Meta-labeling adjusted confidence to {confidence:.2}.\n"));
        }
        text.push_str(&format!("Current volatility: {:.2}%\n", volatility * 100.0));
        text.push_str(&format!("Position sizing: {:.2}% of capital", sized.size * 100.0));
        if sized.vol_adjusted {
            text.push_str(" (volatility adjusted)");
        }
        text.push_str(&format!(
            "\nRisk per trade: {:.2}% of capital",
            sized.risk_per_trade * 100.0
        ));
        self.explanation.set(text);

        Ok(AlgorithmResult {
            signal: primary_result.signal,
            order_kind: primary_result.order_kind,
            limit_price: primary_result.limit_price,
            weights: None,
            confidence,
            explanation: self.explanation.text().to_string(),
        })
    }

    fn explain(&self) -> &str {
        self.explanation.text()
    }
}
