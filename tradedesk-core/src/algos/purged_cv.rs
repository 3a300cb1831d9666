//! Purged cross-validation as an inspectable fold plan.
//!
//! Produces a validation plan, never an order: the result is always hold
//! and the explanation enumerates per-fold train/test sizes.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};

use crate::algos::{
    ensure_known_options, Algorithm, AlgorithmConfig, AlgorithmKind, AlgorithmResult,
    ConfigError, Explanation, ProcessError,
};
use crate::domain::MarketData;
use crate::series::validation::purged_k_fold;

#[derive(Debug, Clone, PartialEq)]
struct PurgedCvOptions {
    num_folds: usize,
    embargo_pct: f64,
    test_size: f64,
}

impl Default for PurgedCvOptions {
    fn default() -> Self {
        Self { num_folds: 5, embargo_pct: 0.01, test_size: 0.3 }
    }
}

impl PurgedCvOptions {
    fn from_config(config: &AlgorithmConfig) -> Result<Self, ConfigError> {
        ensure_known_options(&config.params, &["num_folds", "embargo_pct", "test_size"])?;

        let mut options = Self::default();
        if let Some(&value) = config.params.get("num_folds") {
            if value < 2.0 {
                return Err(ConfigError::OutOfRange {
                    option: "num_folds".into(),
                    reason: "must be at least 2".into(),
                });
            }
            options.num_folds = value as usize;
        }
        if let Some(&value) = config.params.get("embargo_pct") {
            if !(0.0..=0.5).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    option: "embargo_pct".into(),
                    reason: "must be between 0 and 0.5".into(),
                });
            }
            options.embargo_pct = value;
        }
        if let Some(&value) = config.params.get("test_size") {
            if value <= 0.0 || value >= 1.0 {
                return Err(ConfigError::OutOfRange {
                    option: "test_size".into(),
                    reason: "must be strictly between 0 and 1".into(),
                });
            }
            options.test_size = value;
        }
        Ok(options)
    }
}

/// Fold planner for leakage-free model validation.
pub struct PurgedCvAlgorithm {
    options: PurgedCvOptions,
    explanation: Explanation,
}

impl PurgedCvAlgorithm {
    pub fn new() -> Self {
        Self { options: PurgedCvOptions::default(), explanation: Explanation::default() }
    }
}

impl Default for PurgedCvAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for PurgedCvAlgorithm {
    fn name(&self) -> &'static str {
        "Purged Cross-Validation"
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::PurgedCv
    }

    fn description(&self) -> &'static str {
        "Builds purged and embargoed cross-validation folds so model assessment does not leak \
         test information into training"
    }

    fn parameters(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("num_folds", "Number of folds (default: 5)"),
            ("embargo_pct", "Fraction of samples embargoed after each test block (default: 0.01)"),
            ("test_size", "Reported test share of the data (default: 0.3)"),
        ])
    }

    fn configure(&mut self, config: &AlgorithmConfig) -> Result<(), ConfigError> {
        self.options = PurgedCvOptions::from_config(config)?;
        Ok(())
    }

    fn process(
        &mut self,
        _symbol: &str,
        _current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ProcessError> {
        let need = self.options.num_folds * 2;
        if history.len() < need {
            return Err(ProcessError::InsufficientHistory { got: history.len(), need });
        }

        // Market snapshots have no timestamps: assume daily spacing ending now.
        let base = Utc::now() - Duration::days(history.len() as i64);
        let samples: Vec<_> =
            (0..history.len()).map(|i| base + Duration::days(i as i64)).collect();

        let folds =
            purged_k_fold(&samples, self.options.num_folds, self.options.embargo_pct, None)?;

        let mut text = format!(
            "Generated {} cross-validation folds with embargo={:.2}% and test_size={:.2}%.\n",
            self.options.num_folds,
            self.options.embargo_pct * 100.0,
            self.options.test_size * 100.0
        );
        for (i, fold) in folds.iter().enumerate() {
            text.push_str(&format!(
                "Fold {}: {} training samples, {} test samples\n",
                i + 1,
                fold.train_indices.len(),
                fold.test_indices.len()
            ));
        }
        self.explanation.set(text);

        Ok(AlgorithmResult::hold(self.explanation.text()))
    }

    fn explain(&self) -> &str {
        self.explanation.text()
    }
}
