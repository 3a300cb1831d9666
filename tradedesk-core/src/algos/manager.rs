//! Algorithm manager: configured instances plus ensemble execution.
//!
//! Owns one live instance and one stored configuration per registered kind.
//! Single algorithms run through `process_with`; `process_with_all` runs
//! every registered algorithm and fuses the results with the ensemble
//! combiner, excluding (and logging) individual failures.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

use crate::algos::{
    Algorithm, AlgorithmConfig, AlgorithmKind, AlgorithmRegistry, AlgorithmResult, ConfigError,
    ProcessError, RegistryError,
};
use crate::domain::MarketData;
use crate::ensemble::{combine_results, EnsembleError, ScoredResult};

#[derive(Debug, Error, PartialEq)]
pub enum ManagerError {
    #[error("algorithm type {0} not registered")]
    NotRegistered(AlgorithmKind),

    #[error("no algorithms registered")]
    Empty,

    #[error("all algorithms failed to process data")]
    AllFailed,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Ensemble(#[from] EnsembleError),
}

/// Configured algorithm instances behind a single owner.
pub struct AlgorithmManager {
    algorithms: BTreeMap<AlgorithmKind, Box<dyn Algorithm>>,
    configs: BTreeMap<AlgorithmKind, AlgorithmConfig>,
    default_config: AlgorithmConfig,
}

impl AlgorithmManager {
    /// Manager over every built-in algorithm, each configured with the
    /// default envelope.
    pub fn with_builtins() -> Self {
        Self::from_registry(&AlgorithmRegistry::with_builtins())
    }

    /// Manager over whatever the supplied registry can create.
    ///
    /// Kinds whose default configuration is rejected are skipped with a
    /// warning rather than failing construction.
    pub fn from_registry(registry: &AlgorithmRegistry) -> Self {
        let default_config = AlgorithmConfig::default();
        let mut algorithms = BTreeMap::new();
        let mut configs = BTreeMap::new();

        for kind in registry.kinds() {
            let Ok(mut algorithm) = registry.create(kind) else {
                continue;
            };
            match algorithm.configure(&default_config) {
                Ok(()) => {
                    algorithms.insert(kind, algorithm);
                    configs.insert(kind, default_config.clone());
                }
                Err(e) => warn!(kind = %kind, error = %e, "skipping algorithm: default config rejected"),
            }
        }

        Self { algorithms, configs, default_config }
    }

    /// Registered kinds, in stable order.
    pub fn kinds(&self) -> Vec<AlgorithmKind> {
        self.algorithms.keys().copied().collect()
    }

    /// Reconfigure one algorithm; the stored config updates only on success.
    pub fn configure(
        &mut self,
        kind: AlgorithmKind,
        config: AlgorithmConfig,
    ) -> Result<(), ManagerError> {
        let algorithm =
            self.algorithms.get_mut(&kind).ok_or(ManagerError::NotRegistered(kind))?;
        algorithm.configure(&config)?;
        self.configs.insert(kind, config);
        Ok(())
    }

    /// The stored configuration for a kind.
    pub fn config(&self, kind: AlgorithmKind) -> Result<&AlgorithmConfig, ManagerError> {
        self.configs.get(&kind).ok_or(ManagerError::NotRegistered(kind))
    }

    /// Parameter table for a kind.
    pub fn parameters(
        &self,
        kind: AlgorithmKind,
    ) -> Result<BTreeMap<&'static str, &'static str>, ManagerError> {
        self.algorithms
            .get(&kind)
            .map(|a| a.parameters())
            .ok_or(ManagerError::NotRegistered(kind))
    }

    /// Run a single algorithm against a symbol.
    pub fn process_with(
        &mut self,
        kind: AlgorithmKind,
        symbol: &str,
        current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ManagerError> {
        let algorithm =
            self.algorithms.get_mut(&kind).ok_or(ManagerError::NotRegistered(kind))?;
        Ok(algorithm.process(symbol, current, history)?)
    }

    /// Run every registered algorithm and combine the survivors.
    ///
    /// Individual failures are logged and excluded; the call fails only
    /// when every constituent fails.
    pub fn process_with_all(
        &mut self,
        symbol: &str,
        current: &MarketData,
        history: &[MarketData],
    ) -> Result<AlgorithmResult, ManagerError> {
        if self.algorithms.is_empty() {
            return Err(ManagerError::Empty);
        }

        let mut scored = Vec::with_capacity(self.algorithms.len());
        for algorithm in self.algorithms.values_mut() {
            match algorithm.process(symbol, current, history) {
                Ok(result) => scored.push(ScoredResult::new(algorithm.name(), result)),
                Err(e) => {
                    warn!(algorithm = algorithm.name(), error = %e, "algorithm failed to process data");
                }
            }
        }

        if scored.is_empty() {
            return Err(ManagerError::AllFailed);
        }
        Ok(combine_results(&scored)?)
    }

    /// The default configuration applied at registration time.
    pub fn default_config(&self) -> &AlgorithmConfig {
        &self.default_config
    }
}
