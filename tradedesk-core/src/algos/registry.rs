//! Factory registry: algorithm kind to constructor.
//!
//! An explicit registry object seeded during application construction, not
//! process-wide state. `with_builtins` registers every concrete algorithm;
//! additional factories can be registered for custom strategies.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::algos::cusum::CusumFilter;
use crate::algos::entropy_pooling::EntropyPoolingAlgorithm;
use crate::algos::frac_diff::FractionalDiffAlgorithm;
use crate::algos::hrp::HrpAlgorithm;
use crate::algos::meta_labeling::MetaLabelingAlgorithm;
use crate::algos::mvo::MvoAlgorithm;
use crate::algos::position_sizing::PositionSizingAlgorithm;
use crate::algos::purged_cv::PurgedCvAlgorithm;
use crate::algos::seq_bootstrap::SequentialBootstrapAlgorithm;
use crate::algos::triple_barrier::TripleBarrierAlgorithm;
use crate::algos::{Algorithm, AlgorithmKind};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("unknown algorithm type: {0}")]
    UnknownKind(String),
}

/// Construct a built-in algorithm directly, bypassing registry lookup.
///
/// Composed stages use this to build their primary with defaults without
/// holding a registry handle.
pub fn create_builtin(kind: AlgorithmKind) -> Box<dyn Algorithm> {
    match kind {
        AlgorithmKind::Hrp => Box::new(HrpAlgorithm::new()),
        AlgorithmKind::Mvo => Box::new(MvoAlgorithm::new()),
        AlgorithmKind::EntropyPooling => Box::new(EntropyPoolingAlgorithm::new()),
        AlgorithmKind::CusumFilter => Box::new(CusumFilter::new()),
        AlgorithmKind::SequentialBootstrap => Box::new(SequentialBootstrapAlgorithm::new()),
        AlgorithmKind::FractionalDiff => Box::new(FractionalDiffAlgorithm::new()),
        AlgorithmKind::TripleBarrier => Box::new(TripleBarrierAlgorithm::new()),
        AlgorithmKind::MetaLabeling => Box::new(MetaLabelingAlgorithm::new()),
        AlgorithmKind::PurgedCv => Box::new(PurgedCvAlgorithm::new()),
        AlgorithmKind::PositionSizing => Box::new(PositionSizingAlgorithm::new()),
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Algorithm> + Send + Sync>;

/// Kind-to-factory map. Written once at startup, read-only afterwards.
#[derive(Default)]
pub struct AlgorithmRegistry {
    factories: BTreeMap<AlgorithmKind, Factory>,
}

impl AlgorithmRegistry {
    /// Empty registry, for callers assembling a custom set.
    pub fn new() -> Self {
        Self { factories: BTreeMap::new() }
    }

    /// Registry with every built-in algorithm registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for kind in AlgorithmKind::ALL {
            registry.register(kind, move || create_builtin(kind));
        }
        registry
    }

    /// Register (or replace) a factory for a kind.
    pub fn register<F>(&mut self, kind: AlgorithmKind, factory: F)
    where
        F: Fn() -> Box<dyn Algorithm> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    /// Instantiate a fresh algorithm of the given kind.
    pub fn create(&self, kind: AlgorithmKind) -> Result<Box<dyn Algorithm>, RegistryError> {
        self.factories
            .get(&kind)
            .map(|factory| factory())
            .ok_or_else(|| RegistryError::UnknownKind(kind.as_str().to_string()))
    }

    /// Registered kinds, in stable order.
    pub fn kinds(&self) -> Vec<AlgorithmKind> {
        self.factories.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
