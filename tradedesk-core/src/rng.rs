//! Deterministic RNG derivation for sampling algorithms.
//!
//! A master seed is expanded into per-(symbol, draw) sub-seeds via BLAKE3
//! hashing. Derivation is order-independent, so the same master seed yields
//! identical draws regardless of the order symbols are processed in.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Expands one master seed into reproducible sub-seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSequence {
    master_seed: u64,
}

impl SeedSequence {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Deterministic sub-seed for a (symbol, draw) pair.
    pub fn sub_seed(&self, symbol: &str, draw: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(&draw.to_le_bytes());
        let hash = hasher.finalize();
        u64::from_le_bytes(hash.as_bytes()[..8].try_into().expect("blake3 output >= 8 bytes"))
    }

    /// Seeded generator for a (symbol, draw) pair.
    pub fn rng_for(&self, symbol: &str, draw: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(symbol, draw))
    }
}
