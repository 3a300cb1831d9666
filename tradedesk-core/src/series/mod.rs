//! Financial-series primitives from the quantitative ML toolbox.
//!
//! - `fracdiff`: fractional differentiation (fixed-width and FFD).
//! - `barrier`: triple-barrier labeling and meta-labels.
//! - `bootstrap`: indicator matrix, average uniqueness, sequential bootstrap.
//! - `validation`: purged/embargoed k-fold and walk-forward splits.
//! - `sizing`: Kelly, volatility-adjusted, and diversification-aware sizing.

pub mod barrier;
pub mod bootstrap;
pub mod fracdiff;
pub mod sizing;
pub mod validation;

pub use barrier::{apply_triple_barrier, meta_labels, BarrierHit, BarrierResult, Label, TripleBarrierConfig};
pub use bootstrap::{seq_bootstrap, standard_bootstrap, IndicatorMatrix};
pub use fracdiff::{ffd, find_optimal_d, fixed_width_frac_diff, frac_diff_weights};
pub use sizing::{diversified_size, kelly_fraction, volatility_adjusted_size};
pub use validation::{purged_k_fold, walk_forward, CvFold};
