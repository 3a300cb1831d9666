//! Fractional differentiation: stationarity while preserving memory.
//!
//! Two variants are provided: a fixed-width window convolution and FFD
//! (fixed-threshold weight truncation, output aligned to the input length).

use thiserror::Error;

use crate::stats;

#[derive(Debug, Error, PartialEq)]
pub enum FracDiffError {
    #[error("series cannot be empty")]
    EmptySeries,

    #[error("series too short: {len} points, need at least {need}")]
    SeriesTooShort { len: usize, need: usize },

    #[error("window size must be at least 1")]
    WindowTooSmall,

    #[error("window size {window} cannot exceed series length {len}")]
    WindowExceedsSeries { window: usize, len: usize },

    #[error("threshold must be positive, got {0}")]
    NonPositiveThreshold(f64),

    #[error("weight computation did not converge below threshold")]
    WeightsDiverged,

    #[error("no candidate d achieved stationarity; fall back to d = 1.0")]
    NoStationaryCandidate,
}

/// First `size` generalized-binomial weights for differencing parameter `d`.
///
/// `w[0] = 1` and `w[k] = w[k-1] * (k - 1 - d) / k`; for integer `d = 1`
/// the sequence collapses to `(1, -1, 0, 0, ...)`.
pub fn frac_diff_weights(d: f64, size: usize) -> Vec<f64> {
    let mut weights = vec![0.0; size];
    if size == 0 {
        return weights;
    }
    weights[0] = 1.0;
    for k in 1..size {
        weights[k] = weights[k - 1] * (k as f64 - 1.0 - d) / k as f64;
    }
    weights
}

/// Fixed-width window fractional differencing.
///
/// Applies a `window`-sized weight convolution; the output has length
/// `len - window + 1` (the first full window anchors the first output).
pub fn fixed_width_frac_diff(
    series: &[f64],
    d: f64,
    window: usize,
) -> Result<Vec<f64>, FracDiffError> {
    if window < 1 {
        return Err(FracDiffError::WindowTooSmall);
    }
    if window > series.len() {
        return Err(FracDiffError::WindowExceedsSeries { window, len: series.len() });
    }

    let weights = frac_diff_weights(d, window);
    let mut out = Vec::with_capacity(series.len() - window + 1);
    for i in (window - 1)..series.len() {
        let dot: f64 = weights.iter().enumerate().map(|(j, w)| w * series[i - j]).sum();
        out.push(dot);
    }
    Ok(out)
}

// Upper bound on the FFD weight count; weights decay slowly for small d.
const MAX_FFD_WEIGHTS: usize = 100_000;

/// Fixed-threshold fractional differencing.
///
/// Weights are generated until their magnitude falls below `threshold`
/// (the first sub-threshold weight is still included); each output index
/// applies up to `min(i + 1, width)` weights, so the output is aligned to
/// the full input length.
pub fn ffd(series: &[f64], d: f64, threshold: f64) -> Result<Vec<f64>, FracDiffError> {
    if series.is_empty() {
        return Err(FracDiffError::EmptySeries);
    }
    if threshold <= 0.0 {
        return Err(FracDiffError::NonPositiveThreshold(threshold));
    }

    let mut weights = vec![1.0];
    let mut w: f64 = 1.0;
    let mut k = 1usize;
    while w.abs() > threshold {
        w *= (k as f64 - 1.0 - d) / k as f64;
        weights.push(w);
        if k > MAX_FFD_WEIGHTS {
            return Err(FracDiffError::WeightsDiverged);
        }
        k += 1;
    }

    let width = weights.len();
    let out = (0..series.len())
        .map(|i| {
            let usable = (i + 1).min(width);
            (0..usable).map(|j| weights[j] * series[i - j]).sum()
        })
        .collect();
    Ok(out)
}

/// Crude stationarity check: the series is "stationary" when its spread is
/// small relative to its level. Not a statistical test; callers needing a
/// real answer should run an ADF test on the output instead.
pub fn is_stationary(series: &[f64]) -> bool {
    if series.len() < 10 {
        return false;
    }
    stats::stddev(series) < 0.1 * stats::mean(series).abs()
}

/// Smallest candidate `d` whose FFD output passes [`is_stationary`].
///
/// With an empty candidate list the grid 0.1, 0.2, ..., 1.0 is used. When no
/// candidate qualifies the caller should fall back to `d = 1.0`; the error
/// says so.
pub fn find_optimal_d(
    series: &[f64],
    candidates: &[f64],
    threshold: f64,
) -> Result<f64, FracDiffError> {
    if series.len() < 10 {
        return Err(FracDiffError::SeriesTooShort { len: series.len(), need: 10 });
    }

    let default_grid: Vec<f64> = (1..=10).map(|i| i as f64 / 10.0).collect();
    let grid = if candidates.is_empty() { &default_grid[..] } else { candidates };

    for &d in grid {
        match ffd(series, d, threshold) {
            Ok(diffed) if is_stationary(&diffed) => return Ok(d),
            _ => continue,
        }
    }
    Err(FracDiffError::NoStationaryCandidate)
}
