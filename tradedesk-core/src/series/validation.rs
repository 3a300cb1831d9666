//! Leakage-aware cross-validation splits.
//!
//! Purged k-fold removes training samples whose label horizon sits next to a
//! test window and can embargo the indices immediately after each test
//! sample; walk-forward assigns contiguous test shards and trains only on
//! the strictly-prior window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One train/test split with the matching timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvFold {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub train_times: Vec<DateTime<Utc>>,
    pub test_times: Vec<DateTime<Utc>>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("no sample times provided")]
    EmptySamples,

    #[error("need at least 2 folds, got {0}")]
    TooFewFolds(usize),

    #[error("embargo_pct must be between 0 and 0.5, got {0}")]
    InvalidEmbargo(f64),

    #[error("insufficient samples: got {samples}, need at least {need}")]
    InsufficientSamples { samples: usize, need: usize },
}

/// Purged and embargoed k-fold split over `[0, n)`.
///
/// Test shards are disjoint blocks of `ceil(n / k)` indices; the final shard
/// absorbs the remainder. Training is the complement, then:
/// - when `event_times` are supplied, any training index whose event time
///   lies within one day of a test time is purged;
/// - when `embargo_pct > 0`, the `ceil(n * embargo_pct)` indices after each
///   test index are embargoed out of training.
pub fn purged_k_fold(
    samples: &[DateTime<Utc>],
    k: usize,
    embargo_pct: f64,
    event_times: Option<&[DateTime<Utc>]>,
) -> Result<Vec<CvFold>, ValidationError> {
    if samples.is_empty() {
        return Err(ValidationError::EmptySamples);
    }
    if k < 2 {
        return Err(ValidationError::TooFewFolds(k));
    }
    if !(0.0..=0.5).contains(&embargo_pct) {
        return Err(ValidationError::InvalidEmbargo(embargo_pct));
    }

    let n = samples.len();
    let shard = n.div_ceil(k);
    let embargo_size = if embargo_pct > 0.0 {
        ((n as f64 * embargo_pct).ceil() as usize).max(1)
    } else {
        0
    };

    let mut folds = Vec::with_capacity(k);
    for fold in 0..k {
        let start = (fold * shard).min(n);
        let end = if fold == k - 1 { n } else { ((fold + 1) * shard).min(n) };
        let test_indices: Vec<usize> = (start..end).collect();

        let mut in_test = vec![false; n];
        let mut embargoed = vec![false; n];
        for &t in &test_indices {
            in_test[t] = true;
            for offset in 1..=embargo_size {
                if let Some(slot) = embargoed.get_mut(t + offset) {
                    *slot = true;
                }
            }
        }

        let train_indices: Vec<usize> = (0..n)
            .filter(|&i| !in_test[i] && !embargoed[i])
            .filter(|&i| match event_times {
                Some(events) => {
                    let event = events.get(i).copied().unwrap_or(samples[i]);
                    !test_indices.iter().any(|&t| within_one_day(event, samples[t]))
                }
                None => true,
            })
            .collect();

        folds.push(CvFold {
            train_times: times_at(samples, &train_indices),
            test_times: times_at(samples, &test_indices),
            train_indices,
            test_indices,
        });
    }

    Ok(folds)
}

/// Walk-forward split: time-sorted contiguous test shards, training on
/// everything strictly before each shard, with an optional tail embargo
/// dropped from the end of the training window.
pub fn walk_forward(
    samples: &[DateTime<Utc>],
    k: usize,
    embargo_pct: f64,
) -> Result<Vec<CvFold>, ValidationError> {
    if samples.is_empty() {
        return Err(ValidationError::EmptySamples);
    }
    if k < 2 {
        return Err(ValidationError::TooFewFolds(k));
    }
    if !(0.0..=0.5).contains(&embargo_pct) {
        return Err(ValidationError::InvalidEmbargo(embargo_pct));
    }
    let n = samples.len();
    if n < 2 * k {
        return Err(ValidationError::InsufficientSamples { samples: n, need: 2 * k });
    }

    let mut sorted: Vec<usize> = (0..n).collect();
    sorted.sort_by_key(|&i| samples[i]);

    let shard = n / k;
    let embargo_size = (n as f64 * embargo_pct).ceil() as usize;

    let mut folds = Vec::with_capacity(k);
    for fold in 0..k {
        let test_start = fold * shard;
        let test_end = if fold == k - 1 { n } else { (fold + 1) * shard };

        let test_indices: Vec<usize> = sorted[test_start..test_end].to_vec();
        let mut train_cut = test_start;
        if embargo_size > 0 && test_start >= embargo_size {
            train_cut = test_start - embargo_size;
        }
        let train_indices: Vec<usize> = sorted[..train_cut].to_vec();

        folds.push(CvFold {
            train_times: times_at(samples, &train_indices),
            test_times: times_at(samples, &test_indices),
            train_indices,
            test_indices,
        });
    }

    Ok(folds)
}

fn times_at(samples: &[DateTime<Utc>], indices: &[usize]) -> Vec<DateTime<Utc>> {
    indices.iter().map(|&i| samples[i]).collect()
}

fn within_one_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).num_hours().abs() < 24
}
