//! Sequential bootstrap sampling over an indicator matrix.
//!
//! Rows index bars, columns index labels; entry (j, i) is 1 when bar j lies
//! in the support of label i. Sequential draws weight each candidate label by
//! the average uniqueness it would have alongside the labels already drawn,
//! which de-emphasizes overlapping outcomes.

use rand::Rng;
use thiserror::Error;

use crate::stats::weighted_choice;

#[derive(Debug, Error, PartialEq)]
pub enum BootstrapError {
    #[error("bar indices or label horizons cannot be empty")]
    EmptyInput,

    #[error("sample length {requested} cannot exceed number of labels {labels}")]
    SampleTooLarge { requested: usize, labels: usize },
}

/// Dense 0/1 matrix, rows = bars, columns = labels.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorMatrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl IndicatorMatrix {
    /// Build the matrix from bar indices and per-label horizons:
    /// entry (j, i) = 1 iff `bar_ix[j] <= t1[i]`.
    pub fn from_events(bar_ix: &[usize], t1: &[f64]) -> Result<Self, BootstrapError> {
        if bar_ix.is_empty() || t1.is_empty() {
            return Err(BootstrapError::EmptyInput);
        }

        let rows = bar_ix.len();
        let cols = t1.len();
        let mut data = vec![0u8; rows * cols];
        for (i, &horizon) in t1.iter().enumerate() {
            for (j, &bar) in bar_ix.iter().enumerate() {
                if (bar as f64) <= horizon {
                    data[j * cols + i] = 1;
                }
            }
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.cols + col]
    }

    /// Average uniqueness per label over a chosen column subset.
    ///
    /// Concurrency of a selected column is its row-sum restricted to the
    /// subset's rows where the column is active; uniqueness of a (row, col)
    /// cell is `1 / concurrency` over all selected columns active on that
    /// row. The per-label average skips zero cells, never diluting by the
    /// matrix's empty entries.
    pub fn average_uniqueness_of(&self, selected: &[usize]) -> Vec<f64> {
        // Row-wise concurrency across the selected columns.
        let mut concurrency = vec![0u32; self.rows];
        for row in 0..self.rows {
            for &col in selected {
                concurrency[row] += u32::from(self.get(row, col));
            }
        }

        selected
            .iter()
            .map(|&col| {
                let mut sum = 0.0;
                let mut count = 0usize;
                for row in 0..self.rows {
                    if self.get(row, col) == 1 && concurrency[row] > 0 {
                        sum += 1.0 / f64::from(concurrency[row]);
                        count += 1;
                    }
                }
                if count > 0 {
                    sum / count as f64
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Average uniqueness of every label against the full matrix.
    pub fn average_uniqueness(&self) -> Vec<f64> {
        let all: Vec<usize> = (0..self.cols).collect();
        self.average_uniqueness_of(&all)
    }
}

/// Sequential bootstrap: `sample_size` label draws (0 means one per label).
///
/// At each step every candidate column is scored by the average uniqueness
/// it would contribute to the selection so far, and a weighted draw picks
/// the next label. All-zero weights fall back to a uniform draw.
pub fn seq_bootstrap<R: Rng + ?Sized>(
    matrix: &IndicatorMatrix,
    sample_size: usize,
    rng: &mut R,
) -> Result<Vec<usize>, BootstrapError> {
    let cols = matrix.cols();
    let target = if sample_size == 0 { cols } else { sample_size };
    if target > cols {
        return Err(BootstrapError::SampleTooLarge { requested: target, labels: cols });
    }

    let mut phi: Vec<usize> = Vec::with_capacity(target);
    let mut candidate_set: Vec<usize> = Vec::with_capacity(cols + 1);
    while phi.len() < target {
        let mut weights = Vec::with_capacity(cols);
        let candidates: Vec<usize> = (0..cols).collect();
        for candidate in 0..cols {
            candidate_set.clear();
            candidate_set.extend_from_slice(&phi);
            candidate_set.push(candidate);
            let avg = matrix.average_uniqueness_of(&candidate_set);
            // The last entry scores the newly added candidate.
            weights.push(avg.last().copied().unwrap_or(0.0));
        }

        match weighted_choice(&candidates, &weights, rng) {
            Some(col) => phi.push(col),
            None => break,
        }
    }

    Ok(phi)
}

/// Plain bootstrap: uniform draws with replacement over the labels.
pub fn standard_bootstrap<R: Rng + ?Sized>(
    matrix: &IndicatorMatrix,
    sample_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    let cols = matrix.cols();
    let target = if sample_size == 0 { cols } else { sample_size };
    (0..target).map(|_| rng.gen_range(0..cols)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stair_matrix(n: usize) -> IndicatorMatrix {
        // bar j supports label i when j <= i + 1 (one-bar-ahead horizons).
        let bar_ix: Vec<usize> = (0..n).collect();
        let t1: Vec<f64> = (0..n).map(|i| (i + 1) as f64).collect();
        IndicatorMatrix::from_events(&bar_ix, &t1).unwrap()
    }

    #[test]
    fn matrix_construction_matches_support_rule() {
        let m = stair_matrix(4);
        assert_eq!((m.rows(), m.cols()), (4, 4));
        // Label 0 has horizon 1.0: bars 0 and 1 are in support.
        assert_eq!(m.get(0, 0), 1);
        assert_eq!(m.get(1, 0), 1);
        assert_eq!(m.get(2, 0), 0);
        // The final label covers every bar.
        for row in 0..4 {
            assert_eq!(m.get(row, 3), 1);
        }
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert_eq!(IndicatorMatrix::from_events(&[], &[1.0]), Err(BootstrapError::EmptyInput));
        assert_eq!(IndicatorMatrix::from_events(&[0], &[]), Err(BootstrapError::EmptyInput));
    }

    #[test]
    fn uniqueness_of_disjoint_labels_is_one() {
        // Two labels with non-overlapping supports.
        let bar_ix = [0usize, 5];
        let t1 = [0.0, 5.0];
        let m = IndicatorMatrix::from_events(&bar_ix, &t1).unwrap();
        // Label 0 support: bar 0 only. Label 1: bars 0 and 5. They overlap
        // on bar 0, so uniqueness dips below 1 there.
        let avg = m.average_uniqueness();
        assert!(avg[0] <= 1.0 && avg[0] > 0.0);
        assert!(avg[1] <= 1.0 && avg[1] > 0.0);
    }

    #[test]
    fn average_uniqueness_ignores_zero_cells() {
        let m = stair_matrix(5);
        for u in m.average_uniqueness() {
            assert!(u > 0.0 && u <= 1.0);
        }
    }

    #[test]
    fn seq_bootstrap_draws_requested_count() {
        let m = stair_matrix(8);
        let mut rng = StdRng::seed_from_u64(42);
        let draws = seq_bootstrap(&m, 5, &mut rng).unwrap();
        assert_eq!(draws.len(), 5);
        assert!(draws.iter().all(|&c| c < 8));
    }

    #[test]
    fn seq_bootstrap_zero_defaults_to_label_count() {
        let m = stair_matrix(6);
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(seq_bootstrap(&m, 0, &mut rng).unwrap().len(), 6);
    }

    #[test]
    fn seq_bootstrap_rejects_oversized_samples() {
        let m = stair_matrix(4);
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            seq_bootstrap(&m, 9, &mut rng),
            Err(BootstrapError::SampleTooLarge { requested: 9, labels: 4 })
        );
    }

    #[test]
    fn seq_bootstrap_is_reproducible_for_a_seed() {
        let m = stair_matrix(10);
        let a = seq_bootstrap(&m, 6, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = seq_bootstrap(&m, 6, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn standard_bootstrap_stays_in_range() {
        let m = stair_matrix(6);
        let mut rng = StdRng::seed_from_u64(3);
        let draws = standard_bootstrap(&m, 50, &mut rng);
        assert_eq!(draws.len(), 50);
        assert!(draws.iter().all(|&c| c < 6));
    }
}
