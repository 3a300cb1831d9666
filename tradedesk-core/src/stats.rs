//! Scalar statistics over ordered sequences of prices and returns.
//!
//! Every helper is total on non-empty input and well-defined on degenerate
//! input: mean of an empty slice is 0, stddev of fewer than two values is 0.

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("need at least 2 price points, got {0}")]
    TooFewPrices(usize),

    #[error("span must be at least 1, got {0}")]
    InvalidSpan(usize),
}

/// Simple relative returns: `(p[i] - p[i-1]) / p[i-1]`.
///
/// A non-positive previous price yields a 0.0 return at that index rather
/// than a division by zero.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Log returns: `ln(p[i] / p[i-1])`.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| if w[0] > 0.0 && w[1] > 0.0 { (w[1] / w[0]).ln() } else { 0.0 })
        .collect()
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than 2 values.
pub fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Exponentially weighted daily volatility over log returns.
///
/// Decay `alpha = 2 / (span + 1)`; the EW mean is initialized to the first
/// return and the EW variance to zero. Returns the square root of the final
/// EW variance, so a constant price series yields exactly 0.
pub fn daily_volatility(prices: &[f64], span: usize) -> Result<f64, StatsError> {
    if prices.len() < 2 {
        return Err(StatsError::TooFewPrices(prices.len()));
    }
    if span < 1 {
        return Err(StatsError::InvalidSpan(span));
    }

    let returns = log_returns(prices);
    let alpha = 2.0 / (span as f64 + 1.0);

    let mut ewma = returns[0];
    let mut ew_var = 0.0;
    for &r in &returns[1..] {
        ewma = alpha * r + (1.0 - alpha) * ewma;
        let deviation = r - ewma;
        ew_var = alpha * deviation * deviation + (1.0 - alpha) * ew_var;
    }

    Ok(ew_var.sqrt())
}

/// Pearson correlation coefficient; 0 on mismatched or empty input.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }

    let n = x.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        sum_x += a;
        sum_y += b;
        sum_xy += a * b;
        sum_x2 += a * a;
        sum_y2 += b * b;
    }

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Spearman rank correlation: Pearson over the rank transforms.
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }
    pearson(&ranks(x), &ranks(y))
}

/// Rank transform with average ranks for ties (ranks start at 1).
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // Average rank across the tie group.
        let avg_rank = (i + j - 1) as f64 / 2.0 + 1.0;
        for &idx in &order[i..j] {
            out[idx] = avg_rank;
        }
        i = j;
    }
    out
}

/// Logistic sigmoid `1 / (1 + e^-x)`.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Min-max normalization clamped to [0, 1].
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Weighted random selection over non-negative weights.
///
/// Falls back to a uniform draw when the weights are all zero or the two
/// slices disagree in length. Returns `None` only for an empty item set.
pub fn weighted_choice<T: Copy, R: Rng + ?Sized>(
    items: &[T],
    weights: &[f64],
    rng: &mut R,
) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if weights.len() != items.len() || total <= 0.0 {
        return Some(items[rng.gen_range(0..items.len())]);
    }

    let r: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (item, w) in items.iter().zip(weights) {
        cumulative += w / total;
        if r <= cumulative {
            return Some(*item);
        }
    }
    // Floating-point slack: the cumulative sum can land just short of 1.
    Some(items[items.len() - 1])
}
