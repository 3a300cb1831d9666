//! Bet-sizing primitives: Kelly fraction, volatility scaling, and a
//! diversification haircut based on the effective number of bets.

/// Kelly criterion: `(p * b - (1 - p)) / b` for win probability `p` and
/// win/loss ratio `b`. Can be negative when the edge is unfavorable.
pub fn kelly_fraction(win_prob: f64, win_loss_ratio: f64) -> f64 {
    (win_prob * win_loss_ratio - (1.0 - win_prob)) / win_loss_ratio
}

/// Scale a base size inversely with volatility relative to a baseline.
///
/// The scaling factor `1 / (vol / baseline)` is clamped to [0.5, 2.0] so a
/// quiet market can at most double the size and a violent one at most halve
/// it.
pub fn volatility_adjusted_size(base_size: f64, volatility: f64, baseline_vol: f64) -> f64 {
    let scaling = volatility / baseline_vol;
    let adjustment = (1.0 / scaling).clamp(0.5, 2.0);
    base_size * adjustment
}

/// Haircut a base size for correlation across `num_positions` holdings.
///
/// Effective N = `n * (1 - rho) + rho`; the factor `1 / sqrt(effective N)`
/// is clamped to [0.25, 1.0]. A single position passes through unchanged.
pub fn diversified_size(base_size: f64, num_positions: usize, avg_correlation: f64) -> f64 {
    if num_positions <= 1 {
        return base_size;
    }

    let effective_n = num_positions as f64 * (1.0 - avg_correlation) + avg_correlation;
    let factor = (1.0 / effective_n.sqrt()).clamp(0.25, 1.0);
    base_size * factor
}
