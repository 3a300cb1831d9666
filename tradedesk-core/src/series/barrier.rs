//! Triple-barrier labeling.
//!
//! Each entry point gets an upper (profit-taking) barrier, a lower
//! (stop-loss) barrier, and a vertical time barrier; the label records which
//! was hit first. Barrier widths scale with the supplied volatility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which barrier ended the simulated holding period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarrierHit {
    Upper,
    Lower,
    Time,
}

/// Direction label: -1 sell, 0 hold, +1 buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Sell,
    Hold,
    Buy,
}

impl Label {
    pub fn as_i8(&self) -> i8 {
        match self {
            Label::Sell => -1,
            Label::Hold => 0,
            Label::Buy => 1,
        }
    }
}

/// One labeled entry/exit episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierResult {
    pub label: Label,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub barrier_hit: BarrierHit,
}

/// Barrier placement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripleBarrierConfig {
    /// Upper barrier width as a multiple of volatility.
    pub profit_taking: f64,
    /// Lower barrier width as a multiple of volatility.
    pub stop_loss: f64,
    /// Vertical barrier, in bars.
    pub time_horizon: usize,
    /// Lookback window used to estimate volatility.
    pub volatility_lookback: usize,
}

impl Default for TripleBarrierConfig {
    fn default() -> Self {
        Self { profit_taking: 2.0, stop_loss: 1.0, time_horizon: 5, volatility_lookback: 20 }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BarrierError {
    #[error("need at least 2 price points, got {0}")]
    TooFewPrices(usize),

    #[error("prices and times must have the same length ({prices} vs {times})")]
    LengthMismatch { prices: usize, times: usize },

    #[error("volatility must be positive, got {0}")]
    NonPositiveVolatility(f64),
}

/// Label every entry index of a price series by first barrier hit.
///
/// For entry `i`: upper = `p[i] * (1 + profit_taking * vol)`, lower =
/// `p[i] * (1 - stop_loss * vol)`, time barrier at
/// `min(i + time_horizon, len - 1)`. The walk breaks on the first barrier
/// touched; an upper hit labels Buy (confirming a buy seed, flipping a sell
/// seed), a lower hit labels Sell, and the time barrier labels by the sign
/// of the move since entry.
pub fn apply_triple_barrier(
    prices: &[f64],
    times: &[DateTime<Utc>],
    volatility: f64,
    config: &TripleBarrierConfig,
) -> Result<Vec<BarrierResult>, BarrierError> {
    if prices.len() < 2 {
        return Err(BarrierError::TooFewPrices(prices.len()));
    }
    if prices.len() != times.len() {
        return Err(BarrierError::LengthMismatch { prices: prices.len(), times: times.len() });
    }
    if volatility <= 0.0 {
        return Err(BarrierError::NonPositiveVolatility(volatility));
    }

    let mut results = Vec::with_capacity(prices.len() - 1);
    for i in 0..prices.len() - 1 {
        let entry_price = prices[i];
        let upper = entry_price * (1.0 + config.profit_taking * volatility);
        let lower = entry_price * (1.0 - config.stop_loss * volatility);
        let time_idx = (i + config.time_horizon).min(prices.len() - 1);

        // Seed the direction from the immediate prior return.
        let trend = if i > 0 { prices[i] - prices[i - 1] } else { 0.0 };
        let mut label = if trend > 0.0 {
            Label::Buy
        } else if trend < 0.0 {
            Label::Sell
        } else {
            Label::Hold
        };

        let mut exit_idx = time_idx;
        let mut hit = BarrierHit::Time;
        for j in (i + 1)..=time_idx {
            let price = prices[j];
            if price >= upper {
                hit = BarrierHit::Upper;
                exit_idx = j;
                label = Label::Buy;
                break;
            }
            if price <= lower {
                hit = BarrierHit::Lower;
                exit_idx = j;
                label = Label::Sell;
                break;
            }
            if j == time_idx {
                // Vertical barrier: label by the net move since entry.
                label = if price > entry_price {
                    Label::Buy
                } else if price < entry_price {
                    Label::Sell
                } else {
                    Label::Hold
                };
            }
        }

        results.push(BarrierResult {
            label,
            entry_time: times[i],
            entry_price,
            exit_time: times[exit_idx],
            exit_price: prices[exit_idx],
            barrier_hit: hit,
        });
    }

    Ok(results)
}

/// Binary meta-labels: true when the directional label was profitable.
pub fn meta_labels(results: &[BarrierResult]) -> Vec<bool> {
    results
        .iter()
        .map(|r| {
            (r.label == Label::Buy && r.exit_price > r.entry_price)
                || (r.label == Label::Sell && r.exit_price < r.entry_price)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn daily_times(n: usize) -> Vec<DateTime<Utc>> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| t0 + chrono::Duration::days(i as i64)).collect()
    }

    #[test]
    fn rising_series_hits_upper_with_buy_labels() {
        let prices = [100.0, 102.0, 104.0, 106.0, 108.0, 110.0];
        let times = daily_times(prices.len());
        let config = TripleBarrierConfig {
            profit_taking: 3.0,
            stop_loss: 2.0,
            time_horizon: 5,
            volatility_lookback: 20,
        };

        let results = apply_triple_barrier(&prices, &times, 0.01, &config).unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].barrier_hit, BarrierHit::Upper);
        assert_eq!(results[0].label, Label::Buy);
        for r in &results {
            assert_eq!(r.barrier_hit, BarrierHit::Upper);
            assert!(r.entry_time <= r.exit_time);
            // upper hit implies exit at or above the upper level
            let upper = r.entry_price * (1.0 + 3.0 * 0.01);
            assert!(r.exit_price >= upper);
        }
    }

    #[test]
    fn falling_series_hits_lower_with_sell_labels() {
        let prices = [100.0, 97.0, 94.0, 91.0, 88.0, 85.0];
        let times = daily_times(prices.len());
        let config = TripleBarrierConfig {
            profit_taking: 2.0,
            stop_loss: 2.0,
            time_horizon: 5,
            volatility_lookback: 20,
        };

        let results = apply_triple_barrier(&prices, &times, 0.01, &config).unwrap();
        for r in &results {
            assert_eq!(r.barrier_hit, BarrierHit::Lower);
            assert_eq!(r.label, Label::Sell);
        }
    }

    #[test]
    fn flat_series_reaches_time_barrier() {
        let prices = [100.0; 8];
        let times = daily_times(prices.len());
        let results =
            apply_triple_barrier(&prices, &times, 0.01, &TripleBarrierConfig::default()).unwrap();
        for r in &results {
            assert_eq!(r.barrier_hit, BarrierHit::Time);
            assert_eq!(r.label, Label::Hold);
        }
    }

    #[test]
    fn input_validation() {
        let times = daily_times(2);
        assert_eq!(
            apply_triple_barrier(&[100.0], &times[..1], 0.01, &TripleBarrierConfig::default()),
            Err(BarrierError::TooFewPrices(1))
        );
        assert_eq!(
            apply_triple_barrier(
                &[100.0, 101.0],
                &times[..1],
                0.01,
                &TripleBarrierConfig::default()
            ),
            Err(BarrierError::LengthMismatch { prices: 2, times: 1 })
        );
        assert_eq!(
            apply_triple_barrier(&[100.0, 101.0], &times, 0.0, &TripleBarrierConfig::default()),
            Err(BarrierError::NonPositiveVolatility(0.0))
        );
    }

    #[test]
    fn meta_labels_flag_profitable_directions() {
        let times = daily_times(2);
        let template = BarrierResult {
            label: Label::Buy,
            entry_time: times[0],
            entry_price: 100.0,
            exit_time: times[1],
            exit_price: 105.0,
            barrier_hit: BarrierHit::Upper,
        };

        let winning_buy = template.clone();
        let losing_buy = BarrierResult { exit_price: 95.0, ..template.clone() };
        let winning_sell =
            BarrierResult { label: Label::Sell, exit_price: 95.0, ..template.clone() };
        let hold = BarrierResult { label: Label::Hold, ..template };

        assert_eq!(
            meta_labels(&[winning_buy, losing_buy, winning_sell, hold]),
            vec![true, false, true, false]
        );
    }
}
