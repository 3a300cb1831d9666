//! Technical indicators shared by the meta-labeling feature extractor.
//!
//! Deliberately small: RSI with Wilder's initial averages, a streaming EMA,
//! MACD normalized by the last price, Bollinger %B, and a realized
//! volatility estimate. Each returns a neutral default on insufficient data
//! rather than erroring, since they feed a feature vector.

use crate::stats;

/// Relative Strength Index over `period` bars.
///
/// Wilder's convention with plain initial averages over the first `period`
/// changes. Returns 50 on insufficient data and 100 when there are no
/// losses.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let change = prices[i] - prices[i - 1];
        if change >= 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Streaming exponential moving average seeded with the first price.
///
/// Falls back to the last price when the series is shorter than `period`.
pub fn ema(prices: &[f64], period: usize) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    if prices.len() < period {
        return prices[prices.len() - 1];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut value = prices[0];
    for &p in &prices[1..] {
        value = (p - value) * multiplier + value;
    }
    value
}

/// MACD line (EMA12 - EMA26) normalized by the last price; 0 when fewer
/// than 26 prices are available.
pub fn macd_normalized(prices: &[f64]) -> f64 {
    if prices.len() < 26 {
        return 0.0;
    }
    let macd = ema(prices, 12) - ema(prices, 26);
    macd / prices[prices.len() - 1]
}

/// Bollinger %B over the trailing `period` window with `num_stddev` bands.
///
/// `(p - lower) / (upper - lower)`; 0.5 on insufficient data or a flat
/// window (zero band width).
pub fn bollinger_pct_b(prices: &[f64], period: usize, num_stddev: f64) -> f64 {
    if period == 0 || prices.len() < period {
        return 0.5;
    }

    let window = &prices[prices.len() - period..];
    let sma = stats::mean(window);
    let variance = window.iter().map(|p| (p - sma) * (p - sma)).sum::<f64>() / period as f64;
    let sd = variance.sqrt();
    if sd == 0.0 {
        return 0.5;
    }

    let upper = sma + num_stddev * sd;
    let lower = sma - num_stddev * sd;
    let current = prices[prices.len() - 1];
    (current - lower) / (upper - lower)
}

/// Realized volatility: sample stddev of log returns over the whole series.
///
/// `lookback` gates the minimum amount of data; the estimate itself uses
/// every supplied price. Returns `None` below the gate.
pub fn realized_volatility(prices: &[f64], lookback: usize) -> Option<f64> {
    if prices.len() < lookback || prices.len() < 2 {
        return None;
    }
    let returns = stats::log_returns(prices);
    Some(stats::stddev(&returns))
}
