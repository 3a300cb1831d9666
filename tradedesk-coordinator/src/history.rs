//! Bar-history fetch and descriptive analytics.
//!
//! Analytics here describe a series (trend, volatility, ranges); they are
//! never trading signals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use tradedesk_core::domain::{BarHistory, HistoryRequest};

use crate::broker::{BarRequest, BrokerClient, BrokerError, Timeframe};

/// Deadband, in percent, inside which a trend reads as neutral.
const TREND_DEADBAND_PCT: f64 = 1.0;

/// Window for the recent-activity metrics.
const RECENT_WINDOW: usize = 10;

/// Descriptive statistics over one bar history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarAnalysis {
    pub symbol: String,
    pub timeframe: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bar_count: usize,
    pub avg_volume: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub price_range: f64,
    /// Mean squared per-bar relative return, in percent.
    pub volatility: f64,
    pub trend_direction: TrendDirection,
    pub trend_strength: f64,
    pub percentage_change: f64,
    pub recent_volume: f64,
    pub recent_volatility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

/// Fetch bars through the broker contract and shape them as a history.
pub fn fetch_bar_history(
    broker: &dyn BrokerClient,
    request: &HistoryRequest,
) -> Result<BarHistory, BrokerError> {
    let bar_request = BarRequest {
        timeframe: Timeframe::parse(&request.timeframe),
        start: request.start,
        end: request.end,
    };
    let bars = broker.bars(&request.symbol, &bar_request)?;

    info!(
        symbol = %request.symbol,
        bars = bars.len(),
        timeframe = bar_request.timeframe.as_str(),
        "fetched historical bars"
    );

    Ok(BarHistory {
        symbol: request.symbol.clone(),
        timeframe: bar_request.timeframe.as_str().to_string(),
        start: request.start,
        end: request.end,
        bars,
    })
}

/// Compute descriptive analytics over a fetched history.
pub fn analyze_bar_history(history: &BarHistory) -> BarAnalysis {
    let mut analysis = BarAnalysis {
        symbol: history.symbol.clone(),
        timeframe: history.timeframe.clone(),
        start: history.start,
        end: history.end,
        bar_count: history.bars.len(),
        avg_volume: 0.0,
        avg_price: 0.0,
        min_price: 0.0,
        max_price: 0.0,
        price_range: 0.0,
        volatility: 0.0,
        trend_direction: TrendDirection::Neutral,
        trend_strength: 0.0,
        percentage_change: 0.0,
        recent_volume: 0.0,
        recent_volatility: 0.0,
    };

    let bars = &history.bars;
    if bars.is_empty() {
        return analysis;
    }

    let mut sum_volume = 0.0;
    let mut sum_close = 0.0;
    let mut sum_squared_returns = 0.0;
    let mut min_price = bars[0].low;
    let mut max_price = bars[0].high;

    for (i, bar) in bars.iter().enumerate() {
        min_price = min_price.min(bar.low);
        max_price = max_price.max(bar.high);
        sum_volume += bar.volume;
        sum_close += bar.close;

        if i > 0 {
            let prev_close = bars[i - 1].close;
            if prev_close > 0.0 {
                let r = (bar.close - prev_close) / prev_close;
                sum_squared_returns += r * r;
            }
        }
    }

    let n = bars.len() as f64;
    analysis.avg_volume = sum_volume / n;
    analysis.avg_price = sum_close / n;
    analysis.min_price = min_price;
    analysis.max_price = max_price;
    analysis.price_range = max_price - min_price;
    if bars.len() > 1 {
        analysis.volatility = sum_squared_returns / (bars.len() - 1) as f64 * 100.0;
    }

    let first_close = bars[0].close;
    let last_close = bars[bars.len() - 1].close;
    if first_close > 0.0 {
        analysis.percentage_change = (last_close - first_close) / first_close * 100.0;
    }
    if analysis.percentage_change > TREND_DEADBAND_PCT {
        analysis.trend_direction = TrendDirection::Up;
        analysis.trend_strength = analysis.percentage_change;
    } else if analysis.percentage_change < -TREND_DEADBAND_PCT {
        analysis.trend_direction = TrendDirection::Down;
        analysis.trend_strength = -analysis.percentage_change;
    }

    // Recent-window activity: the last min(10, n) bars.
    let recent_count = RECENT_WINDOW.min(bars.len());
    let recent = &bars[bars.len() - recent_count..];
    let mut recent_volume_sum = 0.0;
    let mut recent_squared_returns = 0.0;
    for (i, bar) in recent.iter().enumerate() {
        recent_volume_sum += bar.volume;
        if i > 0 {
            let prev_close = recent[i - 1].close;
            if prev_close > 0.0 {
                let r = (bar.close - prev_close) / prev_close;
                recent_squared_returns += r * r;
            }
        }
    }
    analysis.recent_volume = recent_volume_sum / recent_count as f64;
    if recent_count > 1 {
        analysis.recent_volatility = recent_squared_returns / (recent_count - 1) as f64 * 100.0;
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tradedesk_core::domain::Bar;

    fn history_from_closes(closes: &[f64]) -> BarHistory {
        let t0 = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                Bar::new(
                    "SPY",
                    t0 + chrono::Duration::days(i as i64),
                    close - 0.5,
                    close + 1.0,
                    close - 1.0,
                    close,
                    10_000.0 + i as f64 * 100.0,
                )
            })
            .collect();
        BarHistory {
            symbol: "SPY".into(),
            timeframe: "1D".into(),
            start: t0,
            end: t0 + chrono::Duration::days(closes.len() as i64),
            bars,
        }
    }

    #[test]
    fn empty_history_yields_zeroed_analysis() {
        let history = BarHistory {
            symbol: "SPY".into(),
            timeframe: "1D".into(),
            start: Utc::now(),
            end: Utc::now(),
            bars: vec![],
        };
        let analysis = analyze_bar_history(&history);
        assert_eq!(analysis.bar_count, 0);
        assert_eq!(analysis.trend_direction, TrendDirection::Neutral);
    }

    #[test]
    fn uptrend_beyond_deadband_reads_up() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let analysis = analyze_bar_history(&history_from_closes(&closes));
        assert_eq!(analysis.trend_direction, TrendDirection::Up);
        assert!(analysis.trend_strength > 0.0);
        assert!(analysis.volatility > 0.0);
    }

    #[test]
    fn small_moves_stay_neutral() {
        // +0.5% end to end: inside the 1% deadband.
        let closes = [100.0, 100.2, 100.1, 100.4, 100.5];
        let analysis = analyze_bar_history(&history_from_closes(&closes));
        assert_eq!(analysis.trend_direction, TrendDirection::Neutral);
        assert_eq!(analysis.trend_strength, 0.0);
    }

    #[test]
    fn downtrend_strength_is_positive() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let analysis = analyze_bar_history(&history_from_closes(&closes));
        assert_eq!(analysis.trend_direction, TrendDirection::Down);
        assert!(analysis.trend_strength > 0.0);
    }

    #[test]
    fn ranges_and_averages() {
        let closes = [100.0, 102.0, 101.0];
        let analysis = analyze_bar_history(&history_from_closes(&closes));
        assert_eq!(analysis.min_price, 99.0);
        assert_eq!(analysis.max_price, 103.0);
        assert_eq!(analysis.price_range, 4.0);
        assert!((analysis.avg_price - 101.0).abs() < 1e-9);
    }

    #[test]
    fn recent_window_caps_at_ten_bars() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let analysis = analyze_bar_history(&history_from_closes(&closes));
        // Last 10 bars' volumes: 12_000 .. 12_900.
        assert!((analysis.recent_volume - 12_450.0).abs() < 1e-6);
    }
}
