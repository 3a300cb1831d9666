use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One open position, as reported by the broker.
///
/// Quantity is signed: positive long, negative short. Read-only to
/// algorithms; refreshed by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    pub symbol: String,
    pub quantity: f64,
    pub avg_entry: f64,
    pub market_value: f64,
    pub unrealized_pl: f64,
    /// Return since entry, in percent.
    pub return_pct: f64,
}

impl PositionData {
    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }
}

/// Snapshot of the whole account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioData {
    pub balance: f64,
    pub positions: HashMap<String, PositionData>,
    pub total_value: f64,
    pub daily_pnl: f64,
    /// Day-over-day return, in percent.
    pub daily_return: f64,
}

impl PortfolioData {
    pub fn position(&self, symbol: &str) -> Option<&PositionData> {
        self.positions.get(symbol)
    }
}
