use serde::{Deserialize, Serialize};

/// Current market snapshot for a single symbol.
///
/// Created empty on subscription and mutated in place by the market feed;
/// historical analysis uses [`crate::domain::Bar`] instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub symbol: String,
    pub price: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub volume_24h: f64,
    /// 24h change, in percent.
    pub change_24h: f64,
}

impl MarketData {
    /// Empty snapshot for a freshly subscribed symbol.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), ..Self::default() }
    }

    /// True once at least one quote has been applied.
    pub fn has_price(&self) -> bool {
        self.price > 0.0
    }
}
