//! Broker contract: the opaque order-execution and market-data interface.
//!
//! Quantities and prices cross this boundary as base-10 decimals so orders
//! never carry sub-penny increments; internal algorithmic math stays in
//! binary floating point. Implementations are expected to honor the
//! coordinator's cancellation token, handed to them at construction.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use tradedesk_core::domain::{Bar, OrderKind};

/// Structured broker failures, displayable to the operator.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by broker (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("position not found: {symbol}")]
    PositionNotFound { symbol: String },

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("broker error: {0}")]
    Other(String),
}

/// Account summary used to refresh the portfolio snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub cash: Decimal,
    pub equity: Decimal,
    pub last_equity: Decimal,
}

/// One open position as the broker reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_entry: Decimal,
    pub market_value: Decimal,
    pub unrealized_pl: Decimal,
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

/// Declared intent, required by the broker to disambiguate opens from
/// closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionIntent {
    BuyToOpen,
    SellToClose,
}

/// Supported order lifetime. Day orders only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
}

/// A fully formed order: quantities at 6 decimal places, limit prices at 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub qty: Decimal,
    pub time_in_force: TimeInForce,
    pub position_intent: PositionIntent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
}

impl OrderRequest {
    pub fn market(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: f64,
        intent: PositionIntent,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            kind: OrderKind::Market,
            qty: qty_decimal(qty),
            time_in_force: TimeInForce::Day,
            position_intent: intent,
            limit_price: None,
        }
    }

    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: f64,
        intent: PositionIntent,
        limit_price: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            kind: OrderKind::Limit,
            qty: qty_decimal(qty),
            time_in_force: TimeInForce::Day,
            position_intent: intent,
            limit_price: Some(cents_decimal(limit_price)),
        }
    }
}

/// Broker acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_avg_price: Option<Decimal>,
}

/// Latest top-of-book quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

/// Latest executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastTrade {
    pub price: f64,
    pub size: f64,
}

/// Supported bar timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    OneMin,
    FiveMin,
    FifteenMin,
    OneHour,
    OneDay,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneMin => "1Min",
            Timeframe::FiveMin => "5Min",
            Timeframe::FifteenMin => "15Min",
            Timeframe::OneHour => "1H",
            Timeframe::OneDay => "1D",
        }
    }

    /// Parse a timeframe label; unknown labels fall back to one day with a
    /// diagnostic.
    pub fn parse(label: &str) -> Self {
        match label {
            "1Min" => Timeframe::OneMin,
            "5Min" => Timeframe::FiveMin,
            "15Min" => Timeframe::FifteenMin,
            "1H" => Timeframe::OneHour,
            "1D" => Timeframe::OneDay,
            other => {
                warn!(timeframe = other, "unrecognized timeframe, defaulting to 1D");
                Timeframe::OneDay
            }
        }
    }
}

/// Historical bar request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRequest {
    pub timeframe: Timeframe,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The broker-facing operations the coordinator depends on.
///
/// Calls may block on the network; the coordinator invokes them outside its
/// state lock.
pub trait BrokerClient: Send + Sync {
    fn account(&self) -> Result<AccountSnapshot, BrokerError>;

    fn positions(&self) -> Result<Vec<BrokerPosition>, BrokerError>;

    /// A single position; `PositionNotFound` when flat.
    fn position(&self, symbol: &str) -> Result<BrokerPosition, BrokerError>;

    fn place_order(&self, request: &OrderRequest) -> Result<OrderAck, BrokerError>;

    fn bars(&self, symbol: &str, request: &BarRequest) -> Result<Vec<Bar>, BrokerError>;

    fn latest_quote(&self, symbol: &str) -> Result<Quote, BrokerError>;

    fn latest_trade(&self, symbol: &str) -> Result<LastTrade, BrokerError>;
}

/// Quantity at the broker's 6-decimal-place precision.
pub fn qty_decimal(qty: f64) -> Decimal {
    let mut qty = Decimal::from_f64(qty).unwrap_or_default().round_dp(6);
    qty.rescale(6);
    qty
}

/// Price truncated toward zero to a whole cent, always at 2-dp scale.
pub fn cents_decimal(price: f64) -> Decimal {
    let mut cents = Decimal::from_f64(price)
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);
    cents.rescale(2);
    cents
}

/// Clamp a strategy-proposed limit price to a sane band around the market.
///
/// Buys accept [0.70, 1.05] of the market price and fall back to 0.99x;
/// sells accept [0.70, 1.30] and fall back to 1.01x. A missing or
/// non-positive proposal uses the market price itself. The band protects
/// against degenerate strategy output while still permitting aggressive
/// liquidity-taking.
pub fn sanitize_limit_price(side: OrderSide, proposed: Option<f64>, market_price: f64) -> f64 {
    let Some(proposed) = proposed.filter(|p| *p > 0.0) else {
        return market_price;
    };

    let (band, fallback) = match side {
        OrderSide::Buy => ((market_price * 0.70, market_price * 1.05), market_price * 0.99),
        OrderSide::Sell => ((market_price * 0.70, market_price * 1.30), market_price * 1.01),
    };

    if proposed < band.0 || proposed > band.1 {
        warn!(
            side = side.as_str(),
            proposed, market_price, "limit price outside reasonable range, adjusting"
        );
        fallback
    } else {
        proposed
    }
}
