//! Trade signals: the directive produced by the pipeline and consumed by
//! the coordinator gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
    Close,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "buy",
            Signal::Sell => "sell",
            Signal::Hold => "hold",
            Signal::Close => "close",
        }
    }

    /// True for the directional signals the gate turns into orders.
    pub fn is_directional(&self) -> bool {
        matches!(self, Signal::Buy | Signal::Sell)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type requested alongside a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OrderKind::Market => "market",
            OrderKind::Limit => "limit",
        })
    }
}

/// A trading directive for one symbol.
///
/// Stored latest-wins per symbol by the coordinator. `limit_price` must be
/// present and positive exactly when `order_kind` is [`OrderKind::Limit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub symbol: String,
    pub signal: Signal,
    pub order_kind: OrderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub reasoning: String,
    /// Confidence in [0, 1], when the producer reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("limit order requires a positive limit price")]
    MissingLimitPrice,

    #[error("limit price {0} must be positive")]
    NonPositiveLimitPrice(f64),

    #[error("market order must not carry a limit price")]
    UnexpectedLimitPrice,

    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

impl TradeSignal {
    /// Market-order hold with a reason, used when no better signal exists.
    pub fn hold(symbol: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            signal: Signal::Hold,
            order_kind: OrderKind::Market,
            limit_price: None,
            timestamp: Utc::now(),
            reasoning: reasoning.into(),
            confidence: None,
        }
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> Result<(), SignalError> {
        match (self.order_kind, self.limit_price) {
            (OrderKind::Limit, None) => return Err(SignalError::MissingLimitPrice),
            (OrderKind::Limit, Some(p)) if p <= 0.0 => {
                return Err(SignalError::NonPositiveLimitPrice(p))
            }
            (OrderKind::Market, Some(_)) => return Err(SignalError::UnexpectedLimitPrice),
            _ => {}
        }
        if let Some(c) = self.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(SignalError::ConfidenceOutOfRange(c));
            }
        }
        Ok(())
    }
}
