//! Domain types: the vocabulary of TradeDesk.
//!
//! Market snapshots, historical bars, portfolio/position state, and trade
//! signals. Everything else in the workspace builds on these types.

pub mod bar;
pub mod market;
pub mod portfolio;
pub mod signal;

// Re-export the most commonly used types at the domain level.
pub use bar::{Bar, BarHistory, HistoryRequest};
pub use market::MarketData;
pub use portfolio::{PortfolioData, PositionData};
pub use signal::{OrderKind, Signal, SignalError, TradeSignal};
