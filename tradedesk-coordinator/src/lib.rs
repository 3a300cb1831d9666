//! TradeDesk Coordinator
//!
//! The concurrent state holder that owns per-symbol market data, latest
//! signals, the portfolio snapshot, and risk parameters, plus the gate that
//! turns signals into broker orders. External collaborators (broker, AI
//! signal provider, market feed) are addressed purely through contracts.

pub mod broker;
pub mod coordinator;
pub mod history;
pub mod provider;
pub mod risk;

pub use broker::{BrokerClient, BrokerError, OrderRequest, OrderSide, Timeframe};
pub use coordinator::{
    CancelToken, Coordinator, CoordinatorError, CoordinatorStatus, SymbolState, TradeOutcome,
};
pub use history::{analyze_bar_history, fetch_bar_history, BarAnalysis, TrendDirection};
pub use provider::{
    EnsembleSignalProvider, HistorySource, ProviderError, QuoteUpdate, SignalListener,
    SignalProvider,
};
pub use risk::{RiskError, RiskParameters};
