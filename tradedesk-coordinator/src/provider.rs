//! Signal-provider and market-feed contracts.
//!
//! The AI provider is an opaque, possibly slow call; the coordinator copies
//! its inputs before invoking it and never holds a lock across the call.
//! `EnsembleSignalProvider` is a self-contained implementation backed by
//! the core algorithm ensemble, useful when no external AI is wired in.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradedesk_core::algos::AlgorithmManager;
use tradedesk_core::domain::{MarketData, PortfolioData, TradeSignal};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("signal provider unavailable: {0}")]
    Unavailable(String),

    #[error("signal generation failed: {0}")]
    Generation(String),
}

/// Generates a trade signal for one symbol from current market and
/// portfolio state.
pub trait SignalProvider: Send + Sync {
    fn generate_trade_signal(
        &self,
        symbol: &str,
        market_data: &MarketData,
        portfolio: &PortfolioData,
    ) -> Result<TradeSignal, ProviderError>;
}

/// Callback invoked after each signal the coordinator stores.
///
/// Implementations must not block for long and must not mutate the signal.
pub trait SignalListener: Send + Sync {
    fn on_signal(&self, signal: &TradeSignal);
}

/// Supplies recent per-symbol history to providers that need context the
/// push feed does not carry.
pub trait HistorySource: Send + Sync {
    fn recent_history(&self, symbol: &str) -> Result<Vec<MarketData>, ProviderError>;
}

/// A provider that answers from the registered algorithm ensemble.
///
/// Runs every algorithm over the symbol's recent history and converts the
/// combined result into a trade signal.
pub struct EnsembleSignalProvider<H> {
    manager: Mutex<AlgorithmManager>,
    history: H,
}

impl<H: HistorySource> EnsembleSignalProvider<H> {
    pub fn new(manager: AlgorithmManager, history: H) -> Self {
        Self { manager: Mutex::new(manager), history }
    }
}

impl<H: HistorySource> SignalProvider for EnsembleSignalProvider<H> {
    fn generate_trade_signal(
        &self,
        symbol: &str,
        market_data: &MarketData,
        _portfolio: &PortfolioData,
    ) -> Result<TradeSignal, ProviderError> {
        let history = self.history.recent_history(symbol)?;
        let mut manager = self.manager.lock().expect("ensemble manager poisoned");
        let result = manager
            .process_with_all(symbol, market_data, &history)
            .map_err(|e| ProviderError::Generation(e.to_string()))?;
        Ok(result.into_trade_signal(symbol))
    }
}

/// One push update from the market-data stream.
///
/// The stream delivers these at arbitrary times; consumers route them into
/// `Coordinator::update_market_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteUpdate {
    pub symbol: String,
    pub price: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub volume_24h: f64,
    /// Zero when the feed does not carry a change figure; the coordinator
    /// derives one from the previous snapshot.
    pub change_24h: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedHistory(Vec<MarketData>);

    impl HistorySource for CannedHistory {
        fn recent_history(&self, _symbol: &str) -> Result<Vec<MarketData>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    fn market(price: f64) -> MarketData {
        MarketData {
            symbol: "SPY".into(),
            price,
            high_24h: price * 1.01,
            low_24h: price * 0.99,
            volume_24h: 1_000_000.0,
            change_24h: 0.0,
        }
    }

    #[test]
    fn ensemble_provider_produces_a_valid_signal() {
        let history: Vec<MarketData> = (0..50).map(|i| market(100.0 + i as f64)).collect();
        let provider =
            EnsembleSignalProvider::new(AlgorithmManager::with_builtins(), CannedHistory(history));

        let signal = provider
            .generate_trade_signal("SPY", &market(152.0), &PortfolioData::default())
            .unwrap();
        assert_eq!(signal.symbol, "SPY");
        signal.validate().unwrap();
        assert!(!signal.reasoning.is_empty());
    }

    #[test]
    fn empty_history_degrades_to_hold() {
        // Data-hungry algorithms fail and are excluded; the single-asset
        // reductions degrade to holds, so the combined signal is a hold.
        let provider =
            EnsembleSignalProvider::new(AlgorithmManager::with_builtins(), CannedHistory(vec![]));
        let signal = provider
            .generate_trade_signal("SPY", &market(100.0), &PortfolioData::default())
            .unwrap();
        assert_eq!(signal.signal, tradedesk_core::domain::Signal::Hold);
    }
}
