//! The coordinator: concurrent market/signal/portfolio state and the gate
//! that turns signals into orders.
//!
//! All mutable state sits behind one reader/writer lock. Broker and
//! provider calls block, so the coordinator copies what it needs under a
//! read lock, drops the lock, makes the external call, and reacquires a
//! write lock to store the outcome. Stored signals are `Arc`ed and replaced
//! atomically: readers never observe a torn signal.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use tradedesk_core::domain::{
    BarHistory, HistoryRequest, MarketData, OrderKind, PortfolioData, PositionData, Signal,
    SignalError, TradeSignal,
};

use crate::broker::{
    sanitize_limit_price, BrokerClient, BrokerError, OrderRequest, OrderSide, PositionIntent,
};
use crate::history::{analyze_bar_history, fetch_bar_history, BarAnalysis};
use crate::provider::{ProviderError, QuoteUpdate, SignalListener, SignalProvider};
use crate::risk::{RiskError, RiskParameters};

// ─── Errors and outcomes ─────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("trading is not enabled")]
    TradingDisabled,

    #[error("market data not found for symbol: {0}")]
    UnknownSymbol(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error("invalid signal: {0}")]
    InvalidSignal(#[from] SignalError),
}

/// What the gate did with a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    Placed { order_id: String, side: OrderSide, quantity: f64, kind: OrderKind },
    /// A legitimate no-op (hold, duplicate buy, close without position).
    Skipped { reason: String },
}

// ─── Cancellation ────────────────────────────────────────────────────

/// Process-wide cancellation flag shared with the external contracts.
///
/// `Coordinator::stop` does not trip this: stopping gates future work while
/// in-flight calls complete. Cancelling asks the externals to bail out.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ─── Per-symbol processing state ─────────────────────────────────────

/// Where a symbol sits in the process-then-execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolState {
    Subscribed,
    SignalFresh,
}

// ─── Trade counting ──────────────────────────────────────────────────

/// Day/week trade counters with automatic roll-over.
#[derive(Debug, Clone, PartialEq)]
struct TradeCounter {
    day: NaiveDate,
    week: (i32, u32),
    today: u32,
    this_week: u32,
}

impl TradeCounter {
    fn new(now: DateTime<Utc>) -> Self {
        let iso = now.iso_week();
        Self { day: now.date_naive(), week: (iso.year(), iso.week()), today: 0, this_week: 0 }
    }

    fn roll(&mut self, now: DateTime<Utc>) {
        if now.date_naive() != self.day {
            self.day = now.date_naive();
            self.today = 0;
        }
        let iso = now.iso_week();
        if (iso.year(), iso.week()) != self.week {
            self.week = (iso.year(), iso.week());
            self.this_week = 0;
        }
    }

    fn record(&mut self, now: DateTime<Utc>) {
        self.roll(now);
        self.today += 1;
        self.this_week += 1;
    }

    fn counts(&mut self, now: DateTime<Utc>) -> (u32, u32) {
        self.roll(now);
        (self.today, self.this_week)
    }
}

// ─── Status ──────────────────────────────────────────────────────────

/// Operator-facing snapshot of the coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStatus {
    pub is_running: bool,
    pub active_symbols: Vec<String>,
    pub last_signals: HashMap<String, TradeSignal>,
    pub risk_parameters: RiskParameters,
    pub trades_executed_today: u32,
    pub trades_executed_this_week: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub version: String,
}

// ─── Coordinator ─────────────────────────────────────────────────────

struct CoordinatorState {
    market_data: HashMap<String, MarketData>,
    signals: HashMap<String, Arc<TradeSignal>>,
    symbol_states: HashMap<String, SymbolState>,
    portfolio: PortfolioData,
    risk: RiskParameters,
    trading_enabled: bool,
    started_at: Option<DateTime<Utc>>,
    trades: TradeCounter,
}

/// The trading coordinator.
pub struct Coordinator {
    broker: Arc<dyn BrokerClient>,
    provider: Option<Arc<dyn SignalProvider>>,
    state: RwLock<CoordinatorState>,
    listener: Mutex<Option<Box<dyn SignalListener>>>,
    cancel: CancelToken,
}

impl Coordinator {
    pub fn new(broker: Arc<dyn BrokerClient>, provider: Option<Arc<dyn SignalProvider>>) -> Self {
        Self {
            broker,
            provider,
            state: RwLock::new(CoordinatorState {
                market_data: HashMap::new(),
                signals: HashMap::new(),
                symbol_states: HashMap::new(),
                portfolio: PortfolioData::default(),
                risk: RiskParameters::default(),
                trading_enabled: false,
                started_at: None,
                trades: TradeCounter::new(Utc::now()),
            }),
            listener: Mutex::new(None),
            cancel: CancelToken::new(),
        }
    }

    /// Reset per-symbol state, seed the symbol set, refresh the portfolio,
    /// and enable trading. Fails (leaving trading disabled) when the
    /// portfolio refresh fails.
    pub fn start(&self, symbols: &[String]) -> Result<(), CoordinatorError> {
        {
            let mut state = self.write_state();
            state.market_data.clear();
            state.signals.clear();
            state.symbol_states.clear();
            for symbol in symbols {
                state.market_data.insert(symbol.clone(), MarketData::empty(symbol.clone()));
                state.symbol_states.insert(symbol.clone(), SymbolState::Subscribed);
            }
        }

        let portfolio = Self::build_portfolio(self.broker.as_ref())?;

        let mut state = self.write_state();
        state.portfolio = portfolio;
        state.trading_enabled = true;
        state.started_at = Some(Utc::now());
        info!(symbols = symbols.len(), "started trading coordinator");
        Ok(())
    }

    /// Disable trading. Idempotent; in-flight operations complete.
    pub fn stop(&self) {
        let mut state = self.write_state();
        if state.trading_enabled {
            state.trading_enabled = false;
            for slot in state.symbol_states.values_mut() {
                *slot = SymbolState::Subscribed;
            }
            info!("stopped trading coordinator");
        }
    }

    pub fn is_trading_enabled(&self) -> bool {
        self.read_state().trading_enabled
    }

    /// Replace the tracked symbol set.
    ///
    /// New symbols get an empty snapshot; dropped symbols lose their market
    /// data, stored signal, and processing state.
    pub fn update_symbols(&self, symbols: &[String]) {
        let mut state = self.write_state();
        state.market_data.retain(|symbol, _| symbols.contains(symbol));
        state.signals.retain(|symbol, _| symbols.contains(symbol));
        state.symbol_states.retain(|symbol, _| symbols.contains(symbol));
        for symbol in symbols {
            state
                .market_data
                .entry(symbol.clone())
                .or_insert_with(|| MarketData::empty(symbol.clone()));
            state.symbol_states.entry(symbol.clone()).or_insert(SymbolState::Subscribed);
        }
        info!(symbols = symbols.len(), "updated tracked symbols");
    }

    /// Token shared with broker/provider implementations so they can honor
    /// process-wide cancellation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Register the callback invoked after each stored signal.
    pub fn set_signal_listener(&self, listener: Box<dyn SignalListener>) {
        *self.listener.lock().expect("listener lock poisoned") = Some(listener);
    }

    /// Replace a symbol's market snapshot.
    ///
    /// A zero change with a prior price derives the change from the
    /// previous snapshot.
    pub fn update_market_data(
        &self,
        symbol: &str,
        price: f64,
        high_24h: f64,
        low_24h: f64,
        volume_24h: f64,
        change_24h: f64,
    ) {
        let mut state = self.write_state();
        let mut change = change_24h;
        if change == 0.0 {
            if let Some(prior) = state.market_data.get(symbol) {
                if prior.price > 0.0 {
                    change = (price - prior.price) / prior.price * 100.0;
                }
            }
        }
        state.market_data.insert(
            symbol.to_string(),
            MarketData {
                symbol: symbol.to_string(),
                price,
                high_24h,
                low_24h,
                volume_24h,
                change_24h: change,
            },
        );
        state.symbol_states.entry(symbol.to_string()).or_insert(SymbolState::Subscribed);
    }

    /// Route one market-feed push into the snapshot map.
    pub fn apply_quote(&self, update: &QuoteUpdate) {
        self.update_market_data(
            &update.symbol,
            update.price,
            update.high_24h,
            update.low_24h,
            update.volume_24h,
            update.change_24h,
        );
    }

    /// Generate and store a signal for one symbol.
    ///
    /// Without a configured provider a hold signal is synthesized rather
    /// than failing. Provider failures surface unchanged and are not
    /// retried here.
    pub fn process_symbol(&self, symbol: &str) -> Result<Arc<TradeSignal>, CoordinatorError> {
        if !self.read_state().trading_enabled {
            return Err(CoordinatorError::TradingDisabled);
        }

        let Some(provider) = &self.provider else {
            warn!(symbol, "no signal provider configured, storing hold signal");
            let signal = Arc::new(TradeSignal::hold(
                symbol,
                "Signal generation skipped: AI signal provider not available.",
            ));
            self.store_signal(signal.clone());
            return Ok(signal);
        };

        // Copy the inputs under a read lock; the provider call blocks.
        let (market_data, portfolio) = {
            let state = self.read_state();
            let market_data = state
                .market_data
                .get(symbol)
                .cloned()
                .ok_or_else(|| CoordinatorError::UnknownSymbol(symbol.to_string()))?;
            (market_data, state.portfolio.clone())
        };

        let signal = provider.generate_trade_signal(symbol, &market_data, &portfolio)?;
        signal.validate()?;
        let signal = Arc::new(signal);
        self.store_signal(signal.clone());
        info!(symbol, signal = %signal.signal, "generated signal");
        Ok(signal)
    }

    fn store_signal(&self, signal: Arc<TradeSignal>) {
        {
            let mut state = self.write_state();
            state.signals.insert(signal.symbol.clone(), signal.clone());
            state.symbol_states.insert(signal.symbol.clone(), SymbolState::SignalFresh);
        }
        if let Some(listener) = self.listener.lock().expect("listener lock poisoned").as_ref() {
            listener.on_signal(&signal);
        }
    }

    /// The gate: convert a signal into a broker order, respecting position
    /// and risk guards.
    pub fn execute_trade(&self, signal: &TradeSignal) -> Result<TradeOutcome, CoordinatorError> {
        signal.validate()?;

        let (market_data, position, total_value, max_position_pct) = {
            let state = self.read_state();
            let market_data = state
                .market_data
                .get(&signal.symbol)
                .cloned()
                .ok_or_else(|| CoordinatorError::UnknownSymbol(signal.symbol.clone()))?;
            (
                market_data,
                state.portfolio.position(&signal.symbol).cloned(),
                state.portfolio.total_value,
                state.risk.max_position_size_percent,
            )
        };

        let has_long = position.as_ref().is_some_and(PositionData::is_long);
        let notional = total_value * max_position_pct / 100.0;

        let (side, intent, quantity) = match signal.signal {
            Signal::Buy => {
                if has_long {
                    info!(symbol = %signal.symbol, "already long, skipping buy signal");
                    return Ok(TradeOutcome::Skipped {
                        reason: format!("already have a long position in {}", signal.symbol),
                    });
                }
                let qty = calculate_position_size(notional, market_data.price, true);
                (OrderSide::Buy, PositionIntent::BuyToOpen, qty)
            }
            Signal::Sell => {
                if let Some(pos) = position.as_ref().filter(|p| p.is_long()) {
                    // Close the long in full.
                    (OrderSide::Sell, PositionIntent::SellToClose, pos.quantity)
                } else {
                    // No long: open a short (signed negative by convention).
                    let qty = calculate_position_size(notional, market_data.price, false);
                    (OrderSide::Sell, PositionIntent::SellToClose, qty)
                }
            }
            Signal::Close => {
                let Some(pos) = position else {
                    info!(symbol = %signal.symbol, "no position to close");
                    return Ok(TradeOutcome::Skipped {
                        reason: format!("no position to close for {}", signal.symbol),
                    });
                };
                let side = if pos.is_long() { OrderSide::Sell } else { OrderSide::Buy };
                let intent = if pos.is_long() {
                    PositionIntent::SellToClose
                } else {
                    PositionIntent::BuyToOpen
                };
                (side, intent, pos.quantity.abs())
            }
            Signal::Hold => {
                info!(symbol = %signal.symbol, "hold signal, no action taken");
                return Ok(TradeOutcome::Skipped {
                    reason: format!("hold signal for {}, no action taken", signal.symbol),
                });
            }
        };

        let order_qty = quantity.abs();
        let request = match signal.order_kind {
            OrderKind::Market => {
                OrderRequest::market(signal.symbol.clone(), side, order_qty, intent)
            }
            OrderKind::Limit => {
                let sane = sanitize_limit_price(side, signal.limit_price, market_data.price);
                OrderRequest::limit(signal.symbol.clone(), side, order_qty, intent, sane)
            }
        };

        info!(
            symbol = %signal.symbol,
            side = side.as_str(),
            qty = %request.qty,
            kind = %request.kind,
            "placing order"
        );
        let ack = self.broker.place_order(&request)?;

        {
            let mut state = self.write_state();
            state.trades.record(Utc::now());
            state.symbol_states.insert(signal.symbol.clone(), SymbolState::Subscribed);
        }
        info!(symbol = %signal.symbol, order_id = %ack.order_id, "order placed successfully");

        Ok(TradeOutcome::Placed {
            order_id: ack.order_id,
            side,
            quantity: order_qty,
            kind: signal.order_kind,
        })
    }

    /// Refresh the portfolio snapshot from the broker.
    ///
    /// On failure the previous snapshot is left intact.
    pub fn update_portfolio(&self) -> Result<(), CoordinatorError> {
        let portfolio = Self::build_portfolio(self.broker.as_ref())?;
        self.write_state().portfolio = portfolio;
        Ok(())
    }

    fn build_portfolio(broker: &dyn BrokerClient) -> Result<PortfolioData, BrokerError> {
        let account = broker.account()?;
        let broker_positions = broker.positions()?;

        let cash = account.cash.to_f64().unwrap_or(0.0);
        let equity = account.equity.to_f64().unwrap_or(0.0);
        let last_equity = account.last_equity.to_f64().unwrap_or(0.0);

        let daily_pnl = equity - last_equity;
        let daily_return = if last_equity > 0.0 { daily_pnl / last_equity * 100.0 } else { 0.0 };

        let mut positions = HashMap::with_capacity(broker_positions.len());
        for pos in broker_positions {
            let quantity = pos.quantity.to_f64().unwrap_or(0.0);
            let avg_entry = pos.avg_entry.to_f64().unwrap_or(0.0);
            let market_value = pos.market_value.to_f64().unwrap_or(0.0);
            let unrealized_pl = pos.unrealized_pl.to_f64().unwrap_or(0.0);

            let return_pct = if quantity > 0.0 && avg_entry > 0.0 {
                let current = market_value / quantity;
                (current - avg_entry) / avg_entry * 100.0
            } else {
                0.0
            };

            positions.insert(
                pos.symbol.clone(),
                PositionData {
                    symbol: pos.symbol,
                    quantity,
                    avg_entry,
                    market_value,
                    unrealized_pl,
                    return_pct,
                },
            );
        }

        Ok(PortfolioData {
            balance: cash,
            positions,
            total_value: equity,
            daily_pnl,
            daily_return,
        })
    }

    /// Validate and apply an operator risk update atomically.
    pub fn update_risk_parameters(
        &self,
        updates: &BTreeMap<String, f64>,
    ) -> Result<(), CoordinatorError> {
        self.write_state().risk.apply_update(updates)?;
        Ok(())
    }

    pub fn risk_parameters(&self) -> RiskParameters {
        self.read_state().risk.clone()
    }

    pub fn market_data(&self, symbol: &str) -> Option<MarketData> {
        self.read_state().market_data.get(symbol).cloned()
    }

    /// Latest stored signal for a symbol.
    pub fn signal(&self, symbol: &str) -> Option<Arc<TradeSignal>> {
        self.read_state().signals.get(symbol).cloned()
    }

    /// All latest signals.
    pub fn signals(&self) -> HashMap<String, Arc<TradeSignal>> {
        self.read_state().signals.clone()
    }

    pub fn portfolio(&self) -> PortfolioData {
        self.read_state().portfolio.clone()
    }

    pub fn symbol_state(&self, symbol: &str) -> Option<SymbolState> {
        self.read_state().symbol_states.get(symbol).copied()
    }

    /// Operator status snapshot, rolling the trade counters first.
    pub fn status(&self) -> CoordinatorStatus {
        let mut state = self.write_state();
        let (today, this_week) = state.trades.counts(Utc::now());

        let mut active_symbols: Vec<String> = state.market_data.keys().cloned().collect();
        active_symbols.sort();

        CoordinatorStatus {
            is_running: state.trading_enabled,
            active_symbols,
            last_signals: state
                .signals
                .iter()
                .map(|(k, v)| (k.clone(), v.as_ref().clone()))
                .collect(),
            risk_parameters: state.risk.clone(),
            trades_executed_today: today,
            trades_executed_this_week: this_week,
            started_at: state.started_at,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Fetch a bar history through the broker contract.
    pub fn bar_history(&self, request: &HistoryRequest) -> Result<BarHistory, CoordinatorError> {
        Ok(fetch_bar_history(self.broker.as_ref(), request)?)
    }

    /// Fetch and analyze in one step.
    pub fn bar_analysis(&self, request: &HistoryRequest) -> Result<BarAnalysis, CoordinatorError> {
        let history = self.bar_history(request)?;
        Ok(analyze_bar_history(&history))
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, CoordinatorState> {
        self.state.read().expect("coordinator state lock poisoned")
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, CoordinatorState> {
        self.state.write().expect("coordinator state lock poisoned")
    }
}

/// Shares for a notional at the current price: `floor(notional / price)`,
/// negated for shorts. A non-positive price is treated as 1.0 with a
/// warning rather than failing the trade.
fn calculate_position_size(notional: f64, current_price: f64, is_buy: bool) -> f64 {
    let price = if current_price <= 0.0 {
        warn!(current_price, "invalid current price, using 1.0");
        1.0
    } else {
        current_price
    };

    let qty = (notional / price).floor();
    if is_buy {
        qty
    } else {
        -qty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn position_size_floors_and_signs() {
        assert_eq!(calculate_position_size(500.0, 100.0, true), 5.0);
        assert_eq!(calculate_position_size(599.0, 100.0, true), 5.0);
        assert_eq!(calculate_position_size(500.0, 100.0, false), -5.0);
        assert_eq!(calculate_position_size(50.0, 100.0, true), 0.0);
    }

    #[test]
    fn invalid_price_falls_back_to_one() {
        assert_eq!(calculate_position_size(500.0, 0.0, true), 500.0);
        assert_eq!(calculate_position_size(500.0, -3.0, false), -500.0);
    }

    #[test]
    fn trade_counter_rolls_daily_and_weekly() {
        let monday = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let mut counter = TradeCounter::new(monday);

        counter.record(monday);
        counter.record(monday);
        assert_eq!(counter.counts(monday), (2, 2));

        // Next day, same ISO week: daily resets, weekly holds.
        let tuesday = monday + chrono::Duration::days(1);
        counter.record(tuesday);
        assert_eq!(counter.counts(tuesday), (1, 3));

        // Next week: both reset.
        let next_monday = monday + chrono::Duration::days(7);
        assert_eq!(counter.counts(next_monday), (0, 0));
    }

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(!token.is_cancelled());
        shared.cancel();
        assert!(token.is_cancelled());
    }
}
