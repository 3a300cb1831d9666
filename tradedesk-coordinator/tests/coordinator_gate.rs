//! Gate and lifecycle tests against an in-memory broker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rust_decimal::Decimal;

use tradedesk_core::domain::{
    Bar, MarketData, OrderKind, PortfolioData, Signal, TradeSignal,
};
use tradedesk_coordinator::broker::{
    AccountSnapshot, BarRequest, BrokerClient, BrokerError, BrokerPosition, LastTrade, OrderAck,
    OrderRequest, OrderSide, Quote,
};
use tradedesk_coordinator::coordinator::{Coordinator, CoordinatorError, TradeOutcome};
use tradedesk_coordinator::provider::{
    ProviderError, QuoteUpdate, SignalListener, SignalProvider,
};
use tradedesk_coordinator::SymbolState;

// ─── Test doubles ────────────────────────────────────────────────────

struct MockBroker {
    cash: Decimal,
    equity: Decimal,
    last_equity: Decimal,
    positions: Mutex<Vec<BrokerPosition>>,
    orders: Mutex<Vec<OrderRequest>>,
    fail_account: AtomicBool,
}

impl MockBroker {
    fn new(equity: i64) -> Self {
        Self {
            cash: Decimal::from(equity),
            equity: Decimal::from(equity),
            last_equity: Decimal::from(equity),
            positions: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            fail_account: AtomicBool::new(false),
        }
    }

    fn with_position(self, symbol: &str, quantity: i64, avg_entry: i64) -> Self {
        self.positions.lock().unwrap().push(BrokerPosition {
            symbol: symbol.to_string(),
            quantity: Decimal::from(quantity),
            avg_entry: Decimal::from(avg_entry),
            market_value: Decimal::from(quantity * avg_entry),
            unrealized_pl: Decimal::ZERO,
        });
        self
    }

    fn placed_orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }
}

impl BrokerClient for MockBroker {
    fn account(&self) -> Result<AccountSnapshot, BrokerError> {
        if self.fail_account.load(Ordering::SeqCst) {
            return Err(BrokerError::NetworkUnreachable("mock outage".into()));
        }
        Ok(AccountSnapshot {
            cash: self.cash,
            equity: self.equity,
            last_equity: self.last_equity,
        })
    }

    fn positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        Ok(self.positions.lock().unwrap().clone())
    }

    fn position(&self, symbol: &str) -> Result<BrokerPosition, BrokerError> {
        self.positions
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.symbol == symbol)
            .cloned()
            .ok_or_else(|| BrokerError::PositionNotFound { symbol: symbol.to_string() })
    }

    fn place_order(&self, request: &OrderRequest) -> Result<OrderAck, BrokerError> {
        self.orders.lock().unwrap().push(request.clone());
        Ok(OrderAck { order_id: format!("mock-{}", self.orders.lock().unwrap().len()), filled_avg_price: None })
    }

    fn bars(&self, _symbol: &str, _request: &BarRequest) -> Result<Vec<Bar>, BrokerError> {
        Ok(Vec::new())
    }

    fn latest_quote(&self, _symbol: &str) -> Result<Quote, BrokerError> {
        Ok(Quote { bid: 100.0, ask: 100.1 })
    }

    fn latest_trade(&self, _symbol: &str) -> Result<LastTrade, BrokerError> {
        Ok(LastTrade { price: 100.0, size: 10.0 })
    }
}

struct CannedProvider {
    signal: Signal,
}

impl SignalProvider for CannedProvider {
    fn generate_trade_signal(
        &self,
        symbol: &str,
        _market_data: &MarketData,
        _portfolio: &PortfolioData,
    ) -> Result<TradeSignal, ProviderError> {
        Ok(TradeSignal {
            symbol: symbol.to_string(),
            signal: self.signal,
            order_kind: OrderKind::Market,
            limit_price: None,
            timestamp: Utc::now(),
            reasoning: "canned".into(),
            confidence: Some(0.8),
        })
    }
}

#[derive(Default)]
struct RecordingListener {
    seen: Mutex<Vec<String>>,
}

impl SignalListener for RecordingListener {
    fn on_signal(&self, signal: &TradeSignal) {
        self.seen.lock().unwrap().push(signal.symbol.clone());
    }
}

fn signal(symbol: &str, tag: Signal) -> TradeSignal {
    TradeSignal {
        symbol: symbol.to_string(),
        signal: tag,
        order_kind: OrderKind::Market,
        limit_price: None,
        timestamp: Utc::now(),
        reasoning: "test".into(),
        confidence: Some(0.8),
    }
}

fn started_coordinator(broker: Arc<MockBroker>) -> Coordinator {
    let coordinator = Coordinator::new(broker, None);
    coordinator.start(&["AAPL".to_string()]).unwrap();
    coordinator.update_market_data("AAPL", 100.0, 105.0, 95.0, 1_000_000.0, 0.0);
    coordinator
}

// ─── Lifecycle ───────────────────────────────────────────────────────

#[test]
fn start_refreshes_portfolio_and_enables_trading() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = Coordinator::new(broker, None);
    assert!(!coordinator.is_trading_enabled());

    coordinator.start(&["AAPL".to_string(), "MSFT".to_string()]).unwrap();
    assert!(coordinator.is_trading_enabled());
    assert_eq!(coordinator.portfolio().total_value, 10_000.0);
    assert_eq!(coordinator.symbol_state("AAPL"), Some(SymbolState::Subscribed));
}

#[test]
fn start_fails_and_stays_disabled_when_broker_is_down() {
    let broker = Arc::new(MockBroker::new(10_000));
    broker.fail_account.store(true, Ordering::SeqCst);
    let coordinator = Coordinator::new(broker, None);

    assert!(matches!(
        coordinator.start(&["AAPL".to_string()]),
        Err(CoordinatorError::Broker(_))
    ));
    assert!(!coordinator.is_trading_enabled());
}

#[test]
fn stop_is_idempotent_and_gates_processing() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker);

    coordinator.stop();
    coordinator.stop();
    assert!(!coordinator.is_trading_enabled());
    assert!(matches!(
        coordinator.process_symbol("AAPL"),
        Err(CoordinatorError::TradingDisabled)
    ));
}

#[test]
fn update_symbols_adds_and_drops_tracking() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker);
    assert!(coordinator.market_data("AAPL").is_some());

    coordinator.update_symbols(&["MSFT".to_string(), "TSLA".to_string()]);
    assert!(coordinator.market_data("AAPL").is_none());
    assert!(coordinator.signal("AAPL").is_none());
    assert!(coordinator.market_data("MSFT").is_some());
    assert_eq!(coordinator.symbol_state("TSLA"), Some(SymbolState::Subscribed));
}

// ─── Market data ─────────────────────────────────────────────────────

#[test]
fn zero_change_derives_from_prior_price() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker);

    // Prior snapshot at 100; a new price of 110 with change 0 derives +10%.
    coordinator.update_market_data("AAPL", 110.0, 112.0, 99.0, 1_000_000.0, 0.0);
    let md = coordinator.market_data("AAPL").unwrap();
    assert!((md.change_24h - 10.0).abs() < 1e-9);

    // An explicit change is taken as-is.
    coordinator.update_market_data("AAPL", 120.0, 122.0, 109.0, 1_000_000.0, 3.5);
    assert!((coordinator.market_data("AAPL").unwrap().change_24h - 3.5).abs() < 1e-9);
}

#[test]
fn feed_updates_route_through_apply_quote() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker);

    coordinator.apply_quote(&QuoteUpdate {
        symbol: "AAPL".into(),
        price: 105.0,
        high_24h: 106.0,
        low_24h: 99.0,
        volume_24h: 2_000_000.0,
        change_24h: 0.0,
    });
    let md = coordinator.market_data("AAPL").unwrap();
    assert_eq!(md.price, 105.0);
    // Derived from the prior 100.0 snapshot.
    assert!((md.change_24h - 5.0).abs() < 1e-9);
}

// ─── Signal generation ───────────────────────────────────────────────

#[test]
fn process_symbol_without_provider_stores_hold() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker);

    let stored = coordinator.process_symbol("AAPL").unwrap();
    assert_eq!(stored.signal, Signal::Hold);
    assert_eq!(coordinator.signal("AAPL").unwrap().signal, Signal::Hold);
    assert_eq!(coordinator.symbol_state("AAPL"), Some(SymbolState::SignalFresh));
}

#[test]
fn process_symbol_stores_provider_signal_and_notifies_listener() {
    let broker = Arc::new(MockBroker::new(10_000));
    let provider: Arc<dyn SignalProvider> = Arc::new(CannedProvider { signal: Signal::Buy });
    let coordinator = Coordinator::new(broker, Some(provider));
    coordinator.start(&["AAPL".to_string()]).unwrap();
    coordinator.update_market_data("AAPL", 100.0, 105.0, 95.0, 1_000_000.0, 0.0);

    let listener = Arc::new(RecordingListener::default());
    struct Forward(Arc<RecordingListener>);
    impl SignalListener for Forward {
        fn on_signal(&self, signal: &TradeSignal) {
            self.0.on_signal(signal);
        }
    }
    coordinator.set_signal_listener(Box::new(Forward(listener.clone())));

    let stored = coordinator.process_symbol("AAPL").unwrap();
    assert_eq!(stored.signal, Signal::Buy);
    assert_eq!(listener.seen.lock().unwrap().as_slice(), ["AAPL"]);
}

#[test]
fn process_symbol_rejects_unknown_symbol() {
    let broker = Arc::new(MockBroker::new(10_000));
    let provider: Arc<dyn SignalProvider> = Arc::new(CannedProvider { signal: Signal::Buy });
    let coordinator = Coordinator::new(broker, Some(provider));
    coordinator.start(&["AAPL".to_string()]).unwrap();

    assert!(matches!(
        coordinator.process_symbol("TSLA"),
        Err(CoordinatorError::UnknownSymbol(_))
    ));
}

// ─── The gate ────────────────────────────────────────────────────────

#[test]
fn buy_sizes_to_five_percent_of_total_value() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker.clone());

    // totalValue 10_000 * 5% = 500 notional at price 100: 5 shares.
    let outcome = coordinator.execute_trade(&signal("AAPL", Signal::Buy)).unwrap();
    match outcome {
        TradeOutcome::Placed { side, quantity, kind, .. } => {
            assert_eq!(side, OrderSide::Buy);
            assert_eq!(quantity, 5.0);
            assert_eq!(kind, OrderKind::Market);
        }
        other => panic!("expected a placed order, got {other:?}"),
    }

    let orders = broker.placed_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].qty, Decimal::from(5));
}

#[test]
fn buy_with_existing_long_is_a_noop() {
    let broker = Arc::new(MockBroker::new(10_000).with_position("AAPL", 10, 90));
    let coordinator = started_coordinator(broker.clone());

    let outcome = coordinator.execute_trade(&signal("AAPL", Signal::Buy)).unwrap();
    assert!(matches!(outcome, TradeOutcome::Skipped { .. }));
    assert!(broker.placed_orders().is_empty());
}

#[test]
fn sell_with_long_closes_the_exact_quantity() {
    let broker = Arc::new(MockBroker::new(10_000).with_position("AAPL", 10, 90));
    let coordinator = started_coordinator(broker.clone());

    let outcome = coordinator.execute_trade(&signal("AAPL", Signal::Sell)).unwrap();
    match outcome {
        TradeOutcome::Placed { side, quantity, .. } => {
            assert_eq!(side, OrderSide::Sell);
            assert_eq!(quantity, 10.0);
        }
        other => panic!("expected a placed order, got {other:?}"),
    }
}

#[test]
fn sell_without_position_opens_a_short() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker.clone());

    let outcome = coordinator.execute_trade(&signal("AAPL", Signal::Sell)).unwrap();
    match outcome {
        TradeOutcome::Placed { side, quantity, .. } => {
            assert_eq!(side, OrderSide::Sell);
            // floor(500 / 100) shares, sized short but ordered as abs qty.
            assert_eq!(quantity, 5.0);
        }
        other => panic!("expected a placed order, got {other:?}"),
    }
}

#[test]
fn close_without_position_is_a_noop() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker.clone());

    let outcome = coordinator.execute_trade(&signal("AAPL", Signal::Close)).unwrap();
    assert!(matches!(outcome, TradeOutcome::Skipped { .. }));
    assert!(broker.placed_orders().is_empty());
}

#[test]
fn close_long_sells_and_close_short_buys() {
    let long_broker = Arc::new(MockBroker::new(10_000).with_position("AAPL", 10, 90));
    let coordinator = started_coordinator(long_broker.clone());
    match coordinator.execute_trade(&signal("AAPL", Signal::Close)).unwrap() {
        TradeOutcome::Placed { side, quantity, .. } => {
            assert_eq!(side, OrderSide::Sell);
            assert_eq!(quantity, 10.0);
        }
        other => panic!("expected a placed order, got {other:?}"),
    }

    let short_broker = Arc::new(MockBroker::new(10_000).with_position("AAPL", -4, 90));
    let coordinator = started_coordinator(short_broker.clone());
    match coordinator.execute_trade(&signal("AAPL", Signal::Close)).unwrap() {
        TradeOutcome::Placed { side, quantity, .. } => {
            assert_eq!(side, OrderSide::Buy);
            assert_eq!(quantity, 4.0);
        }
        other => panic!("expected a placed order, got {other:?}"),
    }
}

#[test]
fn hold_places_nothing() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker.clone());

    let outcome = coordinator.execute_trade(&signal("AAPL", Signal::Hold)).unwrap();
    assert!(matches!(outcome, TradeOutcome::Skipped { .. }));
    assert!(broker.placed_orders().is_empty());
}

#[test]
fn unknown_symbol_is_rejected() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker);

    assert!(matches!(
        coordinator.execute_trade(&signal("TSLA", Signal::Buy)),
        Err(CoordinatorError::UnknownSymbol(_))
    ));
}

#[test]
fn degenerate_limit_price_is_clamped_to_the_band() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker.clone());

    let mut buy = signal("AAPL", Signal::Buy);
    buy.order_kind = OrderKind::Limit;
    buy.limit_price = Some(2.0); // absurd vs the 100.0 market

    coordinator.execute_trade(&buy).unwrap();
    let orders = broker.placed_orders();
    assert_eq!(orders.len(), 1);
    // Fallback: 0.99 * market, truncated to the cent.
    assert_eq!(orders[0].limit_price.unwrap().to_string(), "99.00");
}

#[test]
fn malformed_signal_fails_validation() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker);

    let mut bad = signal("AAPL", Signal::Buy);
    bad.order_kind = OrderKind::Limit; // no limit price
    assert!(matches!(
        coordinator.execute_trade(&bad),
        Err(CoordinatorError::InvalidSignal(_))
    ));
}

#[test]
fn executed_trades_show_up_in_status_counts() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker);

    coordinator.execute_trade(&signal("AAPL", Signal::Buy)).unwrap();
    let status = coordinator.status();
    assert!(status.is_running);
    assert_eq!(status.trades_executed_today, 1);
    assert_eq!(status.trades_executed_this_week, 1);
    assert_eq!(status.active_symbols, ["AAPL"]);
}

// ─── Risk parameters ─────────────────────────────────────────────────

#[test]
fn risk_update_is_atomic_through_the_coordinator() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker);
    let before = coordinator.risk_parameters();

    let bad = BTreeMap::from([
        ("max_position_size_percent".to_string(), 2.0),
        ("unknown_knob".to_string(), 1.0),
    ]);
    assert!(coordinator.update_risk_parameters(&bad).is_err());
    assert_eq!(coordinator.risk_parameters(), before);

    let good = BTreeMap::from([("max_position_size_percent".to_string(), 2.0)]);
    coordinator.update_risk_parameters(&good).unwrap();
    assert_eq!(coordinator.risk_parameters().max_position_size_percent, 2.0);
}

#[test]
fn tighter_risk_shrinks_order_size() {
    let broker = Arc::new(MockBroker::new(10_000));
    let coordinator = started_coordinator(broker.clone());

    let updates = BTreeMap::from([("max_position_size_percent".to_string(), 2.0)]);
    coordinator.update_risk_parameters(&updates).unwrap();

    // 2% of 10_000 = 200 notional at price 100: 2 shares.
    match coordinator.execute_trade(&signal("AAPL", Signal::Buy)).unwrap() {
        TradeOutcome::Placed { quantity, .. } => assert_eq!(quantity, 2.0),
        other => panic!("expected a placed order, got {other:?}"),
    }
}
