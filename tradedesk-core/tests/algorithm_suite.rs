//! End-to-end scenarios for the algorithm pipeline: literal numeric cases
//! plus the uniform lifecycle contract every algorithm must honor.

use chrono::{Duration, TimeZone, Utc};

use tradedesk_core::algos::{
    AlgorithmConfig, AlgorithmKind, AlgorithmManager, AlgorithmRegistry,
};
use tradedesk_core::domain::{MarketData, OrderKind, Signal};
use tradedesk_core::ensemble::{combine_results, ScoredResult};
use tradedesk_core::series::barrier::{apply_triple_barrier, BarrierHit, Label, TripleBarrierConfig};
use tradedesk_core::series::fracdiff::{ffd, fixed_width_frac_diff, frac_diff_weights};
use tradedesk_core::series::validation::purged_k_fold;

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

fn history_of(prices: &[f64]) -> Vec<MarketData> {
    prices.iter().map(|&p| market(p)).collect()
}

#[test]
fn weights_for_half_differencing() {
    let w = frac_diff_weights(0.5, 5);
    let expected = [1.0, -0.5, -0.125, -0.0625, -0.0390625];
    for (actual, want) in w.iter().zip(expected) {
        assert!((actual - want).abs() < 1e-12, "weight {actual} vs {want}");
    }
}

#[test]
fn fixed_width_on_a_ramp() {
    let series: Vec<f64> = (1..=10).map(|v| v as f64).collect();
    let out = fixed_width_frac_diff(&series, 0.5, 3).unwrap();
    assert_eq!(out.len(), 8);
    assert!((out[0] - 1.875).abs() < 1e-12);
}

#[test]
fn ffd_with_unit_d_recovers_first_differences() {
    let out = ffd(&[1.0, 3.0, 6.0, 10.0], 1.0, 1e-3).unwrap();
    let expected = [1.0, 2.0, 3.0, 4.0];
    for (actual, want) in out.iter().zip(expected) {
        assert!((actual - want).abs() < 1e-9);
    }
}

#[test]
fn hundred_hourly_samples_split_into_five_clean_folds() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let samples: Vec<_> = (0..100).map(|i| t0 + Duration::hours(i)).collect();

    let folds = purged_k_fold(&samples, 5, 0.0, None).unwrap();
    assert_eq!(folds.len(), 5);

    let mut coverage = vec![0u32; 100];
    for fold in &folds {
        assert!(!fold.test_indices.is_empty());
        for &t in &fold.test_indices {
            coverage[t] += 1;
            assert!(
                !fold.train_indices.contains(&t),
                "index {t} appears in both train and test"
            );
        }
    }
    assert!(coverage.iter().all(|&c| c == 1), "each index tested exactly once");
}

#[test]
fn rising_daily_series_hits_the_upper_barrier_first() {
    let prices = [100.0, 102.0, 104.0, 106.0, 108.0, 110.0];
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let times: Vec<_> = (0..prices.len()).map(|i| t0 + Duration::days(i as i64)).collect();
    let config = TripleBarrierConfig {
        profit_taking: 3.0,
        stop_loss: 2.0,
        time_horizon: 5,
        volatility_lookback: 20,
    };

    let results = apply_triple_barrier(&prices, &times, 0.01, &config).unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results[0].barrier_hit, BarrierHit::Upper);
    assert_eq!(results[0].label, Label::Buy);
}

#[test]
fn ensemble_weights_match_hand_computation() {
    let make = |signal, confidence| {
        ScoredResult::new(
            "test",
            tradedesk_core::algos::AlgorithmResult {
                signal,
                order_kind: OrderKind::Market,
                limit_price: None,
                weights: None,
                confidence,
                explanation: String::new(),
            },
        )
    };

    let combined = combine_results(&[
        make(Signal::Buy, 0.8),
        make(Signal::Buy, 0.7),
        make(Signal::Sell, 0.4),
    ])
    .unwrap();

    assert_eq!(combined.signal, Signal::Buy);
    assert!((combined.confidence - 1.5 / 1.9).abs() < 1e-9);
}

#[test]
fn every_algorithm_honors_the_lifecycle_contract() {
    let registry = AlgorithmRegistry::with_builtins();
    let history = history_of(
        &(0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 4.0 + i as f64 * 0.2).collect::<Vec<_>>(),
    );
    let current = market(115.0);

    for kind in AlgorithmKind::ALL {
        let mut algorithm = registry.create(kind).unwrap();
        algorithm
            .configure(&AlgorithmConfig::default())
            .unwrap_or_else(|e| panic!("{kind}: default config rejected: {e}"));

        let result = algorithm
            .process("SPY", &current, &history)
            .unwrap_or_else(|e| panic!("{kind}: process failed on 60 bars: {e}"));

        assert!(
            (0.0..=1.0).contains(&result.confidence),
            "{kind}: confidence {} out of range",
            result.confidence
        );
        if result.order_kind == OrderKind::Limit {
            assert!(
                result.limit_price.is_some_and(|p| p > 0.0),
                "{kind}: limit order without positive limit price"
            );
        }
        // The produced trade signal must satisfy the structural invariants.
        let signal = result.into_trade_signal("SPY");
        signal.validate().unwrap_or_else(|e| panic!("{kind}: invalid trade signal: {e}"));

        assert!(!algorithm.explain().is_empty(), "{kind}: empty explanation after process");

        // Configure never partially applies: an unknown option leaves the
        // algorithm usable with its previous options.
        let bad = AlgorithmConfig::default().with_param("no_such_option_exists", 1.0);
        assert!(algorithm.configure(&bad).is_err(), "{kind}: unknown option accepted");
        algorithm
            .process("SPY", &current, &history)
            .unwrap_or_else(|e| panic!("{kind}: process failed after rejected config: {e}"));
    }
}

#[test]
fn manager_round_trip_configure_then_process() {
    let mut manager = AlgorithmManager::with_builtins();

    let custom = AlgorithmConfig::default()
        .with_param("threshold", 2.0)
        .with_param("drift", 0.01);
    manager.configure(AlgorithmKind::CusumFilter, custom.clone()).unwrap();
    assert_eq!(manager.config(AlgorithmKind::CusumFilter).unwrap(), &custom);

    let prices: Vec<f64> = (0..40).map(|i| 100.0 + (i % 5) as f64 * 0.3).collect();
    let history = history_of(&prices);
    let result = manager
        .process_with(AlgorithmKind::CusumFilter, "SPY", &market(101.0), &history)
        .unwrap();
    assert!((0.0..=1.0).contains(&result.confidence));
}
