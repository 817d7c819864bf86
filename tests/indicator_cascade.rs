use cryptomon::application::analytics::{IndicatorEngine, IndicatorSettings};
use cryptomon::application::market_data::MeasurementStore;
use cryptomon::domain::types::{IndicatorKind, MINUTE_MS, Tick};

const EPS: f64 = 1e-9;

fn engine(symbols: &[&str]) -> IndicatorEngine {
    IndicatorEngine::new(
        symbols.iter().map(|s| s.to_string()).collect(),
        IndicatorSettings::default(),
    )
    .unwrap()
}

#[test]
fn test_single_tick_end_to_end() {
    let engine = engine(&["BTC-USDT", "ETH-USDT"]);
    let store = MeasurementStore::new();
    let t0 = 10 * MINUTE_MS;

    store.append(Tick::new("BTC-USDT", 100.0, 1.0, t0 - 30_000));
    store.append(Tick::new("BTC-USDT", 110.0, 1.0, t0 - 20_000));
    store.append(Tick::new("BTC-USDT", 90.0, 2.0, t0 - 10_000));

    let averages = engine.run_pass(&store, t0);
    assert_eq!(averages.len(), 2);

    let sma = engine.recent_averages("BTC-USDT", 0);
    assert_eq!(sma.timestamps, vec![t0]);
    assert!((sma.values[0] - 97.5).abs() < EPS);

    assert_eq!(engine.recent_close("BTC-USDT", 0).values, vec![90.0]);
    assert_eq!(engine.recent_close_volume("BTC-USDT", 0).values, vec![2.0]);

    // Every series of every symbol gets exactly one point at t0
    for symbol in ["BTC-USDT", "ETH-USDT"] {
        for kind in IndicatorKind::ALL {
            assert_eq!(engine.recent(kind, symbol, 0).timestamps, vec![t0]);
        }
    }
    assert_eq!(engine.recent_averages("ETH-USDT", 0).values, vec![0.0]);
}

#[test]
fn test_rising_prices_turn_macd_positive() {
    let engine = engine(&["SOL-USDT"]);
    let store = MeasurementStore::new();

    for minute in 1..=10 {
        let t = minute * MINUTE_MS;
        store.append(Tick::new("SOL-USDT", 100.0 + minute as f64, 1.0, t - 1_000));
        engine.run_pass(&store, t);
    }

    let macd = engine.recent_macd("SOL-USDT", 0);
    let signal = engine.recent_signal("SOL-USDT", 0);
    let distance = engine.recent_distance("SOL-USDT", 0);

    // Both EMAs seed to the same price on the first tick
    assert_eq!(macd.values[0], 0.0);
    assert!(macd.values[1..].iter().all(|v| *v > 0.0));
    assert!(macd.values.windows(2).skip(1).all(|w| w[1] > w[0]));

    // Signal seeds from the first non-zero MACD
    assert_eq!(signal.values[1], macd.values[1]);
    assert!(*distance.values.last().unwrap() > 0.0);

    let short = engine.recent_ema("SOL-USDT", 1, "short").unwrap();
    let long = engine.recent_ema("SOL-USDT", 1, "long").unwrap();
    assert!((macd.values[9] - (short.values[0] - long.values[0])).abs() < EPS);
}

const CARRIED: [IndicatorKind; 4] = [
    IndicatorKind::ShortEma,
    IndicatorKind::LongEma,
    IndicatorKind::Macd,
    IndicatorKind::ClosingPrice,
];

#[test]
fn test_quiet_minutes_carry_the_cascade_forward() {
    let engine = engine(&["ADA-USDT"]);
    let store = MeasurementStore::new();

    for minute in 1..=5 {
        let t = minute * MINUTE_MS;
        store.append(Tick::new("ADA-USDT", 0.40 + 0.01 * minute as f64, 10.0, t - 500));
        engine.run_pass(&store, t);
    }
    let gap_before = engine.recent_distance("ADA-USDT", 1).values[0];
    let before: Vec<f64> = CARRIED
        .into_iter()
        .map(|kind| engine.recent(kind, "ADA-USDT", 1).values[0])
        .collect();
    assert!(before.iter().all(|v| *v != 0.0));

    // Later minutes see no trade inside any window
    for minute in 40..=42 {
        let t = minute * MINUTE_MS;
        store.evict_older_than(0, t);
        engine.run_pass(&store, t);
    }

    let after: Vec<f64> = CARRIED
        .into_iter()
        .map(|kind| engine.recent(kind, "ADA-USDT", 1).values[0])
        .collect();
    assert_eq!(before, after);

    // The signal keeps smoothing towards the held MACD value
    let gap_after = engine.recent_distance("ADA-USDT", 1).values[0];
    assert!(gap_after > 0.0 && gap_after < gap_before);

    // SMA is always appended, with zero for an empty window
    let sma = engine.recent_averages("ADA-USDT", 3);
    assert_eq!(sma.values, vec![0.0, 0.0, 0.0]);
    assert_eq!(engine.recent_averages("ADA-USDT", 0).len(), 8);
}

#[test]
fn test_window_points_trim_from_the_tail() {
    let engine = engine(&["LTC-USDT"]);
    let store = MeasurementStore::new();
    for minute in 1..=6 {
        engine.run_pass(&store, minute * MINUTE_MS);
    }

    let tail = engine.recent_macd("LTC-USDT", 2);
    assert_eq!(tail.timestamps, vec![5 * MINUTE_MS, 6 * MINUTE_MS]);
    assert_eq!(engine.recent_macd("LTC-USDT", 0).len(), 6);
    assert_eq!(engine.recent_macd("LTC-USDT", 100).len(), 6);
}
