use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use cryptomon::application::analytics::{CorrelationEngine, IndicatorEngine, IndicatorSettings};
use cryptomon::application::market_data::MeasurementStore;
use cryptomon::domain::types::{MINUTE_MS, Tick};
use cryptomon::interfaces::http::{ApiError, QueryState, handlers};
use std::collections::HashMap;
use std::sync::Arc;

const SYMBOL: &str = "BTC-USDT";

fn params(pairs: &[(&str, &str)]) -> Query<HashMap<String, String>> {
    Query(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

/// State with `minutes` indicator passes for BTC, one trade per minute.
fn state(minutes: i64, max_points: usize) -> Arc<QueryState> {
    let symbols = vec![SYMBOL.to_string(), "ETH-USDT".to_string()];
    let indicators = Arc::new(
        IndicatorEngine::new(symbols.clone(), IndicatorSettings::default()).unwrap(),
    );
    let store = MeasurementStore::new();
    for minute in 1..=minutes {
        let t = minute * MINUTE_MS;
        store.append(Tick::new(SYMBOL, 100.0 + minute as f64, 1.0, t - 1_000));
        indicators.run_pass(&store, t);
    }

    let correlation = Arc::new(CorrelationEngine::new(symbols, 5));
    correlation.run_pass(&indicators, minutes * MINUTE_MS);

    Arc::new(QueryState {
        indicators,
        correlation,
        max_points,
    })
}

#[tokio::test]
async fn test_missing_parameters_are_bad_requests() {
    let state = state(3, 200);

    let err = handlers::sma(State(state.clone()), params(&[("symbol", SYMBOL)]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::BadRequest("Missing symbol or window parameter".to_string())
    );

    let err = handlers::ema(
        State(state.clone()),
        params(&[("symbol", SYMBOL), ("window", "10")]),
    )
    .await
    .unwrap_err();
    assert_eq!(
        err,
        ApiError::BadRequest("Missing symbol, window, or type parameter".to_string())
    );

    let err = handlers::macd(
        State(state),
        params(&[("symbol", SYMBOL), ("window", "ten")]),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::BadRequest("Invalid window parameter".to_string()));
}

#[tokio::test]
async fn test_invalid_ema_type_is_rejected() {
    let state = state(3, 200);

    let err = handlers::ema(
        State(state),
        params(&[("symbol", SYMBOL), ("window", "10"), ("type", "weekly")]),
    )
    .await
    .unwrap_err();

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("weekly"));
}

#[tokio::test]
async fn test_unknown_symbol_is_not_found() {
    let state = state(3, 200);

    let err = handlers::close(
        State(state),
        params(&[("symbol", "NOPE-USDT"), ("window", "5")]),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::NotFound("No data found for symbol".to_string()));
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_series_are_served_with_timestamps() {
    let state = state(4, 200);

    let Json(sma) = handlers::sma(
        State(state.clone()),
        params(&[("symbol", SYMBOL), ("window", "2")]),
    )
    .await
    .unwrap();
    // Running volume-weighted mean of 101, 102, 103, 104
    assert_eq!(sma.values, vec![102.0, 102.5]);
    assert_eq!(sma.timestamps, vec![3 * MINUTE_MS, 4 * MINUTE_MS]);

    let Json(ema) = handlers::ema(
        State(state.clone()),
        params(&[("symbol", SYMBOL), ("window", "0"), ("type", "long")]),
    )
    .await
    .unwrap();
    assert_eq!(ema.len(), 4);
    assert_eq!(ema.values[0], 101.0);

    let Json(volume) = handlers::volume(
        State(state),
        params(&[("symbol", SYMBOL), ("window", "1")]),
    )
    .await
    .unwrap();
    assert_eq!(volume.values, vec![1.0]);
}

#[tokio::test]
async fn test_long_series_are_downsampled() {
    let state = state(450, 200);

    let Json(signal) = handlers::signal(
        State(state),
        params(&[("symbol", SYMBOL), ("window", "0")]),
    )
    .await
    .unwrap();

    assert_eq!(signal.len(), 200);
    // step 2, remainder 50: the first 50 picks are three apart
    assert_eq!(signal.timestamps[0], MINUTE_MS);
    assert_eq!(signal.timestamps[1], 4 * MINUTE_MS);
    assert_eq!(signal.timestamps[199], 449 * MINUTE_MS);
}

#[tokio::test]
async fn test_correlation_and_health() {
    let state = state(8, 200);

    let Json(result) = handlers::correlation(State(state.clone()), params(&[("symbol", SYMBOL)]))
        .await
        .unwrap();
    assert_eq!(result.symbol_a, SYMBOL);
    assert_eq!(result.as_of_ms, 8 * MINUTE_MS);

    let err = handlers::correlation(State(state.clone()), params(&[]))
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

    let Json(health) = handlers::health(State(state)).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["symbols"].as_array().unwrap().len(), 2);
}
