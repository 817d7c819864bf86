use crate::domain::errors::QueryError;
use crate::domain::types::{CorrelationResult, IndicatorKind, SeriesSlice};
use crate::interfaces::http::QueryState;
use crate::interfaces::http::downsample::downsample;
use crate::interfaces::http::error::ApiError;
use axum::Json;
use axum::extract::{Query, State};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

type Params = Query<HashMap<String, String>>;
type SeriesResponse = Result<Json<SeriesSlice>, ApiError>;

const MISSING_SERIES_PARAMS: &str = "Missing symbol or window parameter";
const MISSING_EMA_PARAMS: &str = "Missing symbol, window, or type parameter";
const NO_DATA: &str = "No data found for symbol";

/// All of `keys` must be present, otherwise 400 with `message`.
fn required<'a>(
    params: &'a HashMap<String, String>,
    keys: &[&str],
    message: &str,
) -> Result<Vec<&'a str>, ApiError> {
    keys.iter()
        .map(|key| params.get(*key).map(String::as_str))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

fn parse_window(raw: &str) -> Result<usize, QueryError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| QueryError::InvalidWindow(raw.to_string()))
}

fn respond(state: &QueryState, slice: SeriesSlice) -> SeriesResponse {
    if slice.is_empty() {
        return Err(ApiError::NotFound(NO_DATA.to_string()));
    }
    Ok(Json(downsample(&slice, state.max_points)))
}

fn series(state: &QueryState, params: &HashMap<String, String>, kind: IndicatorKind) -> SeriesResponse {
    let values = required(params, &["symbol", "window"], MISSING_SERIES_PARAMS)?;
    let window = parse_window(values[1])?;
    respond(state, state.indicators.recent(kind, values[0], window))
}

pub async fn sma(State(state): State<Arc<QueryState>>, Query(params): Params) -> SeriesResponse {
    series(&state, &params, IndicatorKind::Sma)
}

pub async fn ema(State(state): State<Arc<QueryState>>, Query(params): Params) -> SeriesResponse {
    let values = required(&params, &["symbol", "window", "type"], MISSING_EMA_PARAMS)?;
    let window = parse_window(values[1])?;
    let slice = state.indicators.recent_ema(values[0], window, values[2])?;
    respond(&state, slice)
}

pub async fn macd(State(state): State<Arc<QueryState>>, Query(params): Params) -> SeriesResponse {
    series(&state, &params, IndicatorKind::Macd)
}

pub async fn signal(State(state): State<Arc<QueryState>>, Query(params): Params) -> SeriesResponse {
    series(&state, &params, IndicatorKind::Signal)
}

pub async fn distance(State(state): State<Arc<QueryState>>, Query(params): Params) -> SeriesResponse {
    series(&state, &params, IndicatorKind::Distance)
}

pub async fn close(State(state): State<Arc<QueryState>>, Query(params): Params) -> SeriesResponse {
    series(&state, &params, IndicatorKind::ClosingPrice)
}

pub async fn volume(State(state): State<Arc<QueryState>>, Query(params): Params) -> SeriesResponse {
    series(&state, &params, IndicatorKind::ClosingVolume)
}

/// Latest lagged match for `symbol` as the base series.
pub async fn correlation(
    State(state): State<Arc<QueryState>>,
    Query(params): Params,
) -> Result<Json<CorrelationResult>, ApiError> {
    let values = required(&params, &["symbol"], "Missing symbol parameter")?;
    state
        .correlation
        .latest(values[0])
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No correlation found for symbol".to_string()))
}

pub async fn health(State(state): State<Arc<QueryState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "symbols": state.indicators.symbols(),
        "correlation_window": state.correlation.window(),
    }))
}
