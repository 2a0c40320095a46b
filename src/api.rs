// src/api.rs
//! HTTP boundary over the aggregation engine.
//!
//! `POST /search` never turns per-source problems into HTTP errors: partial
//! and empty result sets are 200s, with details under `warnings`. Only a bad
//! request body (400) or an engine-level failure (500) are errors.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::engine::{AggregateReport, AggregationEngine};
use crate::margin::MarginQuote;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AggregationEngine>,
}

impl AppState {
    pub fn new(engine: AggregationEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": msg.into() })))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/platforms", get(platforms))
        .route("/search", post(search))
        .route("/margin", post(margin))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn platforms(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "platforms": state.engine.factory().platforms() }))
}

#[derive(Deserialize)]
struct SearchReq {
    query: String,
    #[serde(default)]
    platforms: Option<Vec<String>>,
}

async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchReq>, JsonRejection>,
) -> Result<Json<AggregateReport>, ApiError> {
    let Json(req) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    if req.query.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "query must be a non-empty string",
        ));
    }

    match state
        .engine
        .aggregate(&req.query, req.platforms.as_deref())
        .await
    {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            tracing::error!(error = ?e, "aggregate search failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))
        }
    }
}

#[derive(Deserialize)]
struct MarginReq {
    cost: f64,
    sale_price: f64,
    #[serde(default)]
    fee_pct: f64,
}

async fn margin(
    body: Result<Json<MarginReq>, JsonRejection>,
) -> Result<Json<MarginQuote>, ApiError> {
    let Json(req) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    let valid = |x: f64| x.is_finite() && x >= 0.0;
    if !(valid(req.cost) && valid(req.sale_price) && valid(req.fee_pct)) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "cost, sale_price and fee_pct must be non-negative numbers",
        ));
    }
    Ok(Json(MarginQuote::compute(
        req.cost,
        req.sale_price,
        req.fee_pct,
    )))
}
