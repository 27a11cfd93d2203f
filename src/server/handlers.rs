//! HTTP request handlers for API endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use super::state::AppState;
use crate::artifact::{query_forecasts, ForecastQuery};

/// Health check endpoint
///
/// Returns a simple status response to verify the server is running
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok"
    }))
}

/// Single forecast day in response
#[derive(Debug, Serialize)]
pub struct ForecastPoint {
    /// ISO calendar date
    pub date: String,
    pub forecast: f64,
}

/// Response for forecast query
#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub store_id: String,
    pub item_id: String,
    pub rows: Vec<ForecastPoint>,
}

/// GET /forecast - Forecast rows of one series from the latest artifact
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, ApiError> {
    query.validate()?;

    // The artifact can be rewritten between requests, so read it every time
    let path = state.forecast_path().to_path_buf();
    let lookup = query.clone();
    let rows = tokio::task::spawn_blocking(move || query_forecasts(path, &lookup))
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))??;

    Ok(Json(ForecastResponse {
        store_id: query.store_id,
        item_id: query.item_id,
        rows: rows
            .into_iter()
            .map(|row| ForecastPoint {
                date: row.date.format("%Y-%m-%d").to_string(),
                forecast: row.forecast,
            })
            .collect(),
    }))
}
