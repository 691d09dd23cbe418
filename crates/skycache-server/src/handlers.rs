use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use skycache_api::ApiError;
use skycache_core::{CityName, WeatherResult};

use crate::health::SERVICE_NAME;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": SERVICE_NAME,
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

/// `GET /weather?city=<name>`
pub async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<WeatherResult>, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let raw = params
        .city
        .ok_or_else(|| ApiError::bad_request("Query parameter 'city' is required"))?;
    let city = CityName::parse(&raw)?;

    let result = state.weather.fetch_weather(&city).await?;
    Ok(Json(result))
}

/// Always 200; degradation is reported in the body.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.health.check_health().await;
    (StatusCode::OK, Json(snapshot))
}

pub async fn metrics() -> impl IntoResponse {
    match crate::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => ApiError::not_found("Metrics are not enabled").into_response(),
    }
}
