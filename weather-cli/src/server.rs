//! HTTP surface over the pipeline.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use weather_core::{GeocodedPlace, WeatherError, WeatherPipeline, WeatherRequest, WeatherResponse};

#[derive(Debug, Clone)]
pub struct AppState {
    pipeline: Arc<WeatherPipeline>,
}

pub fn router(pipeline: Arc<WeatherPipeline>) -> Router {
    Router::new()
        .route("/cities", get(list_cities))
        .route("/search", get(search_city))
        .route("/weather", get(get_weather))
        .with_state(AppState { pipeline })
}

pub async fn serve(bind: &str, port: u16, pipeline: Arc<WeatherPipeline>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((bind, port))
        .await
        .with_context(|| format!("Failed to bind {bind}:{port}"))?;

    tracing::info!(%bind, port, "starting web server");
    axum::serve(listener, router(pipeline)).await.context("Web server failed")?;
    Ok(())
}

/// Error payload, `{"error": "..."}` with the matching status.
enum ApiError {
    Pipeline(WeatherError),
    BadQuery(QueryRejection),
}

impl From<WeatherError> for ApiError {
    fn from(e: WeatherError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadQuery(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Pipeline(e) => (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.to_string(),
            ),
            ApiError::BadQuery(e) => (StatusCode::BAD_REQUEST, e.body_text()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Query pairs in arrival order; a repeated key keeps its first value.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    fn first(&self, key: &str) -> Option<String> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }
}

fn query_pairs(query: Result<Query<QueryPairs>, QueryRejection>) -> Result<QueryPairs, ApiError> {
    let Query(pairs) = query.inspect_err(|e| tracing::warn!(error = %e, "rejected query string"))?;
    Ok(pairs)
}

async fn list_cities(State(state): State<AppState>) -> Json<Vec<&'static str>> {
    tracing::debug!("fetching list of predefined cities");
    Json(state.pipeline.locations().registry().names())
}

async fn search_city(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<GeocodedPlace>, ApiError> {
    let q = query_pairs(query)?.first("q").unwrap_or_default();
    let place = state.pipeline.locations().resolve_by_query(&q).await?;
    Ok(Json(place))
}

async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let pairs = query_pairs(query)?;
    let request = WeatherRequest {
        city: pairs.first("city"),
        lat: pairs.first("lat"),
        lon: pairs.first("lon"),
    };
    let response = state.pipeline.get_weather(&request).await?;
    Ok(Json(response))
}
