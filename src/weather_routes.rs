use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use log::{debug, error, warn};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::cache::WeatherCache;
use crate::error::UpstreamError;
use crate::weather::WeatherProvider;

// Anything that goes in here must be a handle or pointer that can be cloned.
#[derive(Clone)]
pub struct WeatherState {
    pub cache: Arc<dyn WeatherCache>,
    pub provider: Arc<dyn WeatherProvider>,
    pub cache_ttl: Duration,
}

pub fn routes(state: WeatherState) -> Router {
    Router::new()
        .route("/{city}", get(get_weather))
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum WeatherRouteError {
    #[error("failed to fetch weather for {city}: {source}")]
    FetchFailed { city: String, source: UpstreamError },
    #[error("weather for {city} is not a json object: {source}")]
    DecodeFailed {
        city: String,
        source: serde_json::Error,
    },
}

impl IntoResponse for WeatherRouteError {
    fn into_response(self) -> Response {
        error!("{}", self);
        let message = match self {
            WeatherRouteError::FetchFailed { .. } => "failed to fetch weather data",
            WeatherRouteError::DecodeFailed { .. } => "failed to decode weather data",
        };
        (StatusCode::BAD_GATEWAY, Json(json!({ "error": message }))).into_response()
    }
}

async fn get_weather(
    State(state): State<WeatherState>,
    Path(city): Path<String>,
) -> Result<Response, WeatherRouteError> {
    match state.cache.get(&city).await {
        Ok(Some(cached)) => {
            debug!("Cache hit for {}", city);
            return Ok(([(CONTENT_TYPE, "application/json")], cached).into_response());
        }
        Ok(None) => debug!("Cache miss for {}", city),
        Err(err) => warn!("Cache lookup for {} failed, treating as miss: {}", city, err),
    }

    let body = state
        .provider
        .fetch(&city)
        .await
        .map_err(|source| WeatherRouteError::FetchFailed {
            city: city.clone(),
            source,
        })?;

    let weather: Map<String, Value> =
        serde_json::from_slice(&body).map_err(|source| WeatherRouteError::DecodeFailed {
            city: city.clone(),
            source,
        })?;

    // The response never waits for the cache write.
    let cache = state.cache.clone();
    let ttl = state.cache_ttl;
    tokio::spawn(async move {
        if let Err(err) = cache.set(&city, body, ttl).await {
            warn!("Failed to cache weather for {}: {}", city, err);
        }
    });

    Ok(Json(weather).into_response())
}
