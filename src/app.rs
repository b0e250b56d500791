use std::sync::Arc;

use axum::Router;
use axum::middleware;
use reqwest::Client;
use tower_http::trace::TraceLayer;

use crate::cache::RestCache;
use crate::config::Config;
use crate::rate_limit::{self, RateLimiterHandle};
use crate::weather::VisualCrossingClient;
use crate::weather_routes::{self, WeatherState};

pub fn create_state(config: &Config) -> Result<WeatherState, reqwest::Error> {
    // Shared by both upstreams, it pools connections internally.
    let client = Client::builder()
        .timeout(config.request_timeout())
        .build()?;

    Ok(WeatherState {
        cache: Arc::new(RestCache::new(
            client.clone(),
            config.cache_url.clone(),
            config.cache_token.clone(),
        )),
        provider: Arc::new(VisualCrossingClient::new(
            client,
            config.weather_url.clone(),
            config.weather_api_key.clone(),
        )),
        cache_ttl: config.cache_ttl(),
    })
}

pub fn create_app(state: WeatherState, limiter: RateLimiterHandle) -> Router {
    Router::new()
        .nest("/weather", weather_routes::routes(state))
        .layer(middleware::from_fn_with_state(limiter, rate_limit::limit))
        .layer(TraceLayer::new_for_http())
}
