use std::time::Duration;

use async_trait::async_trait;
use log::trace;
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio_util::bytes::Bytes;

use crate::config::endpoint;
use crate::error::UpstreamError;

/// A remote string cache keyed by city name. Expiry is left to the store.
#[async_trait]
pub trait WeatherCache: Send + Sync {
    /// Returns `Ok(None)` when the store has nothing (or an empty value) for
    /// `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, UpstreamError>;
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), UpstreamError>;
}

/// Client for an Upstash-style Redis REST API.
#[derive(Clone)]
pub struct RestCache {
    client: Client,
    base_url: Url,
    token: String,
}

#[derive(Deserialize)]
struct GetResponse {
    result: Option<String>,
}

impl RestCache {
    pub fn new(client: Client, base_url: Url, token: String) -> RestCache {
        RestCache {
            client,
            base_url,
            token,
        }
    }
}

#[async_trait]
impl WeatherCache for RestCache {
    async fn get(&self, key: &str) -> Result<Option<String>, UpstreamError> {
        let url = endpoint(&self.base_url, &["get", key]);
        trace!("Reading cache entry {}", key);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body: GetResponse = UpstreamError::check_status(response)?
            .json()
            .await
            .map_err(|source| UpstreamError::Decode { source })?;
        Ok(body.result.filter(|value| !value.is_empty()))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), UpstreamError> {
        let url = endpoint(&self.base_url, &["set", key]);
        trace!("Writing cache entry {} with ttl {}s", key, ttl.as_secs());
        // The value goes in the body; the store takes it verbatim.
        let response = self
            .client
            .post(url)
            .query(&[("EX", ttl.as_secs())])
            .bearer_auth(&self.token)
            .body(value)
            .send()
            .await?;
        UpstreamError::check_status(response)?;
        Ok(())
    }
}
