use async_trait::async_trait;
use log::trace;
use reqwest::{Client, Url};
use tokio_util::bytes::Bytes;

use crate::config::endpoint;
use crate::error::UpstreamError;

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetches the raw JSON forecast for `city`.
    async fn fetch(&self, city: &str) -> Result<Bytes, UpstreamError>;
}

/// Visual Crossing timeline API, metric units.
#[derive(Clone)]
pub struct VisualCrossingClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl VisualCrossingClient {
    pub fn new(client: Client, base_url: Url, api_key: String) -> VisualCrossingClient {
        VisualCrossingClient {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl WeatherProvider for VisualCrossingClient {
    async fn fetch(&self, city: &str) -> Result<Bytes, UpstreamError> {
        let url = endpoint(&self.base_url, &["timeline", city]);
        trace!("Fetching weather for {}", city);
        let response = self
            .client
            .get(url)
            .query(&[
                ("unitGroup", "metric"),
                ("key", self.api_key.as_str()),
                ("contentType", "json"),
            ])
            .send()
            .await?;
        Ok(UpstreamError::check_status(response)?.bytes().await?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_client(base_url: &str) -> VisualCrossingClient {
        VisualCrossingClient::new(
            Client::new(),
            Url::parse(base_url).unwrap(),
            "api-key".to_string(),
        )
    }

    #[tokio::test]
    async fn test_fetch_returns_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/services/timeline/London"))
            .and(query_param("unitGroup", "metric"))
            .and(query_param("key", "api-key"))
            .and(query_param("contentType", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"temp\":15}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_client(&format!("{}/rest/services", server.uri()));
        let body = client.fetch("London").await.unwrap();
        assert_eq!(&body[..], b"{\"temp\":15}");
    }

    #[tokio::test]
    async fn test_fetch_unknown_city() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Bad API Request:Invalid location"))
            .mount(&server)
            .await;

        let res = create_client(&server.uri()).fetch("Nowhere").await;
        assert!(matches!(res, Err(UpstreamError::Status(status)) if status.as_u16() == 400));
    }

    #[tokio::test]
    async fn test_fetch_provider_outage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let res = create_client(&server.uri()).fetch("London").await;
        assert!(matches!(res, Err(UpstreamError::Status(status)) if status.as_u16() == 503));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_provider() {
        let res = create_client("http://127.0.0.1:1").fetch("London").await;
        assert!(matches!(res, Err(UpstreamError::Transport { .. })));
    }
}
