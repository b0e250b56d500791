use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to one of the upstream HTTP services (weather provider or
/// cache store). End clients only ever see a generic message; the variants
/// are kept apart for logging and tests.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },
    #[error("upstream responded with status {0}")]
    Status(StatusCode),
    #[error("could not decode upstream response: {source}")]
    Decode { source: reqwest::Error },
}

impl UpstreamError {
    /// Checks the response status and turns anything but 2xx into an error.
    pub fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(UpstreamError::Status(status))
        }
    }
}
