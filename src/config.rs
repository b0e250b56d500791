use std::time::Duration;

use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use reqwest::Url;

pub const VISUAL_CROSSING_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services";

// Settings are read once at startup and handed to whoever needs them.
#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// API key for the Visual Crossing weather service.
    #[arg(long, env = "VISUAL_CROSSING_API_KEY", hide_env_values = true,
          value_parser = NonEmptyStringValueParser::new())]
    pub weather_api_key: String,

    /// Base URL of the Upstash-style REST cache.
    #[arg(long, env = "UPSTASH_REDIS_URL")]
    pub cache_url: Url,

    /// Bearer token for the REST cache.
    #[arg(long, env = "UPSTASH_REDIS_TOKEN", hide_env_values = true,
          value_parser = NonEmptyStringValueParser::new())]
    pub cache_token: String,

    #[arg(long, env = "WEATHER_API_URL", default_value = VISUAL_CROSSING_URL)]
    pub weather_url: Url,

    #[arg(short, long, env = "PORT", default_value_t = 51000)]
    pub port: u16,

    /// How long fetched weather stays in the cache.
    #[arg(long, env = "CACHE_TTL_SECS",
          value_parser = clap::value_parser!(u64).range(1..), default_value_t = 12 * 60 * 60)]
    pub cache_ttl_secs: u64,

    /// Requests allowed per client and window.
    #[arg(long, env = "RATE_LIMIT", default_value_t = 10)]
    pub rate_limit: u32,

    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS",
          value_parser = clap::value_parser!(u64).range(1..), default_value_t = 60)]
    pub rate_limit_window_secs: u64,

    /// Timeout for every outbound request.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS",
          value_parser = clap::value_parser!(u64).range(1..), default_value_t = 30)]
    pub request_timeout_secs: u64,

    #[arg(short, long, env = "KEY_FILE_PATH")]
    pub key_file_path: Option<String>,

    #[arg(short, long, env = "CERT_FILE_PATH")]
    pub cert_file_path: Option<String>,
}

impl Config {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Appends `segments` to the path of `base`, percent-encoding each one so a
/// city like "New York" or "a/b" stays a single segment.
pub fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
