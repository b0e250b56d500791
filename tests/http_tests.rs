use std::net::TcpStream;
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;

// Nothing listens on port 1, so every upstream call fails fast.
const UNREACHABLE: &str = "http://127.0.0.1:1";

struct ProxyTestServer {
    process: Child,
    port: u16,
}

impl ProxyTestServer {
    fn spawn(port: u16) -> Self {
        let executable = env!("CARGO_BIN_EXE_weather-proxy");
        let mut server = ProxyTestServer {
            process: Command::new(executable)
                .env("VISUAL_CROSSING_API_KEY", "test-key")
                .env("UPSTASH_REDIS_URL", UNREACHABLE)
                .env("UPSTASH_REDIS_TOKEN", "test-token")
                .env("WEATHER_API_URL", UNREACHABLE)
                .env("PORT", port.to_string())
                .spawn()
                .expect("Could not start weather-proxy"),
            port,
        };
        // Connect on the raw socket; an http probe would use up rate limit quota.
        while TcpStream::connect(("127.0.0.1", port)).is_err() {
            if let Some(status) = server
                .process
                .try_wait()
                .expect("Could not check weather-proxy status")
            {
                panic!("weather-proxy exited before listening on {port}: {status}");
            }
            thread::sleep(Duration::from_millis(10));
        }
        server
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }
}

impl Drop for ProxyTestServer {
    fn drop(&mut self) {
        // Already reaped if it exited during startup.
        if let Ok(Some(_)) = self.process.try_wait() {
            return;
        }
        self.process
            .kill()
            .expect("Failed to send kill signal to weather-proxy");
        self.process.wait().expect("weather-proxy failed to stop");
    }
}

#[test]
fn can_start_and_stop_server() {
    ProxyTestServer::spawn(51301);
}

#[test]
fn upstream_failure_is_bad_gateway() {
    let server = ProxyTestServer::spawn(51302);

    let res = Client::new()
        .get(server.url("/weather/London"))
        .send()
        .expect("Could not send request");

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        res.text().expect("Could not read body"),
        "{\"error\":\"failed to fetch weather data\"}"
    );
}

#[test]
fn eleventh_request_is_rate_limited() {
    let server = ProxyTestServer::spawn(51303);
    let client = Client::new();

    for _ in 0..10 {
        let res = client
            .get(server.url("/weather/London"))
            .send()
            .expect("Could not send request");
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }
    let res = client
        .get(server.url("/weather/London"))
        .send()
        .expect("Could not send request");
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().contains_key("retry-after"));
}
