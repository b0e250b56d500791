use std::net::SocketAddr;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;

use crate::config::Config;
use crate::rate_limit::FixedWindowLimiter;

mod app;
mod cache;
mod config;
mod error;
mod rate_limit;
mod weather;
mod weather_routes;

#[tokio::main]
async fn main() {
    let dotenv_result = dotenv::dotenv();
    env_logger::init();
    if dotenv_result.is_err() {
        log::info!("No .env file found");
    }

    let config = Config::parse();

    let state = app::create_state(&config).expect("failed to create http client");
    let limiter = Arc::new(FixedWindowLimiter::new(
        config.rate_limit,
        config.rate_limit_window(),
    ));
    rate_limit::spawn_pruning(limiter.clone());

    let app = app::create_app(state, limiter)
        .into_make_service_with_connect_info::<SocketAddr>();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    log::info!("listening on {}", addr);
    log::info!(
        "weather provider at {}, cache at {}, entries kept for {}s",
        config.weather_url,
        config.cache_url,
        config.cache_ttl_secs
    );

    if let (Some(key_file_path), Some(cert_file_path)) =
        (config.key_file_path, config.cert_file_path)
    {
        log::info!(
            "using tls with key file {} and cert file {}",
            key_file_path,
            cert_file_path
        );
        let tls = RustlsConfig::from_pem_file(cert_file_path, key_file_path)
            .await
            .expect("failed to load tls key and certificate");
        axum_server::bind_rustls(addr, tls)
            .serve(app)
            .await
            .expect("server failed");
    } else {
        axum_server::bind(addr).serve(app).await.expect("server failed");
    }
}
