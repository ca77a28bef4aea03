mod analysis;
mod config;
mod keywords;
mod lifestyle;
mod models;
mod platform;
mod providers;
mod resolver;
mod routes;
mod synthesis;
mod validate;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    analysis::ImageAnalyzer, config::AppConfig, lifestyle::LifestyleGenerator, resolver::Resolver, routes::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    for provider in &config.providers {
        tracing::info!(
            provider = %provider.name,
            model = %provider.model,
            available = provider.is_available(),
            timeout_secs = provider.timeout.as_secs(),
            "configured provider"
        );
    }

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("building HTTP client")?;

    let state = AppState {
        store: Arc::default(),
        resolver: Arc::new(Resolver::new(providers::build_chain(&config.providers, &client))),
        analyzer: Arc::new(ImageAnalyzer::new(client.clone(), config.classifier.clone())),
        lifestyle: Arc::new(LifestyleGenerator::new(client, config.lifestyle.clone())),
    };

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {}", addr))?;
    serve(listener, app, shutdown_signal()).await
}

async fn serve<F>(listener: tokio::net::TcpListener, app: axum::Router, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn serve_answers_then_stops_on_shutdown() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().route("/ping", get(|| async { "pong" }));
        let server = tokio::spawn(serve(listener, app, tokio::time::sleep(Duration::from_millis(300))));

        let body = reqwest::get(format!("http://{}/ping", addr)).await.unwrap().text().await.unwrap();
        assert_eq!(body, "pong");

        let finished = tokio::time::timeout(Duration::from_secs(5), server).await;
        assert!(matches!(finished, Ok(Ok(Ok(())))));
    }
}
