//! sqlgate server: the HTTP layer over the query pipeline.
//!
//! Exposes `/ask` and `/explain` (JSON), plus `/health` for liveness. Built as
//! a builder so embedders and tests can swap the translator or config path.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlgate_core::{build_pipeline, AppConfig, Gateway, SqlGenerator};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub mod api;

pub use api::router;

pub struct GatewayServer {
    config_path: Option<String>,
    generator: Option<Arc<dyn SqlGenerator>>,
}

impl Default for GatewayServer {
    fn default() -> Self {
        Self {
            config_path: None,
            generator: None,
        }
    }
}

impl GatewayServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config_path: &str) -> Self {
        self.config_path = Some(config_path.to_string());
        self
    }

    /// Override the translation collaborator (tests, embedders).
    pub fn with_generator(mut self, generator: Arc<dyn SqlGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub async fn run(self) -> Result<()> {
        let stdout_layer =
            tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
        tracing_subscriber::registry().with(stdout_layer).try_init().ok();

        let config = match &self.config_path {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::from_env()?,
        };

        let gateway = build_gateway(&config, self.generator)?;
        let app = api::router(gateway).layer(tower_http::cors::CorsLayer::permissive());

        let listen_addr: std::net::SocketAddr = config
            .server
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid listen address {}", config.server.listen_addr))?;
        info!("sqlgate API listening on {}", listen_addr);

        let listener = tokio::net::TcpListener::bind(listen_addr)
            .await
            .with_context(|| format!("Failed to bind to {listen_addr}"))?;
        axum::serve(listener, app).await.context("API server error")?;
        Ok(())
    }
}

/// Wire the request-handling gateway from configuration.
pub fn build_gateway(
    config: &AppConfig,
    generator: Option<Arc<dyn SqlGenerator>>,
) -> Result<Arc<Gateway>> {
    Ok(build_pipeline(config, generator)?.gateway)
}
