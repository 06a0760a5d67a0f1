//! Gateway entry point.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mgw::{config::GatewayConfig, routes, upstream::UpstreamClient};

#[derive(Parser, Debug)]
#[command(
    name = "memo-gateway",
    about = "Streaming relay between the memo reading assistant and an OpenAI-style completion endpoint",
    version
)]
struct Args {
    #[arg(long, env = "MGW_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "MGW_PORT", default_value_t = 8080)]
    port: u16,

    /// Base URL of the completion endpoint.
    #[arg(long, env = "MGW_UPSTREAM_URL", default_value = "https://api.openai.com/v1")]
    upstream_url: String,

    /// Bearer key for the completion endpoint.
    #[arg(long, env = "MGW_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    #[arg(long, env = "MGW_MODEL", default_value = "gpt-3.5-turbo")]
    model: String,

    #[arg(long, env = "MGW_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Upstream connection/setup deadline, in seconds.
    #[arg(long, env = "MGW_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Maximum quiet time between upstream chunks, in seconds.
    #[arg(long, env = "MGW_IDLE_TIMEOUT_SECS", default_value_t = 60)]
    idle_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> GatewayConfig {
        GatewayConfig {
            host: self.host,
            port: self.port,
            upstream_url: self.upstream_url,
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    config.validate()?;

    let upstream =
        UpstreamClient::new(config.clone()).context("failed to build upstream HTTP client")?;
    let ctx = Arc::new(routes::AppContext {
        config: config.clone(),
        upstream,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(
        addr = %config.bind_addr(),
        upstream = %config.upstream_url,
        model = %config.model,
        "memo gateway listening"
    );

    axum::serve(listener, routes::app(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
