//! prerender-proxy
//!
//! Fronts an origin web application and answers crawler requests with
//! pages from a prerender rendering service.
//!
//! ```text
//!   Client ──▶ request id ─▶ trace ─▶ timeout ─▶ prerender middleware
//!                                                  │            │
//!                                      crawler page│            │everything else
//!                                                  ▼            ▼
//!                                        rendering service    origin app
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use prerender_proxy::config::{load_config, validation::validate_config, ConfigError, ProxyConfig};
use prerender_proxy::lifecycle::{shutdown_signal, Shutdown};
use prerender_proxy::observability::{logging, metrics};
use prerender_proxy::{HttpServer, Prerender};

#[derive(Parser)]
#[command(name = "prerender-proxy")]
#[command(about = "Serve prerendered pages to crawlers in front of an origin app", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override origin.address
    #[arg(short, long)]
    origin: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<ProxyConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(origin) = &cli.origin {
        config.origin.address = origin.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        origin = %config.origin.address,
        request_timeout_secs = config.timeouts.request_secs,
        "prerender-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let prerender = Arc::new(Prerender::builder().config(config.prerender.clone()).build()?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, prerender)?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
