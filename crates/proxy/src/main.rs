use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use micro_proxy::config::ProxyConfig;
use micro_proxy::server::ProxyServer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "micro-proxy", version, about = "An intercepting HTTP/1.x forward proxy", long_about = None)]
struct Args {
    /// Path of the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = ProxyConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;
    info!(rules = config.rules().len(), "config loaded");

    ProxyServer::builder(config).build().start().await.context("proxy server stopped")
}
