use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use completion_gateway::{router, CompletionGateway, GatewayConfig};
use tracing::info;

/// Relay chat prompts to an upstream chat-completion provider.
#[derive(Debug, Parser)]
#[command(name = "completion-gateway", version)]
struct Cli {
    /// Interface to bind (overrides HOST).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Upstream model identifier (overrides COMPLETION_MODEL).
    #[arg(long)]
    model: Option<String>,

    /// Directory of a built frontend to serve (overrides STATIC_DIR).
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = GatewayConfig::from_env().context("Invalid gateway configuration")?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(model) = cli.model {
        config = config.with_model(model);
    }
    if let Some(dir) = cli.static_dir {
        config = config.with_static_dir(dir);
    }

    let addr = config.bind_addr();
    info!(
        upstream = %config.upstream_url,
        model = %config.model,
        %addr,
        "Completion gateway starting"
    );

    let gateway = CompletionGateway::new(config)
        .context("Failed to build upstream HTTP client")?
        .shared();
    let app = router(gateway);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .await
        .context("Gateway server exited")?;

    Ok(())
}
