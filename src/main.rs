use kitbox::{Registry, config, net::http};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Arc::new(config::Config::from_env()?);

    init_tracing(&cfg.log_level)?;

    if cfg.uses_dev_secret() {
        tracing::warn!("JWT_SECRET_KEY is not set, tokens are signed with the development secret");
    }

    let registry = Arc::new(Registry::connect(cfg.clone()).await?);

    let addr: SocketAddr = cfg.http_addr.parse()?;
    if let Err(e) = http::serve(addr, registry).await {
        tracing::error!(error = %e, "HTTP server failed");
        return Err(e.into());
    }

    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, prelude::*};

    color_eyre::install().map_err(|e| anyhow::anyhow!("{e}"))?;

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::uptime()),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();

    Ok(())
}
