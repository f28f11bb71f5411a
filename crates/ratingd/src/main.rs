use anyhow::{Context, Result};
use clap::Parser;
use rating_core::{init_tracing, level_for, RatingService};
use rating_state::{open_store, BackendConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

use ratingd::{serve, ServerArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let dotenv = dotenvy::dotenv();

    let args = ServerArgs::parse();
    init_tracing(args.json, level_for(args.verbose));

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded environment file");
    }

    let backend = BackendConfig::from_env().context("invalid session store configuration")?;
    info!(persistent = backend.is_persistent(), "session store configured");

    let store = open_store(&backend)
        .await
        .context("failed to open session store")?;
    let service = RatingService::new(store);
    service
        .ensure_ready()
        .await
        .context("failed to initialize session store schema")?;

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(
        addr = %listener.local_addr()?,
        backend = service.backend_name(),
        "rating service listening"
    );

    serve(listener, service, shutdown_signal())
        .await
        .context("server error")?;

    info!("rating service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
