//! `vault` binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (OTEL + tracing).
//! 3. Derive the field encryption key and build the [`FieldCodec`].
//! 4. Build the Axum router over the secret store and start the HTTP server.

mod config;
mod crypto;
mod server;
mod storage;
mod telemetry;

use anyhow::Result;
use tracing::{info, warn};

use config::Config;
use crypto::FieldCodec;
use server::state::AppState;
use storage::SecretStore;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otlp_endpoint(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        owner_header = %cfg.owner_header_name,
        legacy_tokens = cfg.legacy_tokens,
        "vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Field codec
    // -----------------------------------------------------------------------
    let codec = FieldCodec::new(cfg.passphrase(), cfg.legacy_tokens)?;
    if !codec.is_configured() {
        anyhow::bail!("no encryption passphrase available");
    }
    info!("field encryption key derived");
    if cfg.legacy_tokens {
        warn!("legacy token fallback enabled; disable LEGACY_TOKENS once old values are re-encrypted");
    }

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let store = SecretStore::in_memory(codec);
    let state = AppState::new(store, cfg.owner_header_name.clone());
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("vault stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
