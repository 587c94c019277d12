//! `gateway`: HTTP host whose profile handlers run as field-encrypting
//! boundary operations.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging.
//! 3. Load key material and seed the [`KeyRing`].
//! 4. Build the interception engine.
//! 5. Spawn the key refresh task.
//! 6. Build the Axum router and start the server.

mod config;
mod keys;
mod profile;
mod server;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use fieldcrypt::{ContainerDispatcher, CryptoBackend, Interceptor, KeyRing, StandardBackend, StrategyRegistry};
use tracing::info;

use config::Config;
use profile::ProfileStore;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Logging is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "gateway starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key material
    // -----------------------------------------------------------------------
    let settings = keys::load(&cfg)?;
    let executor = settings.executor().context("failed to build crypto executor")?;
    let ring = KeyRing::new(settings);

    // -----------------------------------------------------------------------
    // 4. Engine
    // -----------------------------------------------------------------------
    let backend: Arc<dyn CryptoBackend> = Arc::new(StandardBackend::new());
    let dispatcher = ContainerDispatcher::new(Arc::new(StrategyRegistry::with_defaults()), backend, executor);
    let interceptor = Interceptor::new(dispatcher, Arc::new(ring.clone()));

    // -----------------------------------------------------------------------
    // 5. Background tasks
    // -----------------------------------------------------------------------
    let _key_refresh = keys::refresh_task(cfg.clone(), ring.clone());

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(interceptor, ring, ProfileStore::new());
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
