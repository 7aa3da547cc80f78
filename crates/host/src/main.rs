//! `listener-host`: binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`config::Config`] from environment variables.
//! 2. Initialise structured JSON logging.
//! 3. Assemble server options from the settings file and hosting addresses.
//! 4. Run one bind pass against tokio sockets.
//! 5. Hold the listeners open until shutdown.

mod config;
mod telemetry;
mod tls;
mod transport;

use address_binder::https::DirectoryCertificateStore;
use address_binder::{bind_server, DefaultHttpsProvider, ServerAddresses, ServerOptions};
use anyhow::{Context, Result};
use tracing::info;

use transport::TokioBinder;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: listener-host configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(version = env!("CARGO_PKG_VERSION"), "listener-host starting");

    // -----------------------------------------------------------------------
    // 3. Server options
    // -----------------------------------------------------------------------
    let mut options = ServerOptions {
        configuration: Some(cfg.server_settings()?),
        ..ServerOptions::default()
    };
    let mut addresses =
        ServerAddresses::new(cfg.addresses()).prefer_hosting_urls(cfg.prefer_hosting_urls);

    let dev_certs = cfg.dev_cert_dir();
    info!(dir = %dev_certs.display(), "using development certificate directory");
    let https_provider =
        DefaultHttpsProvider::new(DirectoryCertificateStore::current_user(dev_certs));

    // -----------------------------------------------------------------------
    // 4. Bind
    // -----------------------------------------------------------------------
    let mut binder = TokioBinder::new();
    bind_server(&mut addresses, &mut options, Some(&https_provider), &mut binder)
        .await
        .context("failed to bind server endpoints")?;

    for bound in binder.listeners() {
        info!(
            endpoint = %bound.endpoint,
            local = %bound.listener.local_addrs().join(", "),
            tls = bound.tls.is_some(),
            "listening"
        );
    }

    // -----------------------------------------------------------------------
    // 5. Run until shutdown
    // -----------------------------------------------------------------------
    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!(addresses = %addresses.addresses.join(", "), "shutting down");

    Ok(())
}
