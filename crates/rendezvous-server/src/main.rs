use std::path::PathBuf;

use anyhow::{Context, Result};
use burrow_rendezvous::{RendezvousConfig, RendezvousState, router};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use salvo::prelude::*;
use tracing::info;

/// Runs the rendezvous HTTP surface: create/join/status/connect/validate
/// over a shared session store. CLI plumbing only — every invariant lives
/// in `burrow-rendezvous`, `burrow-session` and `burrow-token`.
#[derive(Parser)]
struct Args {
    /// Path to a TOML config file. Every key may also be set via a
    /// `BURROW_` prefixed environment variable, which takes precedence.
    #[arg(long, default_value = "rendezvous.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let args = Args::parse();

    let figment = Figment::new()
        .merge(Toml::file(&args.config))
        .merge(Env::prefixed("BURROW_"));
    let config: RendezvousConfig = figment
        .extract()
        .context("failed to load rendezvous configuration")?;

    if let Err(e) = config.validate() {
        // spec.md §6: a default MAC secret is a configuration error that
        // MUST log a warning, not start up silently insecure.
        tracing::warn!(error = %e, "refusing to start with an insecure configuration");
        return Err(e.into());
    }

    let bind_addr = config.bind_addr.clone();
    let state = RendezvousState::new(config);
    let router = router(state);

    let acceptor = TcpListener::new(&bind_addr).bind().await;
    let server = Server::new(acceptor);
    let handle = server.handle();

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("rendezvous received shutdown signal, stopping gracefully");
        handle.stop_graceful(None);
    });

    info!(addr = %bind_addr, "rendezvous listening");
    server.serve(router).await;

    Ok(())
}
