use std::path::PathBuf;

use anyhow::{Context, Result};
use burrow_relay::{RelayConfig, RelayServer};
use burrow_token::TokenSigner;
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;
use tracing::{info, warn};

/// Runs the TCP relay: authenticates connections by capability token,
/// pairs host and joiner for a session id, splices the pair. CLI plumbing
/// only — every invariant lives in `burrow-relay` and `burrow-token`.
#[derive(Parser)]
struct Args {
    /// Path to a TOML config file. Every key may also be set via a
    /// `BURROW_` prefixed environment variable, which takes precedence.
    #[arg(long, default_value = "relay.toml")]
    config: PathBuf,
}

/// The MAC secret lives alongside the relay's own timeouts in one file so
/// an operator configures a single relay.toml, but it is intentionally not
/// a field of [`RelayConfig`] itself: that type is also constructed
/// directly by relay-crate tests with a fixed in-test secret, and keeping
/// the secret in the CLI's own top-level config avoids threading a
/// required-but-test-irrelevant field through every one of those tests.
#[derive(Deserialize)]
struct TopLevelConfig {
    mac_secret: String,
    #[serde(flatten)]
    relay: RelayConfig,
}

const INSECURE_DEFAULT_SECRET: &str = "changeme";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let args = Args::parse();

    let figment = Figment::new()
        .merge(Toml::file(&args.config))
        .merge(Env::prefixed("BURROW_"));
    let config: TopLevelConfig = figment.extract().context("failed to load relay configuration")?;

    if config.mac_secret.is_empty() || config.mac_secret == INSECURE_DEFAULT_SECRET {
        warn!("refusing to start with a missing or default mac_secret");
        anyhow::bail!("mac_secret is missing or set to the insecure default; configure a real secret");
    }

    let signer = TokenSigner::new(config.mac_secret);
    let tls_paths = config.relay.tls_paths().map(|(cert, key)| (cert.to_path_buf(), key.to_path_buf()));
    let mut server = RelayServer::new(config.relay, signer);

    if let Some((cert_path, key_path)) = tls_paths {
        // rustls 0.23 requires a process-wide default crypto provider before
        // any `ServerConfig` can be built; ignore the error if something
        // else in the process already installed one.
        let _ = tokio_rustls::rustls::crypto::ring::default_provider().install_default();
        let acceptor = burrow_relay::build_tls_acceptor(&cert_path, &key_path)
            .context("failed to build relay TLS acceptor from the configured cert/key paths")?;
        server = server.with_tls_acceptor(acceptor);
        info!("relay TLS enabled");
    }

    let cancel = server.cancellation_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("relay received shutdown signal, cancelling in-flight work");
        cancel.cancel();
    });

    server.run().await.context("relay server failed")?;

    Ok(())
}
