use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use burrow_token::TokenSigner;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::handshake::{self, AuthenticatedHandshake};
use crate::pending::{PairingOutcome, PendingTable};
use crate::splice;
use crate::stream::RelayStream;

/// The relay's composition root: one listener, one pending table, one
/// janitor, one task per accepted connection. Grounded on the teacher's
/// long-running accept loop selecting against a shutdown signal
/// (`crates/server/src/signal.rs`'s `tokio::select!` over multiple
/// receivers), generalized here to "new connection" vs "shutdown
/// cancelled".
pub struct RelayServer {
    config: RelayConfig,
    signer: TokenSigner,
    pending: Arc<PendingTable>,
    cancel: CancellationToken,
    tls_acceptor: Option<TlsAcceptor>,
}

impl RelayServer {
    pub fn new(config: RelayConfig, signer: TokenSigner) -> Self {
        Self {
            config,
            signer,
            pending: Arc::new(PendingTable::new()),
            cancel: CancellationToken::new(),
            tls_acceptor: None,
        }
    }

    /// Wraps every accepted connection in TLS before the handshake runs
    /// (spec.md §4.5: "Listens on one TCP port (TLS-wrapped optional; the
    /// wrapping is transparent to the rest)"). Build `acceptor` with
    /// [`crate::build_tls_acceptor`].
    pub fn with_tls_acceptor(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls_acceptor = Some(acceptor);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Binds the configured address and runs the accept loop until
    /// cancelled. Each accepted connection is handled on its own task so a
    /// slow or stalled handshake never blocks new arrivals.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "relay listening");
        self.serve(listener).await
    }

    /// Runs the accept loop against an already-bound listener. Split out
    /// from [`RelayServer::run`] so tests can bind an ephemeral port
    /// (`127.0.0.1:0`), read back the OS-assigned address, and only then
    /// start serving — `run` itself has no way to report which port it
    /// bound to.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        self.spawn_janitor();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, peer_addr) = accepted?;
                    let signer = self.signer.clone();
                    let pending = self.pending.clone();
                    let handshake_timeout = self.config.handshake_timeout();
                    let max_session = self.config.max_session_duration();
                    let tls_acceptor = self.tls_acceptor.clone();
                    tokio::spawn(async move {
                        let stream: RelayStream = match tls_acceptor {
                            Some(acceptor) => match acceptor.accept(socket).await {
                                Ok(tls_stream) => Box::new(tls_stream),
                                Err(e) => {
                                    warn!(%peer_addr, error = %e, "relay TLS handshake failed");
                                    return;
                                }
                            },
                            None => Box::new(socket),
                        };
                        if let Err(e) = handle_connection(stream, &signer, &pending, handshake_timeout, max_session).await {
                            warn!(%peer_addr, error = %e, "relay connection ended");
                        }
                    });
                }
                () = self.cancel.cancelled() => {
                    info!("relay shutting down");
                    return Ok(());
                }
            }
        }
    }

    fn spawn_janitor(&self) {
        let pending = self.pending.clone();
        let sweep_interval = self.config.janitor_sweep_interval();
        let pair_timeout = self.config.pair_timeout();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let expired = pending.reap_expired(pair_timeout);
                        for (session_id, mut conn) in expired {
                            info!(%session_id, role = %conn.role, "relay janitor reaped a pair-timed-out pending connection");
                            let _ = conn.socket.shutdown().await;
                        }
                    }
                    () = cancel.cancelled() => return,
                }
            }
        });
    }
}

async fn handle_connection(
    socket: RelayStream,
    signer: &TokenSigner,
    pending: &Arc<PendingTable>,
    handshake_timeout: std::time::Duration,
    max_session: std::time::Duration,
) -> Result<(), crate::error::RelayError> {
    let now_unix = SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_secs();

    let (read_half, mut write_half) = tokio::io::split(socket);
    let mut reader = BufReader::new(read_half);

    let authed = match handshake::read_and_authenticate(&mut reader, signer, now_unix, handshake_timeout).await {
        Ok(authed) => authed,
        Err(e) => {
            let _ = handshake::write_failure(&mut write_half, &e).await;
            return Err(e);
        }
    };
    handshake::write_success(&mut write_half).await.map_err(|_| crate::error::RelayError::PeerClosed)?;

    let socket: RelayStream = reader.into_inner().unsplit(write_half);

    let AuthenticatedHandshake { session_id, role } = authed;
    match pending.offer(session_id, role, socket) {
        PairingOutcome::Parked => Ok(()),
        PairingOutcome::Paired { host, joiner } => {
            info!(%session_id, "relay pair spliced");
            let outcome = splice::splice(host, joiner, max_session).await;
            Err(outcome)
        }
    }
}
