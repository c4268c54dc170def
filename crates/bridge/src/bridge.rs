use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::BridgeError;
use crate::state::BridgeState;
use crate::target::LocalTarget;

const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// The peer-side state machine coupling a local TCP listener to a relay
/// socket. Observable fields (state, byte counters) are readable at any
/// time without blocking the copy loops, per spec.md §4.6.
pub struct Bridge {
    state_tx: watch::Sender<BridgeState>,
    bytes_in: Arc<AtomicU64>,
    bytes_out: Arc<AtomicU64>,
    forwarding_started_at: Mutex<Option<Instant>>,
    last_error: Mutex<Option<String>>,
    cancel: CancellationToken,
    canonical_target: Mutex<Option<SocketAddr>>,
}

impl Bridge {
    pub fn new() -> Arc<Self> {
        let (state_tx, _) = watch::channel(BridgeState::Init);
        Arc::new(Self {
            state_tx,
            bytes_in: Arc::new(AtomicU64::new(0)),
            bytes_out: Arc::new(AtomicU64::new(0)),
            forwarding_started_at: Mutex::new(None),
            last_error: Mutex::new(None),
            cancel: CancellationToken::new(),
            canonical_target: Mutex::new(None),
        })
    }

    pub fn state(&self) -> BridgeState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BridgeState> {
        self.state_tx.subscribe()
    }

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    pub fn bytes_out(&self) -> u64 {
        self.bytes_out.load(Ordering::Relaxed)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    pub async fn canonical_target(&self) -> Option<SocketAddr> {
        *self.canonical_target.lock().await
    }

    /// Explicit cancellation: any long-lived wait or copy loop observes
    /// this and stops promptly.
    pub fn cancel(&self) {
        self.cancel.cancel();
        let _ = self.state_tx.send(BridgeState::Closed);
    }

    fn set_state(&self, state: BridgeState) {
        let _ = self.state_tx.send(state);
    }

    async fn fail(&self, err: BridgeError) -> BridgeError {
        *self.last_error.lock().await = Some(err.to_string());
        self.set_state(BridgeState::Error);
        err
    }

    /// Polls `target` by attempting a short-timeout TCP dial (closing
    /// immediately on success) until one succeeds or `overall_deadline`
    /// passes. The first address that accepts a connection becomes the
    /// canonical target for the life of the bridge.
    pub async fn wait_for_local_listener(
        self: &Arc<Self>,
        target: &LocalTarget,
        dial_timeout: Duration,
        poll_interval: Duration,
        overall_deadline: Duration,
    ) -> Result<SocketAddr, BridgeError> {
        self.set_state(BridgeState::WaitingForLocalListener);
        let deadline = Instant::now() + overall_deadline;

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.fail(BridgeError::Cancelled).await);
            }

            for candidate in target.candidates() {
                let dial = tokio::time::timeout(dial_timeout, TcpStream::connect(candidate));
                if let Ok(Ok(stream)) = dial.await {
                    drop(stream);
                    *self.canonical_target.lock().await = Some(candidate);
                    self.set_state(BridgeState::Ready);
                    info!(%candidate, "local listener found");
                    return Ok(candidate);
                }
            }

            if Instant::now() >= deadline {
                return Err(self.fail(BridgeError::Timeout).await);
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                () = self.cancel.cancelled() => return Err(self.fail(BridgeError::Cancelled).await),
            }
        }
    }

    /// Dials the canonical local target and splices it to `relay_socket`
    /// with two concurrent directional copy loops. Returns once both
    /// directions have ended (EOF or error on either socket ends the
    /// whole splice).
    pub async fn forward(
        self: &Arc<Self>,
        relay_socket: TcpStream,
        connect_timeout: Duration,
    ) -> Result<(), BridgeError> {
        let target = self
            .canonical_target
            .lock()
            .await
            .ok_or_else(|| BridgeError::ConnectFailed("wait_for_local_listener was never called".into()))?;

        self.set_state(BridgeState::RelayAttached);

        let local_socket = tokio::time::timeout(connect_timeout, TcpStream::connect(target))
            .await
            .map_err(|_| BridgeError::ConnectFailed(format!("connect to {target} timed out")))?
            .map_err(|e| BridgeError::ConnectFailed(e.to_string()))?;

        *self.forwarding_started_at.lock().await = Some(Instant::now());
        self.set_state(BridgeState::Forwarding);

        let (relay_read, relay_write) = relay_socket.into_split();
        let (local_read, local_write) = local_socket.into_split();

        let cancel_a = self.cancel.clone();
        let cancel_b = self.cancel.clone();

        let relay_to_local = tokio::spawn(copy_direction(relay_read, local_write, self.bytes_in.clone(), cancel_a));
        let local_to_relay = tokio::spawn(copy_direction(local_read, relay_write, self.bytes_out.clone(), cancel_b));

        let (a, b) = tokio::join!(relay_to_local, local_to_relay);
        let result = a.unwrap().and(b.unwrap());

        match result {
            Ok(()) => {
                self.set_state(BridgeState::Closed);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "bridge forwarding ended with an error");
                Err(self.fail(BridgeError::Io(e.to_string())).await)
            }
        }
    }
}

async fn copy_direction<R, W>(
    mut reader: R,
    mut writer: W,
    counter: Arc<AtomicU64>,
    cancel: CancellationToken,
) -> Result<(), std::io::Error>
where
    R: AsyncReadExt + Unpin + Send + 'static,
    W: AsyncWriteExt + Unpin + Send + 'static,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let read = tokio::select! {
            result = reader.read(&mut buf) => result?,
            () = cancel.cancelled() => {
                let _ = writer.shutdown().await;
                return Ok(());
            }
        };
        if read == 0 {
            let _ = writer.shutdown().await;
            return Ok(());
        }
        writer.write_all(&buf[..read]).await?;
        counter.fetch_add(read as u64, Ordering::Relaxed);
    }
}
