use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::stream::RelayStream;

const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Runs the two directional copy loops between `host` and `joiner` until
/// both have ended, subject to `max_session`. Per spec.md §4.5: no byte is
/// ever inspected or reframed; each direction terminates on read-EOF or
/// I/O error and shuts down its write side so the other direction learns
/// about it. Splits via the generic `tokio::io::split` (not
/// `TcpStream::into_split`) since `host`/`joiner` may be TLS-wrapped.
pub async fn splice(host: RelayStream, joiner: RelayStream, max_session: Duration) -> RelayError {
    let (host_read, host_write) = tokio::io::split(host);
    let (joiner_read, joiner_write) = tokio::io::split(joiner);

    let host_to_joiner = copy_direction(host_read, joiner_write);
    let joiner_to_host = copy_direction(joiner_read, host_write);

    let outcome = tokio::select! {
        _ = tokio::time::sleep(max_session) => {
            debug!("relay splice hit the max-session deadline");
            return RelayError::SessionExpired;
        }
        result = async { tokio::join!(host_to_joiner, joiner_to_host) } => result,
    };

    let (a, b) = outcome;
    match (a, b) {
        (Ok(()), Ok(())) => RelayError::PeerClosed,
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "relay splice ended with an I/O error");
            RelayError::PeerClosed
        }
    }
}

async fn copy_direction<R, W>(mut reader: R, mut writer: W) -> Result<(), std::io::Error>
where
    R: AsyncReadExt + Unpin,
    W: AsyncWriteExt + Unpin,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buf).await?;
        if read == 0 {
            let _ = writer.shutdown().await;
            return Ok(());
        }
        writer.write_all(&buf[..read]).await?;
    }
}
