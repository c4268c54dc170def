use tokio::io::{AsyncRead, AsyncWrite};

/// Either a plain TCP socket or a TLS-wrapped one; pairing and splicing
/// never distinguish between the two (spec.md §4.5: "the wrapping is
/// transparent to the rest"). A blanket impl means any concrete stream type
/// — `TcpStream`, `tokio_rustls::server::TlsStream<TcpStream>` — already
/// satisfies this without a manual impl.
pub trait RelayIo: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> RelayIo for T {}

/// The relay's one connection type from the handshake onward. Boxed so the
/// pending table and splice loop are written once against a single type
/// rather than duplicated per transport.
pub type RelayStream = Box<dyn RelayIo>;
