use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls_pemfile::{certs, private_key};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};

/// Builds a TLS acceptor from a PEM certificate chain and private key on
/// disk, for the relay's optional TLS-wrapped listener (spec.md §4.5, §6's
/// "TLS cert/key paths" configuration input). Grounded on the call shape of
/// `other_examples/…Heimdall__src-lib.rs.rs`'s
/// `tls_utils::load_certs`/`load_private_key` + `TlsAcceptor::from(server_cfg)`
/// — that file's own loader implementation wasn't in the retrieval pack, so
/// the PEM parsing here is this crate's own, built directly on
/// `rustls-pemfile`.
pub fn build_tls_acceptor(cert_path: &Path, key_path: &Path) -> std::io::Result<TlsAcceptor> {
    let cert_chain: Vec<CertificateDer<'static>> =
        certs(&mut BufReader::new(File::open(cert_path)?)).collect::<Result<_, _>>()?;
    let key: PrivateKeyDer<'static> = private_key(&mut BufReader::new(File::open(key_path)?))?
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "no private key found in tls_key_path"))?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}
