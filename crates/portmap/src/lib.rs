//! The gateway port-mapping collaborator: an optional external capability a
//! peer invokes on startup to poke a hole in its NAT/firewall.
//!
//! This crate is contract-only per spec.md §4.7 — no NAT-PMP/PCP/UPnP
//! client ships here. A host application supplies its own [`PortMapper`];
//! [`NullPortMapper`] exists only so tests and examples have something to
//! construct without pulling in a real implementation.

use std::net::IpAddr;
use std::time::Duration;

/// `TCP` is the only transport the bridge ever needs mapped; the variant
/// exists so the trait reads naturally if a future caller needs UDP too.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, thiserror::Error)]
pub enum PortMapError {
    #[error("port mapping request failed: {0}")]
    Failed(String),
    #[error("could not determine external address: {0}")]
    NoExternalAddress(String),
}

/// A gateway's port-mapping surface, as consumed by the core. Failures are
/// non-fatal to callers: the core must keep working without any mapping.
#[async_trait::async_trait]
pub trait PortMapper: Send + Sync {
    async fn open(
        &self,
        protocol: Protocol,
        external_port: u16,
        internal_port: u16,
        internal_address: IpAddr,
        description: &str,
        ttl: Duration,
    ) -> Result<(), PortMapError>;

    async fn close(&self, protocol: Protocol, external_port: u16) -> Result<(), PortMapError>;

    async fn external_address(&self) -> Result<IpAddr, PortMapError>;
}

/// A no-op mapper: every `open`/`close` succeeds without doing anything,
/// and `external_address` always fails. Useful for tests and for hosts
/// that run on a network where port mapping is unnecessary or unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPortMapper;

#[async_trait::async_trait]
impl PortMapper for NullPortMapper {
    async fn open(
        &self,
        _protocol: Protocol,
        _external_port: u16,
        _internal_port: u16,
        _internal_address: IpAddr,
        _description: &str,
        _ttl: Duration,
    ) -> Result<(), PortMapError> {
        Ok(())
    }

    async fn close(&self, _protocol: Protocol, _external_port: u16) -> Result<(), PortMapError> {
        Ok(())
    }

    async fn external_address(&self) -> Result<IpAddr, PortMapError> {
        Err(PortMapError::NoExternalAddress(
            "NullPortMapper never knows an external address".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn null_mapper_open_and_close_always_succeed() {
        let mapper = NullPortMapper;
        mapper
            .open(
                Protocol::Tcp,
                4000,
                4000,
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                "burrow bridge",
                Duration::from_secs(3600),
            )
            .await
            .unwrap();
        mapper.close(Protocol::Tcp, 4000).await.unwrap();
    }

    #[tokio::test]
    async fn null_mapper_has_no_external_address() {
        assert!(NullPortMapper.external_address().await.is_err());
    }
}
