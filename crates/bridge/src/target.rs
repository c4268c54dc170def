use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// What the bridge was told to probe for: either a fully qualified
/// `host:port`, or a bare port, which defers address resolution to
/// [`LocalTarget::candidates`] (loopback first, then every non-loopback,
/// non-link-local IPv4 interface address).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalTarget {
    HostPort(String, u16),
    PortOnly(u16),
}

#[derive(Debug, thiserror::Error)]
#[error("target must be \"host:port\" or a bare port number, got {0:?}")]
pub struct TargetParseError(String);

impl std::str::FromStr for LocalTarget {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(port) = s.parse::<u16>() {
            return Ok(LocalTarget::PortOnly(port));
        }
        let Some((host, port)) = s.rsplit_once(':') else {
            return Err(TargetParseError(s.to_string()));
        };
        let port: u16 = port.parse().map_err(|_| TargetParseError(s.to_string()))?;
        Ok(LocalTarget::HostPort(host.to_string(), port))
    }
}

impl LocalTarget {
    /// The ordered list of addresses worth dialing for this target.
    ///
    /// `HostPort` resolves via the OS (per spec.md §4.6, "target address
    /// resolution is deferred to the OS"). `PortOnly` tries loopback first,
    /// then each non-loopback, non-link-local IPv4 interface address.
    pub fn candidates(&self) -> Vec<SocketAddr> {
        match self {
            LocalTarget::HostPort(host, port) => {
                use std::net::ToSocketAddrs;
                format!("{host}:{port}")
                    .to_socket_addrs()
                    .map(|it| it.collect())
                    .unwrap_or_default()
            }
            LocalTarget::PortOnly(port) => {
                let mut addrs = vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), *port)];
                addrs.extend(non_loopback_ipv4_addrs().into_iter().map(|ip| SocketAddr::new(IpAddr::V4(ip), *port)));
                addrs
            }
        }
    }
}

fn non_loopback_ipv4_addrs() -> Vec<Ipv4Addr> {
    if_addrs::get_if_addrs()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|iface| match iface.addr.ip() {
            IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_link_local() => Some(ip),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_port() {
        assert_eq!("1626".parse::<LocalTarget>().unwrap(), LocalTarget::PortOnly(1626));
    }

    #[test]
    fn parses_host_port() {
        assert_eq!(
            "127.0.0.1:1626".parse::<LocalTarget>().unwrap(),
            LocalTarget::HostPort("127.0.0.1".to_string(), 1626)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-target".parse::<LocalTarget>().is_err());
    }

    #[test]
    fn port_only_tries_loopback_first() {
        let candidates = LocalTarget::PortOnly(1626).candidates();
        assert_eq!(candidates[0], SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 1626));
    }
}
