use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

fn default_bind_addr() -> String {
    "0.0.0.0:7443".to_string()
}

fn default_handshake_timeout_secs() -> u64 {
    10
}

fn default_pair_timeout_secs() -> u64 {
    30
}

fn default_janitor_sweep_secs() -> u64 {
    10
}

fn default_max_session_secs() -> u64 {
    4 * 60 * 60
}

/// Relay-side configuration, loaded by the `relay-server` binary via
/// `figment` (file + environment merge), mirroring the teacher's
/// config-loading stack. Every timeout named in spec.md §5 is a field here,
/// never a hardcoded constant in the hot path.
#[derive(Clone, Debug, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// How long a pending half waits for its opposite-role peer before the
    /// janitor reaps it. Acceptable range per spec.md §4.5: 30s strict to
    /// 24h permissive.
    #[serde(default = "default_pair_timeout_secs")]
    pub pair_timeout_secs: u64,

    #[serde(default = "default_janitor_sweep_secs")]
    pub janitor_sweep_interval_secs: u64,

    #[serde(default = "default_max_session_secs")]
    pub max_session_duration_secs: u64,

    /// Both must be set for the relay to wrap accepted connections in TLS
    /// (spec.md §4.5, §6's "TLS cert/key paths" configuration input); either
    /// alone is treated as TLS being unconfigured by [`RelayConfig::tls_paths`].
    #[serde(default)]
    pub tls_cert_path: Option<PathBuf>,

    #[serde(default)]
    pub tls_key_path: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            pair_timeout_secs: default_pair_timeout_secs(),
            janitor_sweep_interval_secs: default_janitor_sweep_secs(),
            max_session_duration_secs: default_max_session_secs(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl RelayConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn pair_timeout(&self) -> Duration {
        Duration::from_secs(self.pair_timeout_secs)
    }

    pub fn janitor_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_sweep_interval_secs)
    }

    pub fn max_session_duration(&self) -> Duration {
        Duration::from_secs(self.max_session_duration_secs)
    }

    /// `Some((cert, key))` only when both paths are configured.
    pub fn tls_paths(&self) -> Option<(&Path, &Path)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}
