use std::time::Duration;

use serde::Deserialize;

fn default_bind_addr() -> String {
    "0.0.0.0:8787".to_string()
}

fn default_session_ttl_secs() -> u64 {
    15 * 60
}

fn default_rate_limit_idle_horizon_secs() -> u64 {
    3 * 60
}

fn default_rate_limit_sweep_interval_secs() -> u64 {
    60
}

fn default_session_janitor_sweep_secs() -> u64 {
    30
}

/// Rendezvous-side configuration, loaded by the `rendezvous-server` binary
/// via `figment` (file + environment merge), one field per spec.md §5/§6
/// knob — nothing here is a hardcoded constant in a handler.
///
/// A missing or default-looking `mac_secret` is refused by
/// [`RendezvousConfig::validate`]: spec.md §6 requires the shared MAC
/// secret to be a required configuration input, and a placeholder default
/// is an error that must be logged loudly, not silently accepted.
#[derive(Clone, Debug, Deserialize)]
pub struct RendezvousConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    pub mac_secret: String,

    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_rate_limit_idle_horizon_secs")]
    pub rate_limit_idle_horizon_secs: u64,

    #[serde(default = "default_rate_limit_sweep_interval_secs")]
    pub rate_limit_sweep_interval_secs: u64,

    #[serde(default = "default_session_janitor_sweep_secs")]
    pub session_janitor_sweep_secs: u64,
}

/// The placeholder value rejected by [`RendezvousConfig::validate`]. Anyone
/// shipping this literal string as their secret has not configured one.
pub const INSECURE_DEFAULT_SECRET: &str = "changeme";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "mac_secret is missing or still set to the insecure default \"{INSECURE_DEFAULT_SECRET}\"; \
         configure a long, random, unique secret before starting the rendezvous service"
    )]
    InsecureSecret,
}

impl RendezvousConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mac_secret.is_empty() || self.mac_secret == INSECURE_DEFAULT_SECRET {
            return Err(ConfigError::InsecureSecret);
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn rate_limit_idle_horizon(&self) -> Duration {
        Duration::from_secs(self.rate_limit_idle_horizon_secs)
    }

    pub fn rate_limit_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_interval_secs)
    }

    pub fn session_janitor_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_janitor_sweep_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_the_insecure_default_secret() {
        let config = RendezvousConfig {
            bind_addr: default_bind_addr(),
            mac_secret: INSECURE_DEFAULT_SECRET.to_string(),
            session_ttl_secs: default_session_ttl_secs(),
            rate_limit_idle_horizon_secs: default_rate_limit_idle_horizon_secs(),
            rate_limit_sweep_interval_secs: default_rate_limit_sweep_interval_secs(),
            session_janitor_sweep_secs: default_session_janitor_sweep_secs(),
        };
        assert!(matches!(config.validate(), Err(ConfigError::InsecureSecret)));
    }

    #[test]
    fn accepts_a_real_secret() {
        let config = RendezvousConfig {
            bind_addr: default_bind_addr(),
            mac_secret: "a sufficiently long random secret".to_string(),
            session_ttl_secs: default_session_ttl_secs(),
            rate_limit_idle_horizon_secs: default_rate_limit_idle_horizon_secs(),
            rate_limit_sweep_interval_secs: default_rate_limit_sweep_interval_secs(),
            session_janitor_sweep_secs: default_session_janitor_sweep_secs(),
        };
        assert!(config.validate().is_ok());
    }
}
