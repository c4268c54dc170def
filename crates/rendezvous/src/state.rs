use std::sync::Arc;

use burrow_ratelimit::RateLimiter;
use burrow_session::SessionStore;
use burrow_token::TokenSigner;

use crate::config::RendezvousConfig;

/// Everything a handler needs, injected once at startup via
/// [`salvo::Depot::inject`] rather than reached through a process-global
/// `OnceLock` — the teacher's admin-server favors the global for its single
/// long-lived binary, but `Depot` injection is the idiom the teacher itself
/// uses in `hoops::auth` for anything a handler needs per-request, and it
/// keeps this crate testable without process-wide statics.
#[derive(Clone)]
pub struct RendezvousState {
    pub store: Arc<SessionStore>,
    pub signer: Arc<TokenSigner>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<RendezvousConfig>,
}

impl RendezvousState {
    pub fn new(config: RendezvousConfig) -> Arc<Self> {
        let config = Arc::new(config);
        let signer = Arc::new(TokenSigner::new(config.mac_secret.clone()));
        let store = SessionStore::new(signer.clone(), config.session_ttl());
        let limiter = RateLimiter::new(config.rate_limit_idle_horizon());

        store.spawn_janitor(config.session_janitor_sweep_interval());
        limiter.spawn_janitor(config.rate_limit_sweep_interval());

        Arc::new(Self {
            store,
            signer,
            limiter,
            config,
        })
    }
}
