use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use burrow_proto::{Claims, Code, Role, SessionId};
use burrow_token::TokenSigner;
use parking_lot::Mutex;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::record::{CreatedSession, JoinedSession, SessionRecord, StatusView};

const MAX_CODE_COLLISION_RETRIES: usize = 10;

struct Inner {
    by_id: HashMap<SessionId, SessionRecord>,
    by_code: HashMap<Code, SessionId>,
}

/// Authoritative session records, indexed by id and by code, behind one
/// mutex so that `create`'s id+code insertion and `join`'s lookup-then-mint
/// are each a single critical section (spec.md §4.3).
pub struct SessionStore {
    inner: Mutex<Inner>,
    signer: Arc<TokenSigner>,
    ttl: Duration,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_secs()
}

impl SessionStore {
    pub fn new(signer: Arc<TokenSigner>, ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                by_id: HashMap::new(),
                by_code: HashMap::new(),
            }),
            signer,
            ttl,
        })
    }

    /// Mints a fresh session: a unique id, a unique code, and a host
    /// capability token bound to `(id, Role::Host, expiry)`.
    pub fn create(&self) -> Result<CreatedSession, StoreError> {
        let now = now_unix();
        let expires_at_unix = now + self.ttl.as_secs();
        let id = SessionId::generate();
        let host_token = self.signer.sign(&Claims::new(id, Role::Host, expires_at_unix));

        let mut inner = self.inner.lock();
        let code = Self::draw_unique_code(&inner.by_code)?;

        let record = SessionRecord {
            id,
            code: code.clone(),
            host_token: host_token.clone(),
            joiner_token: None,
            host_connected: false,
            joiner_connected: false,
            created_at_unix: now,
            expires_at_unix,
            version: 0,
        };
        inner.by_code.insert(code.clone(), id);
        inner.by_id.insert(id, record);
        drop(inner);

        info!(%id, %code, "session created");
        Ok(CreatedSession {
            id,
            code,
            host_token,
            expires_at_unix,
        })
    }

    fn draw_unique_code(by_code: &HashMap<Code, SessionId>) -> Result<Code, StoreError> {
        for _ in 0..MAX_CODE_COLLISION_RETRIES {
            let candidate = Code::generate();
            if !by_code.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        Err(StoreError::Internal(
            "exhausted retries drawing a unique session code".into(),
        ))
    }

    /// Looks up `code_input` (case-insensitive, dashes optional), rejects if
    /// absent/expired/already joined, and mints+installs the joiner token —
    /// all within one critical section, so a concurrent second join on the
    /// same code always fails.
    pub fn join(&self, code_input: &str) -> Result<JoinedSession, StoreError> {
        let code = Code::normalize(code_input).map_err(|_| StoreError::NotFound)?;
        let now = now_unix();

        let mut inner = self.inner.lock();
        let Some(&id) = inner.by_code.get(&code) else {
            return Err(StoreError::NotFound);
        };

        let expired = inner
            .by_id
            .get(&id)
            .map(|r| r.is_expired(now))
            .unwrap_or(true);
        if expired {
            Self::remove_locked(&mut inner, id);
            return Err(StoreError::NotFound);
        }

        let record = inner.by_id.get_mut(&id).expect("checked present above");
        if record.joiner_token.is_some() {
            return Err(StoreError::Conflict);
        }

        let joiner_token = self
            .signer
            .sign(&Claims::new(id, Role::Joiner, record.expires_at_unix));
        record.joiner_token = Some(joiner_token.clone());
        record.version += 1;
        let host_connected = record.host_connected;
        drop(inner);

        info!(%id, "joiner admitted");
        Ok(JoinedSession {
            id,
            joiner_token,
            host_connected,
        })
    }

    pub fn status(&self, id: SessionId) -> Result<StatusView, StoreError> {
        let now = now_unix();
        let mut inner = self.inner.lock();
        let expired = inner.by_id.get(&id).map(|r| r.is_expired(now));
        match expired {
            None => Err(StoreError::NotFound),
            Some(true) => {
                Self::remove_locked(&mut inner, id);
                Err(StoreError::NotFound)
            }
            Some(false) => {
                let record = &inner.by_id[&id];
                Ok(StatusView {
                    host_connected: record.host_connected,
                    joiner_connected: record.joiner_connected,
                    expires_at_unix: record.expires_at_unix,
                })
            }
        }
    }

    /// The relay is the only intended writer of liveness flags (see
    /// spec.md §9's open question on this point; resolved here in favor of
    /// the spec's own recommendation).
    pub fn set_connected(&self, id: SessionId, role: Role, connected: bool) -> Result<(), StoreError> {
        let now = now_unix();
        let mut inner = self.inner.lock();
        let expired = inner.by_id.get(&id).map(|r| r.is_expired(now));
        match expired {
            None => Err(StoreError::NotFound),
            Some(true) => {
                Self::remove_locked(&mut inner, id);
                Err(StoreError::NotFound)
            }
            Some(false) => {
                let record = inner.by_id.get_mut(&id).expect("checked present above");
                match role {
                    Role::Host => record.host_connected = connected,
                    Role::Joiner => record.joiner_connected = connected,
                }
                record.version += 1;
                Ok(())
            }
        }
    }

    /// Deletes a session. The caller must present the session's own host
    /// token; any other value, including a valid token for a different
    /// session, is rejected. The comparison is constant-time, the same way
    /// `TokenSigner::verify` compares MACs, so a caller can't use response
    /// timing to narrow down a correct token byte by byte.
    pub fn delete(&self, id: SessionId, host_token: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let Some(record) = inner.by_id.get(&id) else {
            return Err(StoreError::NotFound);
        };
        let matches = record.host_token.len() == host_token.len()
            && record.host_token.as_bytes().ct_eq(host_token.as_bytes()).unwrap_u8() == 1;
        if !matches {
            return Err(StoreError::Forbidden);
        }
        Self::remove_locked(&mut inner, id);
        Ok(())
    }

    /// Removes a record from both indices atomically. Caller must already
    /// hold `inner`'s lock.
    fn remove_locked(inner: &mut Inner, id: SessionId) {
        if let Some(record) = inner.by_id.remove(&id) {
            inner.by_code.remove(&record.code);
        }
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().by_id.len()
    }

    /// Starts the janitor task on a fixed interval; holds only a `Weak`
    /// reference so it stops on its own once the store is dropped.
    pub fn spawn_janitor(self: &Arc<Self>, sweep_interval: Duration) -> tokio::task::JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    debug!("session store dropped, stopping janitor");
                    break;
                };
                store.sweep_expired();
            }
        })
    }

    fn sweep_expired(&self) {
        let now = now_unix();
        let mut inner = self.inner.lock();
        let expired_ids: Vec<SessionId> = inner
            .by_id
            .iter()
            .filter(|(_, r)| r.is_expired(now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired_ids {
            Self::remove_locked(&mut inner, *id);
        }
        if !expired_ids.is_empty() {
            warn!(count = expired_ids.len(), "session janitor reaped expired sessions");
        }
    }
}
