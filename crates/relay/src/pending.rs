use std::collections::HashMap;

use burrow_proto::{Role, SessionId};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::stream::RelayStream;

/// A parked, authenticated connection waiting for its opposite-role peer.
pub struct PendingConn {
    pub socket: RelayStream,
    pub role: Role,
    pub parked_at: Instant,
}

/// What happened to a newly authenticated connection when it reached the
/// pairing critical section.
pub enum PairingOutcome {
    /// No opposite-role peer was waiting; this connection is now parked.
    Parked,
    /// An opposite-role peer was waiting; the two sockets are handed back
    /// to the caller (in `(host, joiner)` order) to splice outside the lock.
    Paired { host: RelayStream, joiner: RelayStream },
}

/// The relay's single owning abstraction over in-flight connections,
/// keyed by session id. Per spec.md §9's "concurrent map + per-value mutex"
/// redesign note, callers never reach inside the map directly — every
/// operation goes through a method on this type, and the method holds the
/// lock for the whole decision but never across a socket read/write.
pub struct PendingTable {
    entries: Mutex<HashMap<SessionId, PendingConn>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Applies the pairing rule from spec.md §4.5 for `socket` arriving
    /// with (`session_id`, `role`). The socket handoff (moving `TcpStream`s
    /// out of the map) happens before the lock is released; nothing here
    /// awaits while holding it.
    pub fn offer(&self, session_id: SessionId, role: Role, socket: RelayStream) -> PairingOutcome {
        let mut entries = self.entries.lock();
        match entries.remove(&session_id) {
            Some(existing) if existing.role != role => {
                let (host, joiner) = match role {
                    Role::Host => (socket, existing.socket),
                    Role::Joiner => (existing.socket, socket),
                };
                PairingOutcome::Paired { host, joiner }
            }
            Some(_same_role) => {
                // The prior same-role pending socket is dropped here, which
                // closes it: the newest connection for a role wins.
                entries.insert(
                    session_id,
                    PendingConn {
                        socket,
                        role,
                        parked_at: Instant::now(),
                    },
                );
                PairingOutcome::Parked
            }
            None => {
                entries.insert(
                    session_id,
                    PendingConn {
                        socket,
                        role,
                        parked_at: Instant::now(),
                    },
                );
                PairingOutcome::Parked
            }
        }
    }

    /// Removes and returns every entry older than `pair_timeout`, for the
    /// janitor to close. Holding the lock only for the `retain` pass keeps
    /// this from ever blocking a concurrent `offer`/`remove` for long.
    pub fn reap_expired(&self, pair_timeout: std::time::Duration) -> Vec<(SessionId, PendingConn)> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<SessionId> = entries
            .iter()
            .filter(|(_, conn)| now.saturating_duration_since(conn.parked_at) >= pair_timeout)
            .map(|(sid, _)| *sid)
            .collect();
        expired
            .into_iter()
            .filter_map(|sid| entries.remove(&sid).map(|conn| (sid, conn)))
            .collect()
    }

    /// Removes a specific pending entry if it is still the one originally
    /// installed (identified by role), used when a parked connection's own
    /// owner gives up waiting (e.g. its socket errored while parked).
    pub fn remove_if_role(&self, session_id: SessionId, role: Role) -> Option<PendingConn> {
        let mut entries = self.entries.lock();
        if entries.get(&session_id).is_some_and(|c| c.role == role) {
            entries.remove(&session_id)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpStream;

    use super::*;

    async fn dummy_socket_pair() -> (RelayStream, RelayStream) {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let (accept_result, connect_result) = tokio::join!(listener.accept(), connect);
        let accepted: RelayStream = Box::new(accept_result.unwrap().0);
        let connected: RelayStream = Box::new(connect_result.unwrap());
        (accepted, connected)
    }

    #[tokio::test]
    async fn opposite_role_pairs_immediately() {
        let table = PendingTable::new();
        let sid = SessionId::generate();
        let (host_socket, _h) = dummy_socket_pair().await;
        let (joiner_socket, _j) = dummy_socket_pair().await;

        assert!(matches!(table.offer(sid, Role::Host, host_socket), PairingOutcome::Parked));
        assert_eq!(table.len(), 1);

        match table.offer(sid, Role::Joiner, joiner_socket) {
            PairingOutcome::Paired { .. } => {}
            PairingOutcome::Parked => panic!("expected a pairing"),
        }
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn same_role_replaces_the_prior_pending_entry() {
        let table = PendingTable::new();
        let sid = SessionId::generate();
        let (first, _a) = dummy_socket_pair().await;
        let (second, _b) = dummy_socket_pair().await;

        assert!(matches!(table.offer(sid, Role::Host, first), PairingOutcome::Parked));
        assert!(matches!(table.offer(sid, Role::Host, second), PairingOutcome::Parked));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn three_or_more_arrivals_pair_at_most_once() {
        let table = PendingTable::new();
        let sid = SessionId::generate();
        let (host, _h) = dummy_socket_pair().await;
        let (joiner_a, _ja) = dummy_socket_pair().await;
        let (joiner_b, _jb) = dummy_socket_pair().await;

        table.offer(sid, Role::Host, host);
        let first = table.offer(sid, Role::Joiner, joiner_a);
        assert!(matches!(first, PairingOutcome::Paired { .. }));

        // Nothing pending anymore; a second joiner just parks alone.
        let second = table.offer(sid, Role::Joiner, joiner_b);
        assert!(matches!(second, PairingOutcome::Parked));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn reap_expired_removes_only_stale_entries() {
        let table = PendingTable::new();
        let sid_old = SessionId::generate();
        let sid_fresh = SessionId::generate();
        let (old_socket, _a) = dummy_socket_pair().await;
        let (fresh_socket, _b) = dummy_socket_pair().await;

        table.offer(sid_old, Role::Host, old_socket);
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        table.offer(sid_fresh, Role::Host, fresh_socket);

        let reaped = table.reap_expired(std::time::Duration::from_millis(20));
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].0, sid_old);
        assert_eq!(table.len(), 1);
    }
}
