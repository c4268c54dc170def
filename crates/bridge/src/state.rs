/// The bridge's lifecycle, per spec.md §3 and the transition table in §4.6.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeState {
    Init,
    WaitingForLocalListener,
    Ready,
    RelayAttached,
    Forwarding,
    Closed,
    Error,
}

impl BridgeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BridgeState::Closed | BridgeState::Error)
    }
}
