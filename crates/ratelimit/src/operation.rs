/// The two operation classes spec.md §4.2 requires, each with its own
/// default rate and burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Minting a new session. Lower rate, smaller burst: default 10/min,
    /// burst 3.
    SessionCreate,
    /// Joining an existing session by code. Higher rate: default 30/min,
    /// burst 10.
    SessionJoin,
}

impl Operation {
    /// `(tokens per second, burst capacity)`.
    pub fn defaults(self) -> (f64, f64) {
        match self {
            Operation::SessionCreate => (10.0 / 60.0, 3.0),
            Operation::SessionJoin => (30.0 / 60.0, 10.0),
        }
    }
}
