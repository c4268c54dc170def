//! No library surface of its own — this crate exists only to host the
//! `tests/` suite that wires rendezvous, relay and bridge together over
//! real loopback sockets, since the workspace root itself is a virtual
//! manifest and cannot own a `tests/` directory.
