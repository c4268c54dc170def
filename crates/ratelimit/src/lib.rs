//! A per-identity, per-operation token-bucket rate limiter with a
//! self-driving janitor task.
//!
//! `allow` is the only hot-path operation and never awaits: the bucket map
//! is guarded by a single `parking_lot::Mutex`, acquired for the duration
//! of one lookup-or-insert-then-decrement, never held across I/O.

mod bucket;
mod limiter;
mod operation;

pub use limiter::RateLimiter;
pub use operation::Operation;
