//! Core deterministic primitives.
//!
//! Seeded randomness, state hashing and the clock seam the rest of the
//! crate is built on.

pub mod rng;
pub mod hash;
pub mod clock;

// Re-export core types
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher};
pub use clock::{Clock, ManualClock, SystemClock};
