//! # Tâb Server
//!
//! Rule engine and authoritative match server for Tâb, a four-row
//! race-and-capture board game played with four two-faced stick dice.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         TAB SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  ├── hash.rs     - SHA-256 state hashing                     │
//! │  └── clock.rs    - Injectable wall clock                     │
//! │                                                              │
//! │  game/           - Rules (pure)                              │
//! │  ├── board.rs    - Cells, pieces, board                      │
//! │  ├── topology.rs - Track adjacency                           │
//! │  ├── dice.rs     - Stick dice                                │
//! │  ├── moves.rs    - Legal move generation                     │
//! │  ├── state.rs    - Match state and turn machine              │
//! │  └── events.rs   - Deltas                                    │
//! │                                                              │
//! │  ai/             - Computer opponents                        │
//! │                                                              │
//! │  network/        - Server (non-deterministic)                │
//! │  ├── session.rs  - Session store and AI driver               │
//! │  ├── http.rs     - HTTP commands + SSE stream                │
//! │  ├── ws.rs       - WebSocket gateway                         │
//! │  └── persist.rs  - Snapshots                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! `game/` and `ai/` never read the clock or the OS entropy pool: time is
//! passed in, dice come from a seeded generator stored in the match. Only
//! `network/` seeds generators from entropy, and the wall clock sits behind
//! the `core::clock::Clock` seam. Given a seed and the same commands, a
//! match replays to the same state hash.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod ai;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use game::board::{Board, Cell, Move, Side};
pub use game::state::{MatchState, PlayError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
