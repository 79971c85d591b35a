//! Game Rules Module
//!
//! Pure rule engine. No I/O and no clocks: callers pass `now` in.
//!
//! ## Module Structure
//!
//! - `board`: Cells, pieces, squares and the board itself
//! - `topology`: Directed track adjacency for a board width
//! - `dice`: Four stick dice
//! - `moves`: Legal move generation
//! - `state`: Match state and the turn machine
//! - `events`: Deltas emitted by accepted mutations

pub mod board;
pub mod topology;
pub mod dice;
pub mod moves;
pub mod state;
pub mod events;

// Re-export key types
pub use board::{Board, Cell, Move, Piece, Side, Square};
pub use topology::BoardTopology;
pub use dice::{DiceModel, DiceResult};
pub use moves::MoveGenerator;
pub use state::{FirstPlayer, MatchState, MatchStatus, PlayError, TurnPhase};
pub use events::{FinishReason, GameEvent};
