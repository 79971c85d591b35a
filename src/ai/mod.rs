//! Computer Opponents
//!
//! Three tiers behind one [`Strategy`] trait:
//!
//! - `weighted`: random with boosts for captures and opening virgin pieces
//! - `greedy`: one-ply linear scoring
//! - `rollout`: Monte-Carlo playouts over the stick-dice distribution
//!
//! `worker` runs a decision on tokio's blocking pool with a cancel flag.

pub mod weighted;
pub mod greedy;
pub mod rollout;
pub mod worker;

use std::fmt;
use std::sync::atomic::AtomicBool;

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::board::{Board, Move, Side};

pub use weighted::WeightedRandom;
pub use greedy::Greedy;
pub use rollout::{MonteCarlo, RolloutConfig, RolloutDecision};
pub use worker::{spawn_decision, DecisionHandle};

/// A move picker.
pub trait Strategy: Send + Sync {
    /// Short tier name for logs.
    fn name(&self) -> &'static str;

    /// Pick a move for `side` with a throw of `steps`.
    ///
    /// `None` when there is no legal move or `cancel` was raised mid-search.
    fn pick(
        &self,
        board: &Board,
        side: Side,
        steps: u8,
        rng: &mut DeterministicRng,
        cancel: &AtomicBool,
    ) -> Option<Move>;
}

/// AI tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse the wire value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Strategy implementing this tier.
    pub fn strategy(self) -> Box<dyn Strategy> {
        match self {
            Difficulty::Easy => Box::new(WeightedRandom::default()),
            Difficulty::Medium => Box::new(Greedy::default()),
            Difficulty::Hard => Box::new(MonteCarlo::default()),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::Cell;
    use crate::game::moves::MoveGenerator;

    #[test]
    fn test_difficulty_parse() {
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(Difficulty::parse(d.as_str()), Some(d));
        }
        assert_eq!(Difficulty::parse("brutal"), None);
    }

    #[test]
    fn test_every_tier_picks_a_legal_opening() {
        let board = Board::setup(9);
        let cancel = AtomicBool::new(false);
        let legal = MoveGenerator::new(&board).legal_moves(1, Side::Blue);

        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let mut rng = DeterministicRng::new(11);
            let mv = d.strategy().pick(&board, Side::Blue, 1, &mut rng, &cancel);
            assert_eq!(mv, Some(Move { from: Cell::new(0, 0), to: Cell::new(1, 0) }), "{}", d);
            assert!(legal.contains(&mv.unwrap()));
        }
    }

    #[test]
    fn test_every_tier_returns_none_without_moves() {
        let board = Board::setup(9);
        let cancel = AtomicBool::new(false);
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let mut rng = DeterministicRng::new(3);
            assert_eq!(d.strategy().pick(&board, Side::Red, 2, &mut rng, &cancel), None);
        }
    }
}
