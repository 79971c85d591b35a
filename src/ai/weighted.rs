//! Weighted-random tier.

use std::sync::atomic::AtomicBool;

use crate::ai::Strategy;
use crate::core::rng::DeterministicRng;
use crate::game::board::{Board, Move, Side};
use crate::game::moves::MoveGenerator;

/// Uniform over legal moves, with multiplicative boosts.
#[derive(Clone, Debug)]
pub struct WeightedRandom {
    /// Weight factor for a capturing move.
    pub capture_boost: f64,
    /// Weight factor for moving a virgin piece on a throw of 1.
    pub virgin_boost: f64,
}

impl Default for WeightedRandom {
    fn default() -> Self {
        Self { capture_boost: 3.0, virgin_boost: 2.0 }
    }
}

impl WeightedRandom {
    /// Weight of one candidate.
    pub fn weight(&self, board: &Board, side: Side, steps: u8, mv: Move) -> f64 {
        let mut w = 1.0;
        if MoveGenerator::new(board).is_capture(mv, side) {
            w *= self.capture_boost;
        }
        if steps == 1 && board.piece_at(mv.from).map(|p| !p.has_moved).unwrap_or(false) {
            w *= self.virgin_boost;
        }
        w
    }
}

impl Strategy for WeightedRandom {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn pick(
        &self,
        board: &Board,
        side: Side,
        steps: u8,
        rng: &mut DeterministicRng,
        _cancel: &AtomicBool,
    ) -> Option<Move> {
        let moves = MoveGenerator::new(board).legal_moves(steps, side);
        let weights: Vec<f64> = moves
            .iter()
            .map(|mv| self.weight(board, side, steps, *mv))
            .collect();
        let idx = rng.weighted_index(&weights)?;
        moves.get(idx).copied()
    }
}
