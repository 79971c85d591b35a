//! Greedy one-ply tier.

use std::sync::atomic::AtomicBool;

use crate::ai::Strategy;
use crate::core::rng::DeterministicRng;
use crate::game::board::{Board, Move, Side};
use crate::game::moves::MoveGenerator;

/// Scores every legal move once and keeps the best, first seen on ties.
#[derive(Clone, Debug)]
pub struct Greedy {
    pub capture_bonus: i32,
    /// Per row of forward progress.
    pub advance_weight: i32,
    pub virgin_bonus: i32,
}

impl Default for Greedy {
    fn default() -> Self {
        Self { capture_bonus: 5, advance_weight: 2, virgin_bonus: 1 }
    }
}

impl Greedy {
    /// Linear score of `mv`.
    pub fn score(&self, board: &Board, side: Side, mv: Move) -> i32 {
        let mut score = 0;
        if MoveGenerator::new(board).is_capture(mv, side) {
            score += self.capture_bonus;
        }

        let advance = side.progress(mv.to.row) as i32 - side.progress(mv.from.row) as i32;
        score += self.advance_weight * advance.max(0);

        if board.piece_at(mv.from).map(|p| !p.has_moved).unwrap_or(false) {
            score += self.virgin_bonus;
        }
        score
    }
}

impl Strategy for Greedy {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn pick(
        &self,
        board: &Board,
        side: Side,
        steps: u8,
        _rng: &mut DeterministicRng,
        _cancel: &AtomicBool,
    ) -> Option<Move> {
        let mut best: Option<(Move, i32)> = None;
        for mv in MoveGenerator::new(board).legal_moves(steps, side) {
            let score = self.score(board, side, mv);
            match best {
                Some((_, s)) if s >= score => {}
                _ => best = Some((mv, score)),
            }
        }
        best.map(|(mv, _)| mv)
    }
}
