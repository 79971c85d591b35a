//! Monte-Carlo Rollout Tier
//!
//! Each root move is applied and then scored by averaging a static
//! evaluation over short random playouts. Playouts draw dice from the stick
//! distribution, prefer captures, and keep the mover on repeat values.
//!
//! A root move that leaves the opponent with no pieces is returned at once,
//! before any playout runs.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::ai::Strategy;
use crate::core::rng::DeterministicRng;
use crate::game::board::{Board, Move, Side};
use crate::game::dice::{grants_repeat, DiceModel};
use crate::game::moves::MoveGenerator;

/// Search parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Playouts per root move.
    pub simulations: u32,
    /// Throws per playout.
    pub depth: u32,
    /// Added to a root move's average when it captures.
    pub root_capture_bonus: f64,
    /// Weight of the material differential.
    pub material_weight: f64,
    /// Weight per row of own advancement.
    pub advance_weight: f64,
    /// Bonus per own piece resting on the far row.
    pub far_row_bonus: f64,
    /// Penalty per row of enemy advancement toward our home row.
    pub threat_weight: f64,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            simulations: 140,
            depth: 5,
            root_capture_bonus: 15.0,
            material_weight: 20.0,
            advance_weight: 1.0,
            far_row_bonus: 8.0,
            threat_weight: 0.6,
        }
    }
}

impl RolloutConfig {
    /// Override the playout count.
    pub fn with_simulations(mut self, simulations: u32) -> Self {
        self.simulations = simulations;
        self
    }

    /// Override the playout depth.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

/// Result of one search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RolloutDecision {
    pub mv: Move,
    /// Average evaluation, including the root capture bonus.
    pub score: f64,
    /// Total playouts run across all root moves.
    pub playouts: u32,
}

/// Monte-Carlo rollout strategy.
#[derive(Clone, Debug, Default)]
pub struct MonteCarlo {
    pub config: RolloutConfig,
}

impl MonteCarlo {
    /// Strategy with explicit parameters.
    pub fn new(config: RolloutConfig) -> Self {
        Self { config }
    }

    /// Static evaluation of `board` from `side`'s point of view.
    pub fn evaluate(&self, board: &Board, side: Side) -> f64 {
        let cfg = &self.config;
        let enemy = side.opponent();
        let mut score = (board.count(side) as f64 - board.count(enemy) as f64) * cfg.material_weight;

        for (cell, piece) in board.pieces() {
            if piece.side == side {
                score += side.progress(cell.row) as f64 * cfg.advance_weight;
                if cell.row == side.far_row() {
                    score += cfg.far_row_bonus;
                }
            } else {
                score -= enemy.progress(cell.row) as f64 * cfg.threat_weight;
            }
        }
        score
    }

    /// Full search. `None` when there is no legal move or `cancel` fired.
    pub fn decide(
        &self,
        board: &Board,
        side: Side,
        steps: u8,
        rng: &mut DeterministicRng,
        cancel: &AtomicBool,
    ) -> Option<RolloutDecision> {
        let generator = MoveGenerator::new(board);
        let roots = generator.legal_moves(steps, side);
        if roots.is_empty() {
            return None;
        }

        let mut children = Vec::with_capacity(roots.len());
        for mv in &roots {
            let mut child = board.clone();
            child.apply_move(*mv);
            if child.count(side.opponent()) == 0 {
                return Some(RolloutDecision { mv: *mv, score: f64::INFINITY, playouts: 0 });
            }
            children.push((*mv, generator.is_capture(*mv, side), child));
        }

        let first_mover = if grants_repeat(steps) { side } else { side.opponent() };
        let mut best: Option<(Move, f64, bool)> = None;
        let mut playouts = 0u32;

        for (mv, capture, child) in children {
            let mut total = 0.0;
            for _ in 0..self.config.simulations {
                if cancel.load(Ordering::Relaxed) {
                    debug!(playouts, "rollout search cancelled");
                    return None;
                }
                total += self.playout(&child, side, first_mover, rng);
                playouts += 1;
            }

            let mut avg = total / self.config.simulations.max(1) as f64;
            if capture {
                avg += self.config.root_capture_bonus;
            }

            let better = match best {
                None => true,
                Some((_, s, c)) => avg > s || (avg == s && capture && !c),
            };
            if better {
                best = Some((mv, avg, capture));
            }
        }

        best.map(|(mv, score, _)| RolloutDecision { mv, score, playouts })
    }

    fn playout(&self, start: &Board, side: Side, first_mover: Side, rng: &mut DeterministicRng) -> f64 {
        let mut board = start.clone();
        let mut mover = first_mover;

        for _ in 0..self.config.depth {
            if board.count(Side::Blue) == 0 || board.count(Side::Red) == 0 {
                break;
            }

            let roll = DiceModel::roll_value(rng);
            let generator = MoveGenerator::new(&board);
            let moves = generator.legal_moves(roll, mover);
            if moves.is_empty() {
                mover = mover.opponent();
                continue;
            }

            let captures: Vec<Move> = moves
                .iter()
                .copied()
                .filter(|mv| generator.is_capture(*mv, mover))
                .collect();
            let pool = if captures.is_empty() { &moves } else { &captures };
            let Some(chosen) = rng.choose(pool).copied() else {
                break;
            };

            board.apply_move(chosen);
            if !grants_repeat(roll) {
                mover = mover.opponent();
            }
        }

        self.evaluate(&board, side)
    }
}

impl Strategy for MonteCarlo {
    fn name(&self) -> &'static str {
        "rollout"
    }

    fn pick(
        &self,
        board: &Board,
        side: Side,
        steps: u8,
        rng: &mut DeterministicRng,
        cancel: &AtomicBool,
    ) -> Option<Move> {
        let decision = self.decide(board, side, steps, rng, cancel)?;
        debug!(
            mv.from = %decision.mv.from,
            mv.to = %decision.mv.to,
            score = decision.score,
            playouts = decision.playouts,
            "rollout decision"
        );
        Some(decision.mv)
    }
}
