//! Blocking decision worker.
//!
//! Rollout search is CPU-bound, so decisions run on tokio's blocking pool.
//! The caller owns the cancel flag; the search polls it between playouts.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::ai::Difficulty;
use crate::core::rng::DeterministicRng;
use crate::game::board::{Board, Move, Side};

/// An in-flight decision.
#[derive(Debug)]
pub struct DecisionHandle {
    task: JoinHandle<Option<Move>>,
}

impl DecisionHandle {
    /// Wait for the decision. `None` if cancelled, moveless, or the worker died.
    pub async fn join(self) -> Option<Move> {
        match self.task.await {
            Ok(mv) => mv,
            Err(e) => {
                warn!(error = %e, "AI worker failed");
                None
            }
        }
    }
}

/// Start a decision on the blocking pool. Raising `cancel` stops it.
pub fn spawn_decision(
    difficulty: Difficulty,
    board: Board,
    side: Side,
    steps: u8,
    mut rng: DeterministicRng,
    cancel: Arc<AtomicBool>,
) -> DecisionHandle {
    let task = tokio::task::spawn_blocking(move || {
        difficulty.strategy().pick(&board, side, steps, &mut rng, &cancel)
    });

    DecisionHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::game::board::Cell;

    fn fresh_flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[tokio::test]
    async fn test_decision_completes() {
        let handle =
            spawn_decision(Difficulty::Hard, Board::setup(5), Side::Blue, 1, DeterministicRng::new(2), fresh_flag());
        let mv = handle.join().await;
        assert_eq!(mv, Some(Move { from: Cell::new(0, 0), to: Cell::new(1, 0) }));
    }

    #[tokio::test]
    async fn test_raised_flag_yields_none() {
        let cancel = fresh_flag();
        cancel.store(true, Ordering::Relaxed);
        let handle = spawn_decision(
            Difficulty::Hard,
            Board::setup(7),
            Side::Blue,
            1,
            DeterministicRng::new(9),
            Arc::clone(&cancel),
        );
        assert_eq!(handle.join().await, None);
    }
}
