//! Legal Move Generation
//!
//! Breadth-first walk along the track topology. Rules, in order:
//!
//! 1. No piece at the origin, or a piece of the wrong side: nothing.
//! 2. A never-moved piece only moves on a throw of exactly 1.
//! 3. A piece on the opponent's far row is frozen while its side still has a
//!    never-moved piece on its own home row.
//! 4. Walk exactly `steps` hops. Intermediate hops may pass over any piece;
//!    the final hop may land on an empty cell or capture an enemy, never on
//!    an ally.
//! 5. Drop destinations on the side's home row unless the origin is already
//!    there, and stop blessed pieces re-entering the far row from elsewhere.

use std::collections::BTreeSet;

use crate::game::board::{Board, Cell, Move, Side};

/// Stateless move generator over one board position.
#[derive(Clone, Copy, Debug)]
pub struct MoveGenerator<'a> {
    board: &'a Board,
}

impl<'a> MoveGenerator<'a> {
    /// Generator for `board`.
    pub fn new(board: &'a Board) -> Self {
        Self { board }
    }

    /// Legal destinations for the piece on `origin` moving `steps` hops.
    pub fn generate(&self, origin: Cell, steps: u8, side: Side) -> BTreeSet<Cell> {
        let piece = match self.board.piece_at(origin) {
            Some(p) if p.side == side => p,
            _ => return BTreeSet::new(),
        };

        if !piece.has_moved && steps != 1 {
            return BTreeSet::new();
        }

        let far_row = side.far_row();
        if origin.row == far_row && self.board.has_unmoved_on_home_row(side) {
            return BTreeSet::new();
        }

        let topology = self.board.topology();
        let mut frontier = BTreeSet::from([origin]);

        for hop in 0..steps {
            let last_hop = hop + 1 == steps;
            let mut next = BTreeSet::new();

            for cell in &frontier {
                for succ in topology.successors(*cell) {
                    match self.board.square(*succ).side() {
                        Some(owner) if last_hop && owner == side => {}
                        _ => {
                            next.insert(*succ);
                        }
                    }
                }
            }

            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }

        let home_row = side.home_row();
        frontier
            .into_iter()
            .filter(|dest| !(dest.row == home_row && origin.row != home_row))
            .filter(|dest| !(piece.is_blessed && origin.row != far_row && dest.row == far_row))
            .collect()
    }

    /// Every legal move for `side` with a throw of `steps`, origin-major.
    pub fn legal_moves(&self, steps: u8, side: Side) -> Vec<Move> {
        self.board
            .cells_of(side)
            .into_iter()
            .flat_map(|from| {
                self.generate(from, steps, side)
                    .into_iter()
                    .map(move |to| Move { from, to })
            })
            .collect()
    }

    /// Origins of `side` that have at least one legal destination.
    pub fn movable_origins(&self, steps: u8, side: Side) -> Vec<Cell> {
        self.board
            .cells_of(side)
            .into_iter()
            .filter(|from| !self.generate(*from, steps, side).is_empty())
            .collect()
    }

    /// Whether `side` can move at all with `steps`.
    pub fn has_legal_move(&self, steps: u8, side: Side) -> bool {
        self.board
            .cells_of(side)
            .into_iter()
            .any(|from| !self.generate(from, steps, side).is_empty())
    }

    /// Whether `mv` would capture an enemy piece.
    pub fn is_capture(&self, mv: Move, side: Side) -> bool {
        matches!(self.board.square(mv.to).side(), Some(owner) if owner != side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::Piece;

    fn moved(side: Side) -> Piece {
        Piece { side, has_moved: true, is_blessed: false }
    }

    #[test]
    fn test_virgin_piece_needs_a_one() {
        let mut board = Board::empty(9);
        board.place(Cell::new(0, 4), Piece::fresh(Side::Blue));
        let gen = MoveGenerator::new(&board);

        let one = gen.generate(Cell::new(0, 4), 1, Side::Blue);
        assert_eq!(one, BTreeSet::from([Cell::new(0, 3)]));

        for steps in 2..=6 {
            assert!(gen.generate(Cell::new(0, 4), steps, Side::Blue).is_empty());
        }
    }

    #[test]
    fn test_wrong_side_or_empty_origin() {
        let board = Board::setup(9);
        let gen = MoveGenerator::new(&board);
        assert!(gen.generate(Cell::new(0, 4), 1, Side::Red).is_empty());
        assert!(gen.generate(Cell::new(1, 4), 1, Side::Blue).is_empty());
    }

    #[test]
    fn test_corner_virgin_leaves_home_row() {
        let board = Board::setup(9);
        let gen = MoveGenerator::new(&board);
        // (0,0) -> (1,0): leaving the home row is allowed.
        assert_eq!(
            gen.generate(Cell::new(0, 0), 1, Side::Blue),
            BTreeSet::from([Cell::new(1, 0)])
        );
    }

    #[test]
    fn test_ally_blocks_only_on_final_hop() {
        let mut board = Board::empty(9);
        board.place(Cell::new(1, 2), moved(Side::Blue));
        board.place(Cell::new(1, 3), moved(Side::Blue));
        board.place(Cell::new(1, 4), moved(Side::Blue));
        let gen = MoveGenerator::new(&board);

        // Landing on an ally is refused.
        assert!(gen.generate(Cell::new(1, 2), 1, Side::Blue).is_empty());
        // Leaping over allies is fine.
        assert_eq!(
            gen.generate(Cell::new(1, 2), 3, Side::Blue),
            BTreeSet::from([Cell::new(1, 5)])
        );
    }

    #[test]
    fn test_capture_on_final_hop() {
        let mut board = Board::empty(9);
        board.place(Cell::new(1, 2), moved(Side::Blue));
        board.place(Cell::new(1, 4), moved(Side::Red));
        let gen = MoveGenerator::new(&board);

        let dests = gen.generate(Cell::new(1, 2), 2, Side::Blue);
        assert_eq!(dests, BTreeSet::from([Cell::new(1, 4)]));
        assert!(gen.is_capture(Move { from: Cell::new(1, 2), to: Cell::new(1, 4) }, Side::Blue));

        // Passing over the enemy does not capture it.
        let dests = gen.generate(Cell::new(1, 2), 3, Side::Blue);
        assert_eq!(dests, BTreeSet::from([Cell::new(1, 5)]));
    }

    #[test]
    fn test_branch_yields_two_destinations() {
        let mut board = Board::empty(9);
        board.place(Cell::new(1, 7), moved(Side::Red));
        let gen = MoveGenerator::new(&board);

        // (1,7) -> (1,8) -> {(2,8), (0,8)}; Red's far row is 0.
        let dests = gen.generate(Cell::new(1, 7), 2, Side::Red);
        assert_eq!(dests, BTreeSet::from([Cell::new(0, 8), Cell::new(2, 8)]));
    }

    #[test]
    fn test_home_row_reentry_refused() {
        let mut board = Board::empty(9);
        board.place(Cell::new(1, 7), moved(Side::Blue));
        let gen = MoveGenerator::new(&board);

        // (0,8) is Blue's home row, so only (2,8) survives.
        let dests = gen.generate(Cell::new(1, 7), 2, Side::Blue);
        assert_eq!(dests, BTreeSet::from([Cell::new(2, 8)]));
    }

    #[test]
    fn test_moving_along_home_row_is_allowed() {
        let mut board = Board::empty(9);
        board.place(Cell::new(0, 5), moved(Side::Blue));
        let gen = MoveGenerator::new(&board);
        assert_eq!(
            gen.generate(Cell::new(0, 5), 2, Side::Blue),
            BTreeSet::from([Cell::new(0, 3)])
        );
    }

    #[test]
    fn test_blessed_piece_cannot_reenter_far_row() {
        let mut board = Board::empty(9);
        board.place(Cell::new(2, 1), Piece { side: Side::Blue, has_moved: true, is_blessed: true });
        let gen = MoveGenerator::new(&board);

        // (2,1) -> (2,0) -> {(1,0), (3,0)}; (3,0) is Blue's far row.
        let dests = gen.generate(Cell::new(2, 1), 2, Side::Blue);
        assert_eq!(dests, BTreeSet::from([Cell::new(1, 0)]));

        // An unblessed piece may take either branch.
        board.place(Cell::new(2, 1), moved(Side::Blue));
        let gen = MoveGenerator::new(&board);
        assert_eq!(gen.generate(Cell::new(2, 1), 2, Side::Blue).len(), 2);
    }

    #[test]
    fn test_blessed_piece_moves_within_far_row() {
        let mut board = Board::empty(9);
        board.place(Cell::new(3, 2), Piece { side: Side::Blue, has_moved: true, is_blessed: true });
        let gen = MoveGenerator::new(&board);
        assert_eq!(
            gen.generate(Cell::new(3, 2), 3, Side::Blue),
            BTreeSet::from([Cell::new(3, 5)])
        );
    }

    #[test]
    fn test_far_row_frozen_while_home_has_virgins() {
        let mut board = Board::empty(9);
        board.place(Cell::new(3, 2), Piece { side: Side::Blue, has_moved: true, is_blessed: true });
        board.place(Cell::new(0, 6), Piece::fresh(Side::Blue));
        let gen = MoveGenerator::new(&board);
        assert!(gen.generate(Cell::new(3, 2), 1, Side::Blue).is_empty());

        // Once the home-row piece has moved, the far-row piece is free.
        board.place(Cell::new(0, 6), moved(Side::Blue));
        let gen = MoveGenerator::new(&board);
        assert!(!gen.generate(Cell::new(3, 2), 1, Side::Blue).is_empty());
    }

    #[test]
    fn test_nine_column_virgin_roll_one_vs_two() {
        let board = Board::setup(9);
        let gen = MoveGenerator::new(&board);
        let origin = Cell::new(0, 0);

        let one = gen.generate(origin, 1, Side::Blue);
        let two = gen.generate(origin, 2, Side::Blue);
        assert_eq!(one.len(), 1);
        assert_ne!(one, two);
    }

    #[test]
    fn test_opening_moves() {
        let board = Board::setup(9);
        let gen = MoveGenerator::new(&board);

        // Only the corner piece can open: the others would land on allies.
        assert_eq!(gen.movable_origins(1, Side::Blue), vec![Cell::new(0, 0)]);
        assert_eq!(gen.movable_origins(1, Side::Red), vec![Cell::new(3, 8)]);
        assert!(!gen.has_legal_move(2, Side::Blue));
        assert_eq!(
            gen.legal_moves(1, Side::Red),
            vec![Move { from: Cell::new(3, 8), to: Cell::new(2, 8) }]
        );
    }
}
