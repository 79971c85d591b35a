//! Track Topology
//!
//! Directed adjacency of the 4×N track. Rows 0 and 2 run toward column 0,
//! rows 1 and 3 run toward the last column. At the ends:
//!
//! ```text
//! (0,0)    -> (1,0)
//! (1,last) -> (2,last) | (0,last)     branch
//! (2,0)    -> (1,0)    | (3,0)        branch
//! (3,last) -> (2,last)
//! ```
//!
//! The result is one circulating path with two branch points.

use crate::game::board::{Cell, ROWS};

/// Successor lists for every cell of a board width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardTopology {
    width: usize,
    /// Indexed by `Cell::index(width)`.
    next: Vec<Vec<Cell>>,
}

impl BoardTopology {
    /// Build the adjacency for `width` columns.
    pub fn new(width: usize) -> Self {
        let mut next = Vec::with_capacity(ROWS as usize * width);
        for row in 0..ROWS {
            for col in 0..width as u8 {
                next.push(successors_of(Cell::new(row, col), width));
            }
        }
        Self { width, next }
    }

    /// Board width this topology was built for.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Cells reachable in one hop from `cell`. Empty when off the board.
    #[inline]
    pub fn successors(&self, cell: Cell) -> &[Cell] {
        if cell.row >= ROWS || cell.col as usize >= self.width {
            return &[];
        }
        &self.next[cell.index(self.width)]
    }

    /// Iterate over every edge `(from, to)`.
    pub fn edges(&self) -> impl Iterator<Item = (Cell, Cell)> + '_ {
        let width = self.width;
        self.next.iter().enumerate().flat_map(move |(i, succ)| {
            let from = Cell::new((i / width) as u8, (i % width) as u8);
            succ.iter().map(move |to| (from, *to))
        })
    }
}

/// Row direction: -1 toward column 0, +1 toward the last column.
#[inline]
fn direction(row: u8) -> i32 {
    if row % 2 == 0 { -1 } else { 1 }
}

fn successors_of(cell: Cell, width: usize) -> Vec<Cell> {
    if width == 0 {
        return Vec::new();
    }
    let last = (width - 1) as u8;
    let next_col = cell.col as i32 + direction(cell.row);

    if (0..width as i32).contains(&next_col) {
        return vec![Cell::new(cell.row, next_col as u8)];
    }

    match (cell.row, cell.col) {
        (0, 0) => vec![Cell::new(1, 0)],
        (1, c) if c == last => vec![Cell::new(2, last), Cell::new(0, last)],
        (2, 0) => vec![Cell::new(1, 0), Cell::new(3, 0)],
        (3, c) if c == last => vec![Cell::new(2, last)],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interior_cells_have_one_successor() {
        let topo = BoardTopology::new(9);
        assert_eq!(topo.successors(Cell::new(0, 4)), &[Cell::new(0, 3)]);
        assert_eq!(topo.successors(Cell::new(1, 4)), &[Cell::new(1, 5)]);
        assert_eq!(topo.successors(Cell::new(2, 4)), &[Cell::new(2, 3)]);
        assert_eq!(topo.successors(Cell::new(3, 4)), &[Cell::new(3, 5)]);
    }

    #[test]
    fn test_track_ends() {
        let topo = BoardTopology::new(9);
        assert_eq!(topo.successors(Cell::new(0, 0)), &[Cell::new(1, 0)]);
        assert_eq!(topo.successors(Cell::new(1, 8)), &[Cell::new(2, 8), Cell::new(0, 8)]);
        assert_eq!(topo.successors(Cell::new(2, 0)), &[Cell::new(1, 0), Cell::new(3, 0)]);
        assert_eq!(topo.successors(Cell::new(3, 8)), &[Cell::new(2, 8)]);
    }

    #[test]
    fn test_exactly_two_branch_points() {
        let topo = BoardTopology::new(7);
        let branches = (0..4u8)
            .flat_map(|r| (0..7u8).map(move |c| Cell::new(r, c)))
            .filter(|c| topo.successors(*c).len() > 1)
            .count();
        assert_eq!(branches, 2);
    }

    #[test]
    fn test_every_cell_has_a_successor() {
        for width in [5usize, 9, 15] {
            let topo = BoardTopology::new(width);
            for r in 0..4u8 {
                for c in 0..width as u8 {
                    assert!(!topo.successors(Cell::new(r, c)).is_empty());
                }
            }
            // 4N cells, plus one extra edge per branch point.
            assert_eq!(topo.edges().count(), 4 * width + 2);
        }
    }

    #[test]
    fn test_off_board_has_no_successors() {
        let topo = BoardTopology::new(5);
        assert!(topo.successors(Cell::new(4, 0)).is_empty());
        assert!(topo.successors(Cell::new(0, 5)).is_empty());
    }
}
