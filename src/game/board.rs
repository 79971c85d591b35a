//! Board Representation
//!
//! A fixed four-row track of `width` columns. Cells are addressed either by
//! `(row, col)` or by the linear wire index `row * width + col`.
//!
//! Side Blue starts on row 0 and races toward row 3; side Red starts on row 3
//! and races toward row 0.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::game::topology::BoardTopology;

/// Number of rows on every board.
pub const ROWS: u8 = 4;

/// Smallest accepted board width.
pub const MIN_WIDTH: usize = 5;

/// Largest accepted board width.
pub const MAX_WIDTH: usize = 15;

/// Whether `width` is a board width the server accepts (odd, 5..=15).
pub fn is_valid_width(width: usize) -> bool {
    (MIN_WIDTH..=MAX_WIDTH).contains(&width) && width % 2 == 1
}

// =============================================================================
// SIDE
// =============================================================================

/// One of the two armies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Session creator; home row 0.
    Blue,
    /// Joiner; home row 3.
    Red,
}

impl Side {
    /// The other side.
    #[inline]
    pub fn opponent(self) -> Side {
        match self {
            Side::Blue => Side::Red,
            Side::Red => Side::Blue,
        }
    }

    /// Row the side's pieces start on.
    #[inline]
    pub fn home_row(self) -> u8 {
        match self {
            Side::Blue => 0,
            Side::Red => ROWS - 1,
        }
    }

    /// The opponent's home row, which this side races toward.
    #[inline]
    pub fn far_row(self) -> u8 {
        self.opponent().home_row()
    }

    /// How many rows a piece on `row` has advanced from this side's home row
    /// (0 on the home row, 3 on the far row).
    #[inline]
    pub fn progress(self, row: u8) -> u8 {
        match self {
            Side::Blue => row,
            Side::Red => ROWS - 1 - row,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Blue => f.write_str("Blue"),
            Side::Red => f.write_str("Red"),
        }
    }
}

// =============================================================================
// CELL
// =============================================================================

/// A board coordinate. Ordering is row-major.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Row, 0..4.
    pub row: u8,
    /// Column, 0..width.
    pub col: u8,
}

impl Cell {
    /// Create a cell.
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Linear wire index for a board of `width` columns.
    #[inline]
    pub fn index(self, width: usize) -> usize {
        self.row as usize * width + self.col as usize
    }

    /// Inverse of [`Cell::index`]; `None` when off the board.
    #[inline]
    pub fn from_index(index: usize, width: usize) -> Option<Cell> {
        if width == 0 || index >= ROWS as usize * width {
            return None;
        }
        Some(Cell::new((index / width) as u8, (index % width) as u8))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

// =============================================================================
// PIECE / SQUARE
// =============================================================================

/// A single piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    /// Owner.
    pub side: Side,
    /// False until the piece's first move ("virgin" piece).
    pub has_moved: bool,
    /// Set once the piece has landed on the opponent's far row.
    pub is_blessed: bool,
}

impl Piece {
    /// A fresh, never-moved piece.
    pub const fn fresh(side: Side) -> Self {
        Self { side, has_moved: false, is_blessed: false }
    }
}

/// Contents of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Square {
    /// Nothing here.
    #[default]
    Empty,
    /// A piece sits here.
    Occupied(Piece),
}

impl Square {
    /// The piece, if any.
    #[inline]
    pub fn piece(&self) -> Option<&Piece> {
        match self {
            Square::Empty => None,
            Square::Occupied(p) => Some(p),
        }
    }

    /// Side of the occupying piece, if any.
    #[inline]
    pub fn side(&self) -> Option<Side> {
        self.piece().map(|p| p.side)
    }

    /// True when nothing occupies the cell.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Square::Empty)
    }
}

// =============================================================================
// MOVE
// =============================================================================

/// A move from one cell to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Move {
    /// Origin cell.
    pub from: Cell,
    /// Destination cell.
    pub to: Cell,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// What happened when a move was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The piece that now stands on the destination.
    pub piece: Piece,
    /// The opposing piece removed from the destination, if any.
    pub captured: Option<Piece>,
    /// True when this move blessed the piece for the first time.
    pub newly_blessed: bool,
}

// =============================================================================
// BOARD
// =============================================================================

/// Board contents plus the track topology for its width.
///
/// The topology is derived from the width and shared behind an `Arc`, so
/// cloning a board for search only copies the squares.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "BoardRecord", into = "BoardRecord")]
pub struct Board {
    width: usize,
    squares: Vec<Square>,
    topology: Arc<BoardTopology>,
}

/// Serialized shape of a [`Board`]; the topology is rebuilt on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct BoardRecord {
    width: usize,
    squares: Vec<Square>,
}

impl TryFrom<BoardRecord> for Board {
    type Error = String;

    fn try_from(record: BoardRecord) -> Result<Self, Self::Error> {
        if record.width == 0 || record.width > u8::MAX as usize {
            return Err(format!("invalid board width {}", record.width));
        }
        if record.squares.len() != ROWS as usize * record.width {
            return Err(format!(
                "board of width {} needs {} squares, found {}",
                record.width,
                ROWS as usize * record.width,
                record.squares.len()
            ));
        }
        Ok(Self {
            width: record.width,
            squares: record.squares,
            topology: Arc::new(BoardTopology::new(record.width)),
        })
    }
}

impl From<Board> for BoardRecord {
    fn from(board: Board) -> Self {
        Self { width: board.width, squares: board.squares }
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.squares == other.squares
    }
}

impl Eq for Board {}

impl Board {
    /// An empty board of `width` columns.
    pub fn empty(width: usize) -> Self {
        Self {
            width,
            squares: vec![Square::Empty; ROWS as usize * width],
            topology: Arc::new(BoardTopology::new(width)),
        }
    }

    /// Starting position: each side fills its home row with fresh pieces.
    pub fn setup(width: usize) -> Self {
        let mut board = Self::empty(width);
        for col in 0..width as u8 {
            for side in [Side::Blue, Side::Red] {
                board.place(Cell::new(side.home_row(), col), Piece::fresh(side));
            }
        }
        board
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Track adjacency for this width.
    #[inline]
    pub fn topology(&self) -> &BoardTopology {
        &self.topology
    }

    /// Whether `cell` lies on this board.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < ROWS && (cell.col as usize) < self.width
    }

    /// Contents of `cell` (`Empty` when off the board).
    #[inline]
    pub fn square(&self, cell: Cell) -> Square {
        if !self.contains(cell) {
            return Square::Empty;
        }
        self.squares[cell.index(self.width)]
    }

    /// Piece on `cell`, if any.
    #[inline]
    pub fn piece_at(&self, cell: Cell) -> Option<Piece> {
        self.square(cell).piece().copied()
    }

    /// Put a piece on `cell`, replacing whatever was there.
    ///
    /// Intended for setup and tests; play goes through [`Board::apply_move`].
    pub fn place(&mut self, cell: Cell, piece: Piece) {
        if self.contains(cell) {
            let idx = cell.index(self.width);
            self.squares[idx] = Square::Occupied(piece);
        }
    }

    /// Clear `cell`.
    pub fn clear(&mut self, cell: Cell) {
        if self.contains(cell) {
            let idx = cell.index(self.width);
            self.squares[idx] = Square::Empty;
        }
    }

    /// All squares in wire-index order.
    pub fn squares(&self) -> &[Square] {
        &self.squares
    }

    /// Iterate over occupied cells in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Cell, Piece)> + '_ {
        let width = self.width;
        self.squares.iter().enumerate().filter_map(move |(i, sq)| {
            sq.piece().map(|p| (Cell::new((i / width) as u8, (i % width) as u8), *p))
        })
    }

    /// Cells holding pieces of `side`.
    pub fn cells_of(&self, side: Side) -> Vec<Cell> {
        self.pieces()
            .filter(|(_, p)| p.side == side)
            .map(|(c, _)| c)
            .collect()
    }

    /// Number of pieces `side` still has.
    pub fn count(&self, side: Side) -> usize {
        self.pieces().filter(|(_, p)| p.side == side).count()
    }

    /// Whether `side` still has a never-moved piece on its home row.
    pub fn has_unmoved_on_home_row(&self, side: Side) -> bool {
        let row = side.home_row();
        (0..self.width as u8).any(|col| {
            matches!(
                self.piece_at(Cell::new(row, col)),
                Some(p) if p.side == side && !p.has_moved
            )
        })
    }

    /// Move the piece on `mv.from` to `mv.to`, capturing anything there.
    ///
    /// Does not check legality; callers validate through the move generator
    /// first. Returns `None` when the origin is empty.
    pub fn apply_move(&mut self, mv: Move) -> Option<MoveOutcome> {
        let mut piece = self.piece_at(mv.from)?;
        let captured = self.piece_at(mv.to);

        self.clear(mv.from);
        piece.has_moved = true;
        let newly_blessed = mv.to.row == piece.side.far_row() && !piece.is_blessed;
        if mv.to.row == piece.side.far_row() {
            piece.is_blessed = true;
        }
        self.place(mv.to, piece);

        Some(MoveOutcome { piece, captured, newly_blessed })
    }
}
