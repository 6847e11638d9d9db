use rand::Rng;
use std::fmt;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// All four directions in the order used for enumeration and tie-breaks.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    /// Position of this move within [`Move::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Move::Up => 0,
            Move::Down => 1,
            Move::Left => 2,
            Move::Right => 3,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        };
        f.write_str(name)
    }
}

/// Actual tile value: 0 for empty, otherwise 2, 4, 8, ...
pub type Tile = u64;

/// Sum of tile values. Wider than [`Tile`] so a board full of maximal tiles still fits.
pub type Score = u128;

/// Largest tile a board may hold. Two of these never merge.
pub const MAX_TILE: Tile = 1 << 62;

/// Cell coordinates, 0-indexed, row 0 at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub col: usize,
    pub row: usize,
}

impl Pos {
    #[inline]
    pub fn new(col: usize, row: usize) -> Self { Pos { col, row } }

    #[inline]
    pub fn manhattan(self, other: Pos) -> usize {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("board has no rows")]
    Empty,
    #[error("row {row} has {len} cells, expected {expected}")]
    Ragged { row: usize, len: usize, expected: usize },
    #[error("invalid tile {value} at (col {col}, row {row}): tiles must be 0 or a power of two >= 2")]
    InvalidTile { col: usize, row: usize, value: Tile },
    #[error("tile {value} at (col {col}, row {row}) exceeds the maximum tile 2^62")]
    TileTooLarge { col: usize, row: usize, value: Tile },
}

/// Square N×N 2048 board stored row-major.
///
/// Every transformation returns a new `Board`; nothing mutates in place.
/// Construction validates the grid, so any `Board` value is square and holds
/// only empty cells or powers of two up to [`MAX_TILE`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Board {
    size: usize,
    cells: Vec<Tile>,
}

#[inline]
pub fn is_valid_tile(value: Tile) -> bool {
    value == 0 || (value >= 2 && value <= MAX_TILE && value.is_power_of_two())
}

/// Which end of a line tiles slide toward.
#[derive(Clone, Copy)]
enum Edge {
    Leading,
    Trailing,
}

impl Board {
    /// Create an empty `size`×`size` board.
    ///
    /// Panics if `size` is zero.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "board size must be at least 1");
        Board { size, cells: vec![0; size * size] }
    }

    /// Build a board from rows of actual tile values.
    ///
    /// ```
    /// use expectimax_2048::engine::{Board, BoardError};
    /// let b = Board::from_rows(&[[2, 0], [0, 4]]).unwrap();
    /// assert_eq!(b.size(), 2);
    /// assert!(matches!(Board::from_rows(&[[3, 0], [0, 0]]), Err(BoardError::InvalidTile { .. })));
    /// ```
    pub fn from_rows<R: AsRef<[Tile]>>(rows: &[R]) -> Result<Self, BoardError> {
        let size = rows.len();
        if size == 0 {
            return Err(BoardError::Empty);
        }
        let mut cells = Vec::with_capacity(size * size);
        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            if line.len() != size {
                return Err(BoardError::Ragged { row, len: line.len(), expected: size });
            }
            for (col, &value) in line.iter().enumerate() {
                if !is_valid_tile(value) {
                    return Err(if value.is_power_of_two() && value > MAX_TILE {
                        BoardError::TileTooLarge { col, row, value }
                    } else {
                        BoardError::InvalidTile { col, row, value }
                    });
                }
            }
            cells.extend_from_slice(line);
        }
        Ok(Board { size, cells })
    }

    /// Start a game: an empty board with two `2` tiles on distinct random cells.
    pub fn initial<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let mut board = Board::new(size);
        let total = size * size;
        if total < 2 {
            return board;
        }
        for idx in rand::seq::index::sample(rng, total, 2).iter() {
            board.cells[idx] = 2;
        }
        board
    }

    #[inline]
    pub fn size(&self) -> usize { self.size }

    /// Row-major view of every cell.
    #[inline]
    pub fn cells(&self) -> &[Tile] { &self.cells }

    #[inline]
    pub fn row(&self, row: usize) -> &[Tile] { &self.cells[row * self.size..(row + 1) * self.size] }

    pub fn rows(&self) -> Vec<Vec<Tile>> { self.cells.chunks_exact(self.size).map(<[Tile]>::to_vec).collect() }

    #[inline]
    pub fn get(&self, pos: Pos) -> Tile { self.cells[self.index(pos)] }

    /// Iterate `(position, value)` over every cell in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = (Pos, Tile)> + '_ {
        let size = self.size;
        self.cells.iter().enumerate().map(move |(idx, &v)| (Pos::new(idx % size, idx / size), v))
    }

    /// Return a copy with `value` written at `pos`.
    ///
    /// Panics on an out-of-range position or a value that is not 0 or a power of two.
    pub fn with_tile(&self, pos: Pos, value: Tile) -> Self {
        assert!(is_valid_tile(value), "invalid tile value {value}");
        let idx = self.index(pos);
        let mut next = self.clone();
        next.cells[idx] = value;
        next
    }

    /// Swap rows and columns.
    pub fn transpose(&self) -> Self {
        let n = self.size;
        let mut cells = vec![0; n * n];
        for row in 0..n {
            for col in 0..n {
                cells[col * n + row] = self.cells[row * n + col];
            }
        }
        Board { size: n, cells }
    }

    /// Return the board resulting from sliding/merging tiles in `dir` (no random insert).
    ///
    /// ```
    /// use expectimax_2048::engine::{Board, Move};
    /// let b = Board::from_rows(&[[2, 2, 2, 2], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]).unwrap();
    /// assert_eq!(b.shift(Move::Left).row(0), &[4, 4, 0, 0]);
    /// ```
    pub fn shift(&self, dir: Move) -> Self {
        match dir {
            Move::Left => self.shift_rows(Edge::Leading),
            Move::Right => self.shift_rows(Edge::Trailing),
            Move::Up => self.transpose().shift_rows(Edge::Leading).transpose(),
            Move::Down => self.transpose().shift_rows(Edge::Trailing).transpose(),
        }
    }

    /// True iff `dir` changes at least one cell.
    #[inline]
    pub fn is_legal(&self, dir: Move) -> bool { self.shift(dir) != *self }

    /// Directions that change the board, in [`Move::ALL`] order.
    pub fn legal_moves(&self) -> Vec<Move> { Move::ALL.into_iter().filter(|&dir| self.is_legal(dir)).collect() }

    /// True if no move in any direction changes the board.
    ///
    /// ```
    /// use expectimax_2048::engine::Board;
    /// // Nothing to slide on an empty board.
    /// assert!(Board::new(4).is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool { Move::ALL.into_iter().all(|dir| !self.is_legal(dir)) }

    /// Positions of all empty cells in row-major order.
    pub fn empty_cells(&self) -> Vec<Pos> { self.tiles().filter(|&(_, v)| v == 0).map(|(pos, _)| pos).collect() }

    #[inline]
    pub fn count_empty(&self) -> usize { self.cells.iter().filter(|&&v| v == 0).count() }

    /// Sum of all tile values.
    #[inline]
    pub fn score(&self) -> Score { self.cells.iter().map(|&v| Score::from(v)).sum() }

    /// Highest tile value on the board (0 when empty).
    #[inline]
    pub fn highest_tile(&self) -> Tile { self.cells.iter().copied().max().unwrap_or(0) }

    /// Insert a 2 (90%) or 4 (10%) tile into a uniformly chosen empty cell.
    ///
    /// A full board is returned unchanged.
    ///
    /// ```
    /// use expectimax_2048::engine::Board;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let b = Board::new(4).with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    pub fn with_random_tile<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return self.clone();
        }
        let pos = empty[rng.gen_range(0..empty.len())];
        self.with_tile(pos, generate_random_tile(rng))
    }

    /// Perform a move then insert a random tile if the move changed the board.
    pub fn make_move<R: Rng + ?Sized>(&self, dir: Move, rng: &mut R) -> Self {
        let moved = self.shift(dir);
        if moved != *self { moved.with_random_tile(rng) } else { moved }
    }

    #[inline]
    fn index(&self, pos: Pos) -> usize {
        assert!(pos.col < self.size && pos.row < self.size, "position {:?} outside {}x{} board", pos, self.size, self.size);
        pos.row * self.size + pos.col
    }

    fn shift_rows(&self, edge: Edge) -> Self {
        let n = self.size;
        let mut cells = vec![0; n * n];
        for (src, dst) in self.cells.chunks_exact(n).zip(cells.chunks_exact_mut(n)) {
            match edge {
                Edge::Leading => slide_left(src, dst),
                Edge::Trailing => slide_right(src, dst),
            }
        }
        Board { size: n, cells }
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:?})", self.rows())
    }
}

impl TryFrom<Vec<Vec<Tile>>> for Board {
    type Error = BoardError;
    fn try_from(rows: Vec<Vec<Tile>>) -> Result<Self, Self::Error> { Board::from_rows(&rows) }
}

/// Slide/merge tiles in the given direction. No randomness.
#[inline]
pub fn apply(board: &Board, dir: Move) -> Board { board.shift(dir) }


fn generate_random_tile<R: Rng + ?Sized>(rng: &mut R) -> Tile { if rng.gen_range(0..10) < 9 { 2 } else { 4 } }

/// Compact toward index 0, merging each equal adjacent pair once, scanning from the start.
///
/// Pairs of [`MAX_TILE`] stay apart, so every result is still a valid tile.
fn slide_left(line: &[Tile], out: &mut [Tile]) {
    let mut write = 0;
    let mut pending: Tile = 0;
    for &tile in line.iter().filter(|&&t| t != 0) {
        if pending == 0 {
            pending = tile;
        } else if pending == tile && tile < MAX_TILE {
            out[write] = tile * 2;
            write += 1;
            pending = 0;
        } else {
            out[write] = pending;
            write += 1;
            pending = tile;
        }
    }
    if pending != 0 {
        out[write] = pending;
        write += 1;
    }
    out[write..].fill(0);
}

fn slide_right(line: &[Tile], out: &mut [Tile]) {
    let rev: Vec<Tile> = line.iter().rev().copied().collect();
    let mut shifted = vec![0; line.len()];
    slide_left(&rev, &mut shifted);
    for (dst, src) in out.iter_mut().zip(shifted.into_iter().rev()) {
        *dst = src;
    }
}
