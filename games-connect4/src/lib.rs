//! Connect 4 board primitives.
//!
//! Two players drop discs into a 7-column, 6-row grid; the first to line up
//! four discs horizontally, vertically, or diagonally wins.
//!
//! # Board layout
//!
//! The board is stored in row-major order, with row 0 at the bottom:
//! ```text
//! Row 5: [35][36][37][38][39][40][41]  <- Top
//! Row 4: [28][29][30][31][32][33][34]
//! Row 3: [21][22][23][24][25][26][27]
//! Row 2: [14][15][16][17][18][19][20]
//! Row 1: [ 7][ 8][ 9][10][11][12][13]
//! Row 0: [ 0][ 1][ 2][ 3][ 4][ 5][ 6]  <- Bottom
//!         Col 0  1  2  3  4  5  6
//! ```
//!
//! The position holds piece placement only. Whose turn it is travels
//! alongside the board as a [`Player`] argument, never inside it, so the same
//! `Board` value can be shared read-only between contexts that disagree on
//! turn order (the search tree relies on this).

use game_core::{Game, Player};

/// Board dimensions.
pub const COLS: usize = 7;
pub const ROWS: usize = 6;
pub const BOARD_SIZE: usize = COLS * ROWS; // 42
pub const CONNECT: usize = 4;

/// A move: the column a disc is dropped into (0-6).
pub type Column = u8;

/// Connect-4 position: piece placement for both players.
///
/// Immutable by convention. [`Board::drop_piece`] returns a new board and
/// leaves the receiver untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Cell contents in row-major order with row 0 at the bottom.
    cells: [Option<Player>; BOARD_SIZE],
    /// Number of pieces in each column (0-6).
    heights: [u8; COLS],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self {
            cells: [None; BOARD_SIZE],
            heights: [0; COLS],
        }
    }

    /// Convert column and row to board index.
    #[inline]
    fn pos(col: usize, row: usize) -> usize {
        row * COLS + col
    }

    /// Cell contents at (col, row), row 0 at the bottom.
    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Option<Player> {
        self.cells[Self::pos(col, row)]
    }

    /// Number of pieces stacked in `col`.
    #[inline]
    pub fn height(&self, col: usize) -> u8 {
        self.heights[col]
    }

    /// Total pieces placed so far (0-42).
    pub fn pieces_placed(&self) -> u32 {
        self.heights.iter().map(|&h| h as u32).sum()
    }

    /// Is every column full?
    pub fn is_full(&self) -> bool {
        self.heights.iter().all(|&h| h >= ROWS as u8)
    }

    /// Columns that still have room, in ascending order. This ignores
    /// whether either player has already won; terminal filtering happens in
    /// the [`Game::legal_moves`] impl.
    pub fn open_columns(&self) -> Vec<Column> {
        (0..COLS as Column)
            .filter(|&col| self.heights[col as usize] < ROWS as u8)
            .collect()
    }

    /// Drop a disc for `player` into `column`, returning the new board.
    ///
    /// A drop into a full or out-of-range column returns the board unchanged;
    /// callers are expected to pick from [`Board::open_columns`].
    pub fn drop_piece(&self, column: Column, player: Player) -> Board {
        let col = column as usize;
        if col >= COLS || self.heights[col] >= ROWS as u8 {
            return self.clone();
        }

        let mut next = self.clone();
        let row = self.heights[col] as usize;
        next.cells[Self::pos(col, row)] = Some(player);
        next.heights[col] += 1;
        next
    }

    /// Does `player` have four in a row anywhere on the board?
    pub fn connects_four(&self, player: Player) -> bool {
        // Line directions: horizontal, vertical, diagonal /, diagonal \
        const DIRS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

        for col in 0..COLS {
            for row in 0..ROWS {
                if self.get(col, row) != Some(player) {
                    continue;
                }
                for (dc, dr) in DIRS {
                    let mut count = 1;
                    let (mut c, mut r) = (col as i32 + dc, row as i32 + dr);
                    while c >= 0
                        && c < COLS as i32
                        && r >= 0
                        && r < ROWS as i32
                        && self.get(c as usize, r as usize) == Some(player)
                    {
                        count += 1;
                        if count >= CONNECT {
                            return true;
                        }
                        c += dc;
                        r += dr;
                    }
                }
            }
        }
        false
    }

    /// The winner, if either player has connected four.
    pub fn winner(&self) -> Option<Player> {
        if self.connects_four(Player::One) {
            Some(Player::One)
        } else if self.connects_four(Player::Two) {
            Some(Player::Two)
        } else {
            None
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Connect-4 oracle: the [`Game`] capability interface over [`Board`].
#[derive(Debug, Default)]
pub struct Connect4;

impl Connect4 {
    pub fn new() -> Self {
        Self
    }
}

impl Game for Connect4 {
    type State = Board;
    type Move = Column;

    fn legal_moves(&self, state: &Self::State) -> Vec<Column> {
        if state.winner().is_some() {
            return Vec::new();
        }
        state.open_columns()
    }

    fn apply(&self, state: &Self::State, mv: Column, player: Player) -> Board {
        state.drop_piece(mv, player)
    }

    fn is_win(&self, state: &Self::State, player: Player) -> bool {
        state.connects_four(player)
    }

    fn is_full(&self, state: &Self::State) -> bool {
        state.is_full()
    }
}
