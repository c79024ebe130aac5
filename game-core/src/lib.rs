//! Core traits and types for two-player, perfect-information board games.
//!
//! This crate defines the capability interface ("board oracle") the search
//! engine consumes:
//! - [`Player`]: the two sides, with an `opponent()` involution
//! - [`Game`]: legal-move enumeration, move application, win and draw checks
//!
//! Implementations must be pure and deterministic: `apply` returns a new,
//! independently owned position and never mutates its input. The search tree
//! gives every node its own fully materialized position, so any sharing or
//! in-place mutation here would corrupt sibling branches.

use std::fmt::Debug;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// The other player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

/// Capability interface for a two-player, zero-sum board game.
///
/// The whose-turn context is carried alongside the position, never inside it:
/// every operation that depends on it takes a [`Player`] argument.
pub trait Game {
    /// A full board state. `Clone` because every tree node and every rollout
    /// owns an independent copy; `PartialEq` so the turn driver can match an
    /// externally observed board against existing children when re-rooting.
    type State: Clone + PartialEq + Debug;

    /// A move identifier (for connect-4, a column).
    type Move: Copy + Eq + Debug;

    /// All moves playable from `state`. Empty for terminal positions, i.e.
    /// when a player has already won or the board is full.
    fn legal_moves(&self, state: &Self::State) -> Vec<Self::Move>;

    /// Apply `mv` for `player`, returning a new position. The input is left
    /// untouched.
    fn apply(&self, state: &Self::State, mv: Self::Move, player: Player) -> Self::State;

    /// Has `player` achieved the winning connection on `state`?
    fn is_win(&self, state: &Self::State, player: Player) -> bool;

    /// Is the board completely full? Combined with "no win" this is the draw
    /// condition.
    fn is_full(&self, state: &Self::State) -> bool;
}
