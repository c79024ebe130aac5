//! Search tree node representation.
//!
//! Each node represents one reachable position together with the statistics
//! gathered by playouts that passed through it. Nodes live in an arena and
//! reference each other by [`NodeId`] indices; the parent link of the root is
//! the [`NodeId::NONE`] sentinel, never a real node.

use game_core::{Game, Player};

/// Index into the node arena. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel for "no parent". A real variant rather than a magic value
    /// leaking into comparisons: always test with `is_none`/`is_some`.
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the search tree.
///
/// `wins` counts playouts won by the player who moved INTO this node, i.e.
/// the opponent of `to_move`. Under that convention `wins / trials` estimates
/// how good the move leading here was, which is the quantity the parent
/// compares across siblings during selection.
pub struct Node<G: Game> {
    /// Parent node index (NONE for the root).
    pub parent: NodeId,

    /// The board state at this node, exclusively owned.
    pub state: G::State,

    /// The player who will move from this node.
    pub to_move: Player,

    /// Legal moves not yet materialized as children. Shrinks by exactly one
    /// element per expansion; empty means fully expanded or terminal.
    pub unexplored: Vec<G::Move>,

    /// Children keyed by the move that produces them. At most one child per
    /// legal move.
    pub children: Vec<(G::Move, NodeId)>,

    /// Playouts through this node won by the opponent of `to_move`.
    pub wins: u32,

    /// Playouts that passed through this node.
    pub trials: u32,
}

impl<G: Game> Node<G> {
    /// Create a root node. `unexplored` is the full legal-move set at `state`.
    pub fn new_root(state: G::State, to_move: Player, unexplored: Vec<G::Move>) -> Self {
        Self {
            parent: NodeId::NONE,
            state,
            to_move,
            unexplored,
            children: Vec::new(),
            wins: 0,
            trials: 0,
        }
    }

    /// Create a child node hanging under `parent`.
    pub fn new_child(
        parent: NodeId,
        state: G::State,
        to_move: Player,
        unexplored: Vec<G::Move>,
    ) -> Self {
        Self {
            parent,
            state,
            to_move,
            unexplored,
            children: Vec::new(),
            wins: 0,
            trials: 0,
        }
    }

    /// `wins / trials`, or 0.0 before the first visit.
    #[inline]
    pub fn win_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.wins as f64 / self.trials as f64
        }
    }

    /// UCB1 score for selection by the parent:
    /// `wins/trials + c * sqrt(ln(parent.trials) / trials)`.
    ///
    /// An unvisited child scores infinite, so every child is tried at least
    /// once before exploitation begins.
    ///
    /// Takes `ln(parent.trials)` pre-computed to avoid redundant work when
    /// comparing siblings.
    #[inline]
    pub fn ucb_score(&self, parent_trials_ln: f64, exploration: f64) -> f64 {
        if self.trials == 0 {
            return f64::INFINITY;
        }
        self.win_rate() + exploration * (parent_trials_ln / self.trials as f64).sqrt()
    }

    /// Every legal move has a child.
    #[inline]
    pub fn is_fully_expanded(&self) -> bool {
        self.unexplored.is_empty()
    }

    /// No legal moves existed when this node was created: the position is a
    /// win or a full board.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.unexplored.is_empty() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_connect4::{Board, Connect4};

    fn root_with_moves(moves: Vec<u8>) -> Node<Connect4> {
        Node::new_root(Board::new(), Player::One, moves)
    }

    #[test]
    fn node_id_sentinel() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn new_root_starts_clean() {
        let node = root_with_moves(vec![0, 1, 2]);
        assert!(node.parent.is_none());
        assert_eq!(node.wins, 0);
        assert_eq!(node.trials, 0);
        assert!(node.children.is_empty());
        assert_eq!(node.unexplored.len(), 3);
        assert!(!node.is_fully_expanded());
        assert!(!node.is_terminal());
    }

    #[test]
    fn terminal_means_no_moves_and_no_children() {
        let node = root_with_moves(vec![]);
        assert!(node.is_terminal());
        assert!(node.is_fully_expanded());
    }

    #[test]
    fn win_rate_is_zero_before_first_visit() {
        let mut node = root_with_moves(vec![0]);
        assert_eq!(node.win_rate(), 0.0);

        node.trials = 4;
        node.wins = 3;
        assert!((node.win_rate() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn unvisited_child_has_infinite_ucb() {
        let node = root_with_moves(vec![0]);
        assert_eq!(node.ucb_score(100.0_f64.ln(), 1.42), f64::INFINITY);
    }

    #[test]
    fn ucb_matches_formula() {
        let mut node = root_with_moves(vec![0]);
        node.trials = 10;
        node.wins = 5;

        let parent_ln = 100.0_f64.ln();
        let expected = 0.5 + 1.42 * (parent_ln / 10.0).sqrt();
        assert!((node.ucb_score(parent_ln, 1.42) - expected).abs() < 1e-12);
    }
}
