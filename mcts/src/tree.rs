//! Search tree with arena allocation.
//!
//! Nodes are stored in a contiguous `Vec` and referenced by [`NodeId`]
//! indices, so parent back-references stay valid without shared ownership or
//! reference cycles. The tree owns the four core operations: selection,
//! expansion, backpropagation, and re-rooting; playout lives in
//! [`crate::rollout`] because it never touches the tree.

use std::cmp::Ordering;

use game_core::{Game, Player};
use rand::Rng;
use rand_chacha::ChaCha20Rng;

use crate::node::{Node, NodeId};
use crate::rollout::PlayoutOutcome;
use crate::search::SearchError;

/// MCTS tree with arena-based node storage.
pub struct SearchTree<G: Game> {
    /// Arena storing all nodes. The root is index 0 after construction and
    /// after every re-root.
    nodes: Vec<Node<G>>,
    root: NodeId,
}

impl<G: Game> SearchTree<G> {
    /// Create a tree rooted at `state` with `to_move` to act.
    pub fn new(oracle: &G, state: G::State, to_move: Player) -> Self {
        let unexplored = oracle.legal_moves(&state);
        Self {
            nodes: vec![Node::new_root(state, to_move, unexplored)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<G> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<G> {
        &mut self.nodes[id.index()]
    }

    /// Total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The arena slice, for read access.
    #[inline]
    pub fn arena(&self) -> &[Node<G>] {
        &self.nodes
    }

    fn allocate(&mut self, node: Node<G>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Walk from the root to the first node that still has unexplored moves,
    /// or to a terminal node. Every intermediate step descends to the child
    /// maximizing UCB1.
    pub fn select(&self, exploration: f64, rng: &mut ChaCha20Rng) -> NodeId {
        let mut current = self.root;
        loop {
            let node = self.get(current);
            // Stop at expandable nodes and at terminal ones (no moves at all).
            if !node.unexplored.is_empty() || node.children.is_empty() {
                return current;
            }
            current = self.select_child(current, exploration, rng);
        }
    }

    /// Pick the child of `id` with the highest UCB1 score. Numeric ties are
    /// broken uniformly at random; a never-visited parent yields a uniformly
    /// random child because UCB is undefined there. Callers guarantee `id`
    /// has at least one child.
    pub fn select_child(&self, id: NodeId, exploration: f64, rng: &mut ChaCha20Rng) -> NodeId {
        let node = self.get(id);
        if node.trials == 0 {
            let (_, child) = node.children[rng.gen_range(0..node.children.len())];
            return child;
        }

        let parent_ln = (node.trials as f64).ln();
        let mut best_score = f64::NEG_INFINITY;
        let mut best: Vec<NodeId> = Vec::new();
        for &(_, child_id) in &node.children {
            let score = self.get(child_id).ucb_score(parent_ln, exploration);
            match score.partial_cmp(&best_score).unwrap_or(Ordering::Equal) {
                Ordering::Greater => {
                    best_score = score;
                    best.clear();
                    best.push(child_id);
                }
                Ordering::Equal => best.push(child_id),
                Ordering::Less => {}
            }
        }
        best[rng.gen_range(0..best.len())]
    }

    /// Materialize exactly one new child of `id` from a uniformly random
    /// unexplored move. Statistics are untouched.
    ///
    /// Calling this on a node with nothing left to expand is an engine bug
    /// and fails loudly; selection routes terminal and fully expanded nodes
    /// away from expansion.
    pub fn expand(
        &mut self,
        id: NodeId,
        oracle: &G,
        rng: &mut ChaCha20Rng,
    ) -> Result<NodeId, SearchError> {
        if self.get(id).unexplored.is_empty() {
            return Err(SearchError::InvalidExpansion(id));
        }

        let pick = rng.gen_range(0..self.get(id).unexplored.len());
        let mv = self.get_mut(id).unexplored.swap_remove(pick);
        let mover = self.get(id).to_move;

        let child_state = oracle.apply(&self.get(id).state, mv, mover);
        let unexplored = oracle.legal_moves(&child_state);
        let child = Node::new_child(id, child_state, mover.opponent(), unexplored);

        let child_id = self.allocate(child);
        self.get_mut(id).children.push((mv, child_id));
        Ok(child_id)
    }

    /// Propagate one playout outcome from `leaf` up to the root.
    ///
    /// Every node on the path gets `trials += 1`; `wins` is incremented only
    /// where the winner is the opponent of that node's `to_move` (the player
    /// who moved into it). Draws increment `wins` nowhere. Iterative walk:
    /// no dependence on call-stack depth.
    pub fn backpropagate(&mut self, leaf: NodeId, outcome: PlayoutOutcome) {
        let mut current = leaf;
        while current.is_some() {
            let node = self.get_mut(current);
            node.trials += 1;
            if let PlayoutOutcome::Win(winner) = outcome {
                if winner == node.to_move.opponent() {
                    node.wins += 1;
                }
            }
            current = node.parent;
        }
    }

    /// The root child with the highest raw win rate: exploitation only, no
    /// exploration bonus, used at decision time.
    pub fn best_move(&self) -> Option<(G::Move, NodeId)> {
        let root = self.get(self.root);
        root.children
            .iter()
            .max_by(|(_, a), (_, b)| {
                self.get(*a)
                    .win_rate()
                    .partial_cmp(&self.get(*b).win_rate())
                    .unwrap_or(Ordering::Equal)
            })
            .map(|&(mv, id)| (mv, id))
    }

    /// Re-root at the child of the current root whose position equals
    /// `observed`, or report [`SearchError::TreeDesync`] when no child
    /// matches (the caller passed an inconsistent board).
    pub fn reroot_matching(&mut self, observed: &G::State) -> Result<(), SearchError> {
        let root = self.get(self.root);
        let matched = root
            .children
            .iter()
            .find(|&&(_, id)| self.get(id).state == *observed)
            .map(|&(_, id)| id);

        match matched {
            Some(id) => {
                self.reroot_to(id);
                Ok(())
            }
            None => Err(SearchError::TreeDesync),
        }
    }

    /// Make `new_root` the root, discarding every node outside its subtree.
    /// The kept nodes' statistics are unchanged; only their arena indices
    /// move. This reclaims the memory of sibling subtrees between turns.
    pub fn reroot_to(&mut self, new_root: NodeId) {
        let mut old: Vec<Option<Node<G>>> =
            std::mem::take(&mut self.nodes).into_iter().map(Some).collect();

        // Breadth-first numbering of the kept subtree.
        let mut order = vec![new_root];
        let mut remap = vec![NodeId::NONE; old.len()];
        remap[new_root.index()] = NodeId(0);
        let mut i = 0;
        while i < order.len() {
            let id = order[i];
            i += 1;
            if let Some(node) = old[id.index()].as_ref() {
                for &(_, child) in &node.children {
                    remap[child.index()] = NodeId(order.len() as u32);
                    order.push(child);
                }
            }
        }

        let mut nodes = Vec::with_capacity(order.len());
        for &id in &order {
            let mut node = match old[id.index()].take() {
                Some(node) => node,
                None => unreachable!("node visited twice during re-root"),
            };
            node.parent = if id == new_root {
                NodeId::NONE
            } else {
                remap[node.parent.index()]
            };
            for (_, child) in &mut node.children {
                *child = remap[child.index()];
            }
            nodes.push(node);
        }

        self.nodes = nodes;
        self.root = NodeId(0);
    }

    /// Statistics about the tree, for logging and debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_trials: root.trials,
            root_win_rate: root.win_rate(),
            max_depth: self.compute_max_depth(self.root, 0),
        }
    }

    fn compute_max_depth(&self, id: NodeId, depth: u32) -> u32 {
        let node = self.get(id);
        node.children
            .iter()
            .map(|&(_, child)| self.compute_max_depth(child, depth + 1))
            .max()
            .unwrap_or(depth)
    }
}

/// Statistics about a search tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_trials: u32,
    pub root_win_rate: f64,
    pub max_depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollout::{playout, UniformRollout};
    use games_connect4::{Board, Connect4, COLS};
    use rand::SeedableRng;

    fn rng(seed: u64) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(seed)
    }

    fn play(moves: &[u8], first: Player) -> Board {
        let mut board = Board::new();
        let mut player = first;
        for &col in moves {
            board = board.drop_piece(col, player);
            player = player.opponent();
        }
        board
    }

    #[test]
    fn new_tree_exposes_all_columns_unexplored() {
        let oracle = Connect4::new();
        let tree = SearchTree::new(&oracle, Board::new(), Player::One);

        assert_eq!(tree.len(), 1);
        let root = tree.get(tree.root());
        assert!(root.parent.is_none());
        assert_eq!(root.unexplored.len(), COLS);
        assert_eq!(root.to_move, Player::One);
    }

    #[test]
    fn expansion_shrinks_unexplored_by_exactly_one() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(7);

        for expected_left in (0..COLS).rev() {
            let child = tree.expand(tree.root(), &oracle, &mut rng).unwrap();
            assert_eq!(tree.get(tree.root()).unexplored.len(), expected_left);
            assert_eq!(tree.get(child).parent, tree.root());
            assert_eq!(tree.get(child).to_move, Player::Two);
            assert_eq!(tree.get(child).trials, 0);
        }

        // All seven children exist, one per column, no duplicates.
        let root = tree.get(tree.root());
        assert_eq!(root.children.len(), COLS);
        let mut moves: Vec<u8> = root.children.iter().map(|&(mv, _)| mv).collect();
        moves.sort_unstable();
        moves.dedup();
        assert_eq!(moves.len(), COLS);
        assert_eq!(tree.len(), COLS + 1);
    }

    #[test]
    fn expansion_on_exhausted_node_fails_loudly() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(8);

        for _ in 0..COLS {
            tree.expand(tree.root(), &oracle, &mut rng).unwrap();
        }
        let err = tree.expand(tree.root(), &oracle, &mut rng).unwrap_err();
        assert!(matches!(err, SearchError::InvalidExpansion(_)));
    }

    #[test]
    fn expansion_on_won_position_fails_loudly() {
        let oracle = Connect4::new();
        // One already connected; no legal moves exist at this root.
        let board = play(&[0, 0, 1, 1, 2, 2, 3], Player::One);
        let mut tree = SearchTree::new(&oracle, board, Player::Two);
        let mut rng = rng(9);

        assert!(tree.get(tree.root()).is_terminal());
        let err = tree.expand(tree.root(), &oracle, &mut rng).unwrap_err();
        assert!(matches!(err, SearchError::InvalidExpansion(_)));
    }

    #[test]
    fn backpropagation_attributes_wins_to_the_mover() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(10);

        let child = tree.expand(tree.root(), &oracle, &mut rng).unwrap();
        let grandchild = tree.expand(child, &oracle, &mut rng).unwrap();

        // One moved into `child`, Two moved into `grandchild`.
        tree.backpropagate(grandchild, PlayoutOutcome::Win(Player::One));

        assert_eq!(tree.get(grandchild).trials, 1);
        assert_eq!(tree.get(child).trials, 1);
        assert_eq!(tree.get(tree.root()).trials, 1);

        assert_eq!(tree.get(grandchild).wins, 0); // Two moved in, One won
        assert_eq!(tree.get(child).wins, 1); // One moved in, One won
        assert_eq!(tree.get(tree.root()).wins, 0);
    }

    #[test]
    fn draws_increment_trials_only() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(11);

        let child = tree.expand(tree.root(), &oracle, &mut rng).unwrap();
        tree.backpropagate(child, PlayoutOutcome::Draw);

        assert_eq!(tree.get(child).trials, 1);
        assert_eq!(tree.get(child).wins, 0);
        assert_eq!(tree.get(tree.root()).trials, 1);
        assert_eq!(tree.get(tree.root()).wins, 0);
    }

    #[test]
    fn selection_stops_at_expandable_root() {
        let oracle = Connect4::new();
        let tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(12);

        assert_eq!(tree.select(1.42, &mut rng), tree.root());
    }

    #[test]
    fn selection_descends_through_fully_expanded_nodes() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(13);

        let mut children = Vec::new();
        for _ in 0..COLS {
            let child = tree.expand(tree.root(), &oracle, &mut rng).unwrap();
            tree.backpropagate(child, PlayoutOutcome::Draw);
            children.push(child);
        }

        let selected = tree.select(1.42, &mut rng);
        assert_ne!(selected, tree.root());
        assert!(children.contains(&selected));
    }

    #[test]
    fn zero_trial_children_selected_before_visited_ones() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(14);

        let first = tree.expand(tree.root(), &oracle, &mut rng).unwrap();
        let second = tree.expand(tree.root(), &oracle, &mut rng).unwrap();

        // Give `first` a perfect record; `second` stays unvisited.
        for _ in 0..5 {
            tree.backpropagate(first, PlayoutOutcome::Win(Player::One));
        }
        assert_eq!(tree.get(first).trials, 5);
        assert_eq!(tree.get(second).trials, 0);

        // The unvisited child has infinite UCB and must win every time.
        for _ in 0..20 {
            assert_eq!(tree.select_child(tree.root(), 1.42, &mut rng), second);
        }
    }

    #[test]
    fn unvisited_parent_selects_uniformly_among_children() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(15);

        let a = tree.expand(tree.root(), &oracle, &mut rng).unwrap();
        let b = tree.expand(tree.root(), &oracle, &mut rng).unwrap();
        assert_eq!(tree.get(tree.root()).trials, 0);

        let mut seen_a = false;
        let mut seen_b = false;
        for _ in 0..100 {
            let picked = tree.select_child(tree.root(), 1.42, &mut rng);
            seen_a |= picked == a;
            seen_b |= picked == b;
        }
        assert!(seen_a && seen_b, "uniform pick never chose one of the children");
    }

    #[test]
    fn ucb_ties_are_not_always_broken_the_same_way() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(16);

        let a = tree.expand(tree.root(), &oracle, &mut rng).unwrap();
        let b = tree.expand(tree.root(), &oracle, &mut rng).unwrap();

        // Identical statistics, identical UCB.
        tree.backpropagate(a, PlayoutOutcome::Win(Player::One));
        tree.backpropagate(b, PlayoutOutcome::Win(Player::One));

        let mut seen_a = false;
        let mut seen_b = false;
        for _ in 0..100 {
            let picked = tree.select_child(tree.root(), 1.42, &mut rng);
            seen_a |= picked == a;
            seen_b |= picked == b;
        }
        assert!(seen_a && seen_b, "tie-break always picked the same child");
    }

    #[test]
    fn trials_conservation_over_many_iterations() {
        let oracle = Connect4::new();
        let policy = UniformRollout::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(17);

        let iterations = 200;
        for _ in 0..iterations {
            let selected = tree.select(1.42, &mut rng);
            let leaf = if tree.get(selected).is_fully_expanded() {
                selected
            } else {
                tree.expand(selected, &oracle, &mut rng).unwrap()
            };
            let (state, to_move) = {
                let node = tree.get(leaf);
                (node.state.clone(), node.to_move)
            };
            let outcome = playout(&oracle, &policy, &state, to_move, &mut rng);
            tree.backpropagate(leaf, outcome);
        }

        assert_eq!(tree.get(tree.root()).trials, iterations);
        // Wins never exceed trials anywhere; child trials sum to the root's.
        let mut child_trials = 0;
        for node in tree.arena() {
            assert!(node.wins <= node.trials);
        }
        for &(_, child) in &tree.get(tree.root()).children {
            child_trials += tree.get(child).trials;
        }
        assert!(child_trials <= iterations);
    }

    #[test]
    fn rerooting_preserves_child_statistics() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(18);

        for _ in 0..COLS {
            let child = tree.expand(tree.root(), &oracle, &mut rng).unwrap();
            let grandchild = tree.expand(child, &oracle, &mut rng).unwrap();
            tree.backpropagate(grandchild, PlayoutOutcome::Win(Player::Two));
        }
        assert_eq!(tree.len(), 1 + 2 * COLS);

        let (_, keep) = tree.best_move().unwrap();
        let kept = tree.get(keep);
        let (wins, trials, state) = (kept.wins, kept.trials, kept.state.clone());
        let grandchildren = kept.children.len();

        tree.reroot_to(keep);

        let root = tree.get(tree.root());
        assert_eq!(root.wins, wins);
        assert_eq!(root.trials, trials);
        assert_eq!(root.state, state);
        assert_eq!(root.children.len(), grandchildren);
        assert!(root.parent.is_none());
        // Siblings and the old root are gone: the kept child, its single
        // grandchild, and nothing else.
        assert_eq!(tree.len(), 2);
        // The parent link of the surviving grandchild points at the new root.
        for &(_, child) in &tree.get(tree.root()).children {
            assert_eq!(tree.get(child).parent, tree.root());
        }
    }

    #[test]
    fn reroot_matching_finds_the_played_move() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(19);

        for _ in 0..COLS {
            tree.expand(tree.root(), &oracle, &mut rng).unwrap();
        }

        let observed = Board::new().drop_piece(4, Player::One);
        tree.reroot_matching(&observed).unwrap();
        assert_eq!(tree.get(tree.root()).state, observed);
        assert_eq!(tree.get(tree.root()).to_move, Player::Two);
    }

    #[test]
    fn reroot_matching_reports_desync() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(20);
        tree.expand(tree.root(), &oracle, &mut rng).unwrap();

        // Two moves ahead of the root: no child can match.
        let observed = Board::new()
            .drop_piece(0, Player::One)
            .drop_piece(1, Player::Two);
        let err = tree.reroot_matching(&observed).unwrap_err();
        assert!(matches!(err, SearchError::TreeDesync));
    }

    #[test]
    fn stats_reflect_tree_shape() {
        let oracle = Connect4::new();
        let mut tree = SearchTree::new(&oracle, Board::new(), Player::One);
        let mut rng = rng(21);

        let child = tree.expand(tree.root(), &oracle, &mut rng).unwrap();
        let grandchild = tree.expand(child, &oracle, &mut rng).unwrap();
        tree.backpropagate(grandchild, PlayoutOutcome::Win(Player::One));

        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.root_trials, 1);
        assert_eq!(stats.max_depth, 2);
    }
}
