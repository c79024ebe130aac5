//! Per-turn search driver.
//!
//! Runs a budget of select -> expand -> playout -> backpropagate cycles for
//! each real move, commits to the child with the best win rate, and carries
//! the committed subtree over to the next call. The driver is the only
//! component with cross-turn state; iterations run strictly one after
//! another so every selection observes the statistics of all prior
//! backpropagations.

use game_core::{Game, Player};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::SearchConfig;
use crate::node::NodeId;
use crate::rollout::{playout, RolloutPolicy};
use crate::tree::SearchTree;

/// Errors that can occur during search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Expansion was invoked on a node with no unexplored moves. Always an
    /// engine bug, never a valid terminal state.
    #[error("no unexplored moves to expand at node {0:?}")]
    InvalidExpansion(NodeId),

    /// The driver was asked for a move in an already-terminal position.
    #[error("no legal moves available: the position is terminal")]
    NoLegalMoves,

    /// No child of the carried-over root matches the observed board. The
    /// driver recovers by rebuilding a fresh tree from the observed position.
    #[error("carried-over tree has no child matching the observed position")]
    TreeDesync,
}

/// Turn driver: owns the tree carried across successive real moves.
pub struct MctsSearch<'a, G: Game, P: RolloutPolicy<G>> {
    oracle: &'a G,
    policy: &'a P,
    config: SearchConfig,
    tree: Option<SearchTree<G>>,
}

impl<'a, G: Game, P: RolloutPolicy<G>> MctsSearch<'a, G, P> {
    pub fn new(oracle: &'a G, policy: &'a P, config: SearchConfig) -> Self {
        Self {
            oracle,
            policy,
            config,
            tree: None,
        }
    }

    /// The carried-over tree, if a move has been chosen before.
    pub fn tree(&self) -> Option<&SearchTree<G>> {
        self.tree.as_ref()
    }

    /// Drop the carried-over tree, e.g. at the start of a new game.
    pub fn reset(&mut self) {
        self.tree = None;
    }

    /// Choose a move for `to_move` in `state`.
    ///
    /// Re-roots the carried-over tree at the child matching the observed
    /// position (keeping its statistics), runs the iteration budget, commits
    /// to the root child with the highest win rate, and re-roots there for
    /// the next call.
    pub fn choose_move(
        &mut self,
        state: &G::State,
        to_move: Player,
        rng: &mut ChaCha20Rng,
    ) -> Result<G::Move, SearchError> {
        let mut tree = self.sync_tree(state, to_move);

        let root = tree.get(tree.root());
        let branching = (root.children.len() + root.unexplored.len()) as u32;
        if branching == 0 {
            self.tree = Some(tree);
            return Err(SearchError::NoLegalMoves);
        }

        let budget = self.config.budget(branching);
        for _ in 0..budget {
            self.iterate(&mut tree, rng)?;
        }

        // Exploitation only at decision time: best raw win rate, no bonus.
        let (mv, child) = tree.best_move().ok_or(SearchError::NoLegalMoves)?;
        let committed = tree.get(child);
        debug!(
            chosen = ?mv,
            wins = committed.wins,
            trials = committed.trials,
            nodes = tree.len(),
            "committing move"
        );

        tree.reroot_to(child);
        self.tree = Some(tree);
        Ok(mv)
    }

    /// Line the carried-over tree up with the observed position, or build a
    /// fresh one.
    fn sync_tree(&mut self, state: &G::State, to_move: Player) -> SearchTree<G> {
        let Some(mut tree) = self.tree.take() else {
            return SearchTree::new(self.oracle, state.clone(), to_move);
        };

        let root = tree.get(tree.root());
        if root.state == *state && root.to_move == to_move {
            return tree;
        }

        match tree.reroot_matching(state) {
            Ok(()) => tree,
            Err(_) => {
                warn!("observed position not among carried-over children; rebuilding tree");
                SearchTree::new(self.oracle, state.clone(), to_move)
            }
        }
    }

    /// One full search iteration.
    fn iterate(&self, tree: &mut SearchTree<G>, rng: &mut ChaCha20Rng) -> Result<(), SearchError> {
        let selected = tree.select(self.config.exploration, rng);

        // Selection halts either at a node with unexplored moves, which must
        // be expanded before playout, or at a terminal node, whose outcome
        // the playout reads directly.
        let leaf = if tree.get(selected).is_fully_expanded() {
            selected
        } else {
            tree.expand(selected, self.oracle, rng)?
        };

        let (state, to_move) = {
            let node = tree.get(leaf);
            (node.state.clone(), node.to_move)
        };
        let outcome = playout(self.oracle, self.policy, &state, to_move, rng);
        tree.backpropagate(leaf, outcome);

        trace!(leaf = leaf.0, outcome = ?outcome, "simulation complete");
        Ok(())
    }
}

/// One-shot search without cross-turn tree reuse.
pub fn run_search<G, P>(
    oracle: &G,
    policy: &P,
    config: SearchConfig,
    state: &G::State,
    to_move: Player,
    rng: &mut ChaCha20Rng,
) -> Result<G::Move, SearchError>
where
    G: Game,
    P: RolloutPolicy<G>,
{
    MctsSearch::new(oracle, policy, config).choose_move(state, to_move, rng)
}
