//! Monte Carlo tree search engine for two-player, perfect-information,
//! zero-sum board games.
//!
//! The engine builds a search tree one node per iteration. Each iteration
//! runs four phases:
//!
//! 1. **Selection**: walk from the root to a node with unexplored moves (or
//!    a terminal node), descending at every step to the child maximizing
//!    UCB1: `wins/trials + C * sqrt(ln(parent.trials) / trials)`
//! 2. **Expansion**: materialize one child from a random unexplored move
//! 3. **Playout**: simulate uniformly random play to a win or draw
//! 4. **Backpropagation**: walk the parent chain to the root, crediting
//!    every node whose mover won the simulation
//!
//! Between real turns the tree survives: the driver re-roots it at the
//! branch actually played, keeping the statistics gathered so far and
//! discarding sibling subtrees.
//!
//! The game rules are consumed through the `game-core` oracle trait, so the
//! engine never names a concrete game. Randomness is threaded explicitly as
//! a `ChaCha20Rng`, which makes every search reproducible from a seed.
//!
//! # Usage
//!
//! ```rust
//! use game_core::Player;
//! use games_connect4::{Board, Connect4};
//! use mcts::{MctsSearch, SearchConfig, UniformRollout};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let oracle = Connect4::new();
//! let policy = UniformRollout::new();
//! let mut driver = MctsSearch::new(&oracle, &policy, SearchConfig::for_testing());
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//!
//! let mv = driver.choose_move(&Board::new(), Player::One, &mut rng).unwrap();
//! assert!(mv < 7);
//! // Apply the opponent's reply externally, then call `choose_move` again;
//! // the driver re-roots the carried-over tree instead of starting fresh.
//! ```

pub mod config;
pub mod node;
pub mod rollout;
pub mod search;
pub mod tree;

pub use config::SearchConfig;
pub use node::{Node, NodeId};
pub use rollout::{playout, PlayoutOutcome, RolloutPolicy, UniformRollout};
pub use search::{run_search, MctsSearch, SearchError};
pub use tree::{SearchTree, TreeStats};
