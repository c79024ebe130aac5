//! Playout (rollout) of a position to a terminal outcome.
//!
//! The rollout move generator is pluggable through [`RolloutPolicy`];
//! [`UniformRollout`] picks uniformly among legal moves and is the default
//! policy. A playout never touches the tree: it runs on a scratch clone of
//! the position.

use game_core::{Game, Player};
use rand::Rng;
use rand_chacha::ChaCha20Rng;

/// Terminal outcome of a simulated game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayoutOutcome {
    /// The given player achieved the winning connection.
    Win(Player),
    /// The board filled up with no winner.
    Draw,
}

/// Move generator used during playout.
pub trait RolloutPolicy<G: Game> {
    /// Choose one of `legal` to play for `to_move`. `legal` is never empty.
    fn pick_move(
        &self,
        oracle: &G,
        state: &G::State,
        to_move: Player,
        legal: &[G::Move],
        rng: &mut ChaCha20Rng,
    ) -> G::Move;
}

/// Uniformly random rollout policy.
#[derive(Debug, Default)]
pub struct UniformRollout;

impl UniformRollout {
    pub fn new() -> Self {
        Self
    }
}

impl<G: Game> RolloutPolicy<G> for UniformRollout {
    fn pick_move(
        &self,
        _oracle: &G,
        _state: &G::State,
        _to_move: Player,
        legal: &[G::Move],
        rng: &mut ChaCha20Rng,
    ) -> G::Move {
        legal[rng.gen_range(0..legal.len())]
    }
}

/// Simulate from `start` (where `to_move` is next to act) until a win or
/// draw, and report the outcome.
///
/// If `start` is already terminal no simulation runs: the player who moved
/// into it may have just won, otherwise the full board is a draw. Terminates
/// because each simulated move strictly reduces remaining capacity.
pub fn playout<G, P>(
    oracle: &G,
    policy: &P,
    start: &G::State,
    to_move: Player,
    rng: &mut ChaCha20Rng,
) -> PlayoutOutcome
where
    G: Game,
    P: RolloutPolicy<G>,
{
    // The player who moved into `start` may already have won it.
    let mover_in = to_move.opponent();
    if oracle.is_win(start, mover_in) {
        return PlayoutOutcome::Win(mover_in);
    }
    if oracle.is_full(start) {
        return PlayoutOutcome::Draw;
    }

    let mut state = start.clone();
    let mut player = to_move;
    loop {
        let legal = oracle.legal_moves(&state);
        debug_assert!(!legal.is_empty(), "non-terminal position with no legal moves");

        let mv = policy.pick_move(oracle, &state, player, &legal, rng);
        state = oracle.apply(&state, mv, player);

        if oracle.is_win(&state, player) {
            return PlayoutOutcome::Win(player);
        }
        if oracle.is_full(&state) {
            return PlayoutOutcome::Draw;
        }
        player = player.opponent();
    }
}
