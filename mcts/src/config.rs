//! Search configuration parameters.

/// Configuration for Monte Carlo tree search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Iterations granted per legal move at the root. The branching factor
    /// shrinks as columns fill up, so early positions, where the game tree is
    /// widest, automatically receive the largest budgets.
    pub iterations_per_move: u32,

    /// Floor for the per-turn budget, so late positions with few open
    /// columns still get a meaningful search.
    pub min_iterations: u32,

    /// Exploration constant C in the UCB1 formula. sqrt(2) is the classic
    /// choice; higher values explore more, lower values exploit harder.
    pub exploration: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations_per_move: 300,
            min_iterations: 1000,
            exploration: std::f64::consts::SQRT_2,
        }
    }
}

impl SearchConfig {
    /// Fast config for tests.
    pub fn for_testing() -> Self {
        Self {
            iterations_per_move: 50,
            min_iterations: 200,
            exploration: std::f64::consts::SQRT_2,
        }
    }

    /// Iteration budget for one real move, given the branching factor at the
    /// current root.
    pub fn budget(&self, branching: u32) -> u32 {
        self.iterations_per_move
            .saturating_mul(branching)
            .max(self.min_iterations)
    }

    /// Builder pattern: set the per-legal-move iteration count.
    pub fn with_iterations_per_move(mut self, n: u32) -> Self {
        self.iterations_per_move = n;
        self
    }

    /// Builder pattern: set the budget floor.
    pub fn with_min_iterations(mut self, n: u32) -> Self {
        self.min_iterations = n;
        self
    }

    /// Builder pattern: set the UCB1 exploration constant.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration = c;
        self
    }
}
