//! Solver plug-in contract and the two baseline solvers.
//!
//! The Monte-Carlo solvers in `engine` implement the same trait; the
//! benchmark runner and the front ends only ever talk to `dyn Solver`.

use crate::board::Direction;
use crate::game::Game;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait Solver {
    fn name(&self) -> &str;

    /// Picks a direction for the given position. Implementations return
    /// `Direction::Up` when no legal move exists; the caller's `apply` is a
    /// no-op in that case.
    fn choose_move(&mut self, game: &Game) -> Direction;
}

/// Uniformly random among the legal moves.
pub struct RandomSolver {
    rng: StdRng,
}

impl RandomSolver {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for RandomSolver {
    fn name(&self) -> &str {
        "Random"
    }

    fn choose_move(&mut self, game: &Game) -> Direction {
        let moves = game.available_moves();
        if moves.is_empty() {
            return Direction::Up;
        }
        moves[self.rng.gen_range(0..moves.len())]
    }
}

/// One-ply greedy: the move with the largest immediate merge score. Ties
/// keep the first direction in the stable Up/Down/Left/Right order.
pub struct GreedySolver;

impl GreedySolver {
    pub fn new() -> Self {
        GreedySolver
    }
}

impl Default for GreedySolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for GreedySolver {
    fn name(&self) -> &str {
        "Greedy"
    }

    fn choose_move(&mut self, game: &Game) -> Direction {
        let mut best = Direction::Up;
        let mut best_delta = None;
        for direction in Direction::ALL {
            let mut probe = *game.board();
            let outcome = probe.apply_move(direction);
            if !outcome.changed {
                continue;
            }
            if best_delta.map_or(true, |d| outcome.score_delta > d) {
                best_delta = Some(outcome.score_delta);
                best = direction;
            }
        }
        best
    }
}
