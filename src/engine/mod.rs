//! Monte-Carlo search engines for 2048.
//!
//! Both solvers share the same decision rule: for every currently legal
//! direction, play N random games to completion (or a step cap) starting
//! with that direction, score the end positions with the rollout evaluator
//! and pick the direction with the highest mean. The CPU solver runs the
//! rollouts on the grid representation across a rayon pool; the GPU solver
//! packs the board into a u64 and runs one rollout per compute-shader lane.
//!
//! # Example
//!
//! ```no_run
//! use mc2048::engine::{EngineConfig, MonteCarloSolver};
//! use mc2048::game::Game;
//! use mc2048::solver::Solver;
//!
//! let config = EngineConfig {
//!     simulations_per_move: 200,
//!     ..EngineConfig::default()
//! };
//! let mut solver = MonteCarloSolver::with_config(config);
//! let game = Game::new();
//! let direction = solver.choose_move(&game);
//! println!("Suggested: {}", direction.as_str());
//! ```

use crate::board::Direction;
use crate::game::{Game, GameState};
use crate::solver::Solver;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub mod gpu_context;
pub use gpu_context::{get_shared_context, GpuContext};

pub mod packed;

mod gpu_rollout;
pub use gpu_rollout::GpuRolloutEngine;

/// Engine configuration shared by the CPU and GPU solvers.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Number of rollouts per candidate direction
    pub simulations_per_move: u32,
    /// Random moves played per rollout before it is cut off
    pub max_rollout_steps: u32,
    /// Evaluator weight per empty cell
    pub empty_weight: f32,
    /// Evaluator weight applied to the largest tile value
    pub max_tile_weight: f32,
    /// Lanes per GPU dispatch
    pub gpu_batch_size: usize,
    /// Enable GPU rollouts (if false or unavailable, packed rollouts run on CPU)
    pub use_gpu: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            simulations_per_move: 100,
            max_rollout_steps: 200,
            empty_weight: 128.0,
            max_tile_weight: 32.0,
            gpu_batch_size: 1024,
            use_gpu: true,
        }
    }
}

/// Search statistics snapshot.
#[derive(Clone, Debug, Default)]
pub struct SearchStatistics {
    /// Rollouts completed across all searches
    pub simulations_run: u64,
    /// GPU batches dispatched
    pub gpu_batches_processed: u64,
    /// Rollouts that ran on the CPU (grid search or packed fallback)
    pub cpu_simulations: u64,
    /// Searches that fell back to the grid engine (unpackable board)
    pub grid_fallbacks: u64,
}

impl SearchStatistics {
    pub fn gpu_share(&self) -> f64 {
        if self.simulations_run == 0 {
            0.0
        } else {
            1.0 - self.cpu_simulations as f64 / self.simulations_run as f64
        }
    }
}

/// Thread-safe counters behind the statistics snapshot.
struct AtomicStats {
    simulations: AtomicU64,
    gpu_batches: AtomicU64,
    cpu_sims: AtomicU64,
    grid_fallbacks: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            simulations: AtomicU64::new(0),
            gpu_batches: AtomicU64::new(0),
            cpu_sims: AtomicU64::new(0),
            grid_fallbacks: AtomicU64::new(0),
        }
    }

    fn to_statistics(&self) -> SearchStatistics {
        SearchStatistics {
            simulations_run: self.simulations.load(Ordering::Relaxed),
            gpu_batches_processed: self.gpu_batches.load(Ordering::Relaxed),
            cpu_simulations: self.cpu_sims.load(Ordering::Relaxed),
            grid_fallbacks: self.grid_fallbacks.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.simulations.store(0, Ordering::Relaxed);
        self.gpu_batches.store(0, Ordering::Relaxed);
        self.cpu_sims.store(0, Ordering::Relaxed);
        self.grid_fallbacks.store(0, Ordering::Relaxed);
    }
}

/// Rollout evaluator: cumulative score plus weighted empty-cell count plus
/// weighted largest tile.
pub fn evaluate(game: &Game, config: &EngineConfig) -> f32 {
    game.score() as f32
        + config.empty_weight * game.empty_count() as f32
        + config.max_tile_weight * game.max_tile() as f32
}

/// One grid-form rollout: fork the game deterministically, open with the
/// candidate direction, then play uniformly random legal moves until the
/// game ends or the step cap is hit.
pub fn rollout(game: &Game, first_move: Direction, seed: u64, config: &EngineConfig) -> f32 {
    let mut sim = game.fork_seeded(seed);
    sim.apply(first_move);

    // Separate policy stream so move choice never perturbs tile spawns.
    let mut policy = StdRng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
    let mut steps = 0;
    while steps < config.max_rollout_steps && sim.state() == GameState::Playing {
        let moves = sim.available_moves();
        if moves.is_empty() {
            break;
        }
        sim.apply(moves[policy.gen_range(0..moves.len())]);
        steps += 1;
    }

    evaluate(&sim, config)
}

/// Grid-form Monte-Carlo search. Per direction the rollouts run across the
/// rayon pool; partial sums are combined by the reduction, never through a
/// shared accumulator. Strictly-greater comparison keeps the first direction
/// on ties; an exhausted board falls back to Up.
fn search_grid(
    game: &Game,
    config: &EngineConfig,
    stats: &AtomicStats,
    master: &mut StdRng,
) -> Direction {
    let moves = game.available_moves();
    if moves.is_empty() {
        return Direction::Up;
    }

    let mut best = moves[0];
    let mut best_score = f32::NEG_INFINITY;
    for direction in moves {
        let seeds: Vec<u64> = (0..config.simulations_per_move)
            .map(|_| master.gen())
            .collect();

        let (sum, count) = seeds
            .par_iter()
            .map(|&seed| (rollout(game, direction, seed, config) as f64, 1u64))
            .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

        stats.simulations.fetch_add(count, Ordering::Relaxed);
        stats.cpu_sims.fetch_add(count, Ordering::Relaxed);

        if count == 0 {
            continue;
        }
        let avg = (sum / count as f64) as f32;
        if avg > best_score {
            best_score = avg;
            best = direction;
        }
    }

    best
}

/// CPU Monte-Carlo solver over the grid representation.
pub struct MonteCarloSolver {
    config: EngineConfig,
    stats: Arc<AtomicStats>,
    master: StdRng,
}

impl MonteCarloSolver {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            stats: Arc::new(AtomicStats::new()),
            master: StdRng::from_entropy(),
        }
    }

    /// Fixed master seed makes the whole search reproducible.
    pub fn with_config_seeded(config: EngineConfig, seed: u64) -> Self {
        Self {
            config,
            stats: Arc::new(AtomicStats::new()),
            master: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn statistics(&self) -> SearchStatistics {
        self.stats.to_statistics()
    }

    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }
}

impl Default for MonteCarloSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for MonteCarloSolver {
    fn name(&self) -> &str {
        "CPU Monte Carlo"
    }

    fn choose_move(&mut self, game: &Game) -> Direction {
        search_grid(game, &self.config, &self.stats, &mut self.master)
    }
}

/// GPU Monte-Carlo solver over the packed representation.
///
/// The board is encoded once per decision; each rollout occupies one shader
/// lane and returns a single f32. When no adapter is available, or a
/// dispatch fails, the identical lane program runs on the CPU via
/// `packed::rollout` across rayon. Boards that do not fit the 4-bit packed
/// form fall back to the grid search.
pub struct GpuMonteCarloSolver {
    config: EngineConfig,
    stats: Arc<AtomicStats>,
    master: StdRng,
    rollout_engine: Option<GpuRolloutEngine>,
}

impl GpuMonteCarloSolver {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let rollout_engine = if config.use_gpu {
            match GpuRolloutEngine::new_sync() {
                Ok(engine) => {
                    eprintln!("✓ GPU rollout engine initialized");
                    Some(engine)
                }
                Err(e) => {
                    eprintln!("⚠ GPU rollouts unavailable: {}", e);
                    eprintln!("  Falling back to CPU packed rollouts");
                    None
                }
            }
        } else {
            None
        };

        Self {
            config,
            stats: Arc::new(AtomicStats::new()),
            master: StdRng::from_entropy(),
            rollout_engine,
        }
    }

    pub fn with_config_seeded(config: EngineConfig, seed: u64) -> Self {
        let mut solver = Self::with_config(config);
        solver.master = StdRng::seed_from_u64(seed);
        solver
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn statistics(&self) -> SearchStatistics {
        self.stats.to_statistics()
    }

    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }

    pub fn gpu_available(&self) -> bool {
        self.rollout_engine.is_some()
    }

    /// Runs one packed rollout per seed on the rayon pool. Lane program and
    /// RNG stream are identical to the shader's.
    fn cpu_lane_batch(&self, board: u64, direction: Direction, seeds: &[u32], base_score: u32) -> Vec<f32> {
        self.stats
            .cpu_sims
            .fetch_add(seeds.len() as u64, Ordering::Relaxed);
        seeds
            .par_iter()
            .map(|&seed| {
                packed::rollout(
                    board,
                    direction,
                    seed,
                    base_score,
                    self.config.max_rollout_steps,
                    self.config.empty_weight,
                    self.config.max_tile_weight,
                )
            })
            .collect()
    }
}

impl Default for GpuMonteCarloSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for GpuMonteCarloSolver {
    fn name(&self) -> &str {
        "GPU Monte Carlo"
    }

    fn choose_move(&mut self, game: &Game) -> Direction {
        let moves = game.available_moves();
        if moves.is_empty() {
            return Direction::Up;
        }

        let board = match packed::encode(game.board()) {
            Ok(board) => board,
            Err(e) => {
                eprintln!("⚠ Board not packable ({}), using grid search", e);
                self.stats.grid_fallbacks.fetch_add(1, Ordering::Relaxed);
                return search_grid(game, &self.config, &self.stats, &mut self.master);
            }
        };
        let base_score = game.score();

        let mut best = moves[0];
        let mut best_score = f32::NEG_INFINITY;
        for direction in moves {
            let mut sum = 0.0f64;
            let mut count = 0u64;
            let mut remaining = self.config.simulations_per_move as usize;
            while remaining > 0 {
                let batch = remaining
                    .min(self.config.gpu_batch_size)
                    .min(gpu_rollout::MAX_LANES);
                let seeds: Vec<u32> = (0..batch).map(|_| self.master.gen()).collect();

                let scores = match &self.rollout_engine {
                    Some(engine) => match engine.run_batch(
                        board,
                        direction,
                        &seeds,
                        base_score,
                        self.config.max_rollout_steps,
                        self.config.empty_weight,
                        self.config.max_tile_weight,
                    ) {
                        Ok(scores) => {
                            self.stats.gpu_batches.fetch_add(1, Ordering::Relaxed);
                            scores
                        }
                        Err(e) => {
                            eprintln!("⚠ GPU batch failed ({}), running lanes on CPU", e);
                            self.cpu_lane_batch(board, direction, &seeds, base_score)
                        }
                    },
                    None => self.cpu_lane_batch(board, direction, &seeds, base_score),
                };

                for score in scores {
                    sum += score as f64;
                    count += 1;
                }
                remaining -= batch;
            }

            self.stats.simulations.fetch_add(count, Ordering::Relaxed);
            if count == 0 {
                continue;
            }
            let avg = (sum / count as f64) as f32;
            if avg > best_score {
                best_score = avg;
                best = direction;
            }
        }

        best
    }
}
