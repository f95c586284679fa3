pub mod board;
pub mod cli_rendering;
pub mod engine;
pub mod game;
pub mod solver;
pub mod stats;
pub mod tui;

// Re-export main types
pub use board::{Board, Direction, MoveOutcome, BOARD_DIMENSION, BOARD_SIZE, WIN_VALUE};
pub use game::{Game, GameState, MoveCounters, SNAPSHOT_LEN};
pub use solver::{GreedySolver, RandomSolver, Solver};
pub use tui::run_tui;
// Re-export main engine types (others available via engine::*)
pub use engine::{EngineConfig, GpuMonteCarloSolver, MonteCarloSolver, SearchStatistics};
