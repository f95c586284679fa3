//! Solver benchmarking: per-game statistics, aggregated summaries and CSV
//! export.

use crate::board::Direction;
use crate::game::{Game, GameState};
use crate::solver::Solver;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// Outcome of one complete solver-played game.
#[derive(Clone, Debug)]
pub struct GameStats {
    pub solver_name: String,
    pub score: u32,
    pub max_tile: u32,
    pub won: bool,
    pub total_moves: u32,
    /// Effective moves per direction, indexed by `Direction::index()`.
    pub moves: [u32; 4],
    pub duration: Duration,
}

impl GameStats {
    pub fn from_game(solver_name: &str, game: &Game, duration: Duration) -> Self {
        let counters = game.counters();
        Self {
            solver_name: solver_name.to_string(),
            score: game.score(),
            max_tile: game.max_tile(),
            won: game.state() == GameState::Won,
            total_moves: counters.total(),
            moves: [
                counters.get(Direction::Up),
                counters.get(Direction::Down),
                counters.get(Direction::Left),
                counters.get(Direction::Right),
            ],
            duration,
        }
    }
}

/// Aggregate over all games one solver played.
#[derive(Clone, Debug)]
pub struct SolverSummary {
    pub solver_name: String,
    pub games: usize,
    pub best_score: u32,
    pub worst_score: u32,
    pub mean_score: f64,
    pub median_score: f64,
    pub best_tile: u32,
    pub win_rate: f64,
    pub mean_moves: f64,
    /// Total effective moves per direction across all games.
    pub move_totals: [u64; 4],
    pub mean_duration: Duration,
}

/// Plays a fixed number of games per solver and aggregates the results.
pub struct StatisticsRunner {
    pub games_per_solver: usize,
    /// Safety cap so a stuck solver cannot spin a game forever.
    pub move_cap: u32,
}

impl Default for StatisticsRunner {
    fn default() -> Self {
        Self {
            games_per_solver: 10,
            move_cap: 100_000,
        }
    }
}

impl StatisticsRunner {
    pub fn new(games_per_solver: usize) -> Self {
        Self {
            games_per_solver,
            ..Self::default()
        }
    }

    /// Plays one game to completion and returns its statistics.
    pub fn play_game(&self, solver: &mut dyn Solver) -> GameStats {
        let start = Instant::now();
        let mut game = Game::new();
        while game.state() == GameState::Playing && game.total_moves() < self.move_cap {
            let direction = solver.choose_move(&game);
            if !game.apply(direction) {
                break;
            }
        }
        GameStats::from_game(solver.name(), &game, start.elapsed())
    }

    pub fn run_solver(&self, solver: &mut dyn Solver) -> Vec<GameStats> {
        (0..self.games_per_solver)
            .map(|_| self.play_game(solver))
            .collect()
    }

    pub fn summarize(&self, stats: &[GameStats]) -> Option<SolverSummary> {
        let first = stats.first()?;

        let mut scores: Vec<u32> = stats.iter().map(|s| s.score).collect();
        scores.sort_unstable();
        let median_score = if scores.len() % 2 == 1 {
            scores[scores.len() / 2] as f64
        } else {
            let hi = scores.len() / 2;
            (scores[hi - 1] as f64 + scores[hi] as f64) / 2.0
        };

        let games = stats.len();
        let mut move_totals = [0u64; 4];
        let mut total_duration = Duration::ZERO;
        for s in stats {
            for i in 0..4 {
                move_totals[i] += s.moves[i] as u64;
            }
            total_duration += s.duration;
        }

        Some(SolverSummary {
            solver_name: first.solver_name.clone(),
            games,
            best_score: scores[scores.len() - 1],
            worst_score: scores[0],
            mean_score: stats.iter().map(|s| s.score as f64).sum::<f64>() / games as f64,
            median_score,
            best_tile: stats.iter().map(|s| s.max_tile).max().unwrap_or(0),
            win_rate: stats.iter().filter(|s| s.won).count() as f64 / games as f64,
            mean_moves: stats.iter().map(|s| s.total_moves as f64).sum::<f64>() / games as f64,
            move_totals,
            mean_duration: total_duration / games as u32,
        })
    }
}

pub fn format_report(summary: &SolverSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ({} games) ===", summary.solver_name, summary.games);
    let _ = writeln!(
        out,
        "Score: best {} / median {:.0} / mean {:.1} / worst {}",
        summary.best_score, summary.median_score, summary.mean_score, summary.worst_score
    );
    let _ = writeln!(
        out,
        "Win rate: {:.1}%   Best tile: {}",
        summary.win_rate * 100.0,
        summary.best_tile
    );
    let _ = writeln!(
        out,
        "Moves: {:.1} per game (U {} / D {} / L {} / R {})",
        summary.mean_moves,
        summary.move_totals[0],
        summary.move_totals[1],
        summary.move_totals[2],
        summary.move_totals[3]
    );
    let _ = writeln!(
        out,
        "Mean game time: {:.2}s",
        summary.mean_duration.as_secs_f64()
    );
    out
}

pub fn format_comparison(summaries: &[SolverSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:>10} {:>10} {:>8} {:>9} {:>10}",
        "Solver", "Mean", "Median", "Win %", "Moves", "Time/game"
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<16} {:>10.1} {:>10.0} {:>8.1} {:>9.1} {:>9.2}s",
            s.solver_name,
            s.mean_score,
            s.median_score,
            s.win_rate * 100.0,
            s.mean_moves,
            s.mean_duration.as_secs_f64()
        );
    }
    out
}

pub fn to_csv(stats: &[GameStats]) -> String {
    let mut out = String::from(
        "solver,score,max_tile,won,total_moves,up,down,left,right,duration_ms\n",
    );
    for s in stats {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            s.solver_name,
            s.score,
            s.max_tile,
            s.won,
            s.total_moves,
            s.moves[0],
            s.moves[1],
            s.moves[2],
            s.moves[3],
            s.duration.as_millis()
        );
    }
    out
}

pub fn write_csv(path: &str, stats: &[GameStats]) -> Result<(), String> {
    std::fs::write(path, to_csv(stats))
        .map_err(|e| format!("Failed to write CSV to {}: {}", path, e))
}
