use mc2048::cli_rendering::format_game;
use mc2048::engine::{EngineConfig, GpuMonteCarloSolver};
use mc2048::game::{Game, GameState};
use mc2048::solver::Solver;

fn main() {
    println!("mc2048 - Monte Carlo Solver Example");
    println!("===================================\n");

    let mut game = Game::new();

    // Rollout counts to taste: 100 is quick, 1000+ plays noticeably better.
    let config = EngineConfig {
        simulations_per_move: 200,
        ..EngineConfig::default()
    };

    println!("Creating solver ({} rollouts per direction)...", config.simulations_per_move);
    let mut solver = GpuMonteCarloSolver::with_config(config);
    if solver.gpu_available() {
        println!("✓ Rollouts will run on the GPU\n");
    } else {
        println!("✓ Rollouts will run on the CPU\n");
    }

    println!("Playing the first 10 moves:\n");

    for move_num in 1..=10 {
        if game.state() != GameState::Playing {
            println!("Game over!");
            break;
        }

        let direction = solver.choose_move(&game);
        println!("Move {}: {}", move_num, direction.as_str());

        if !game.apply(direction) {
            println!("  No effect, stopping");
            break;
        }
    }

    println!("\n{}", format_game(&game));

    let stats = solver.statistics();
    println!("Rollouts run: {}", stats.simulations_run);
    println!("GPU batches:  {}", stats.gpu_batches_processed);
    println!("CPU rollouts: {}", stats.cpu_simulations);

    println!("\nConfiguration tips:");
    println!("- Increase simulations_per_move for stronger play (but slower)");
    println!("- max_rollout_steps caps how deep each random game runs");
}
