use base64::{engine::general_purpose, Engine as _};
use clap::{Args, Parser, Subcommand};
use mc2048::cli_rendering::format_game;
use mc2048::engine::{EngineConfig, GpuMonteCarloSolver, MonteCarloSolver};
use mc2048::game::{Game, GameState, SNAPSHOT_LEN};
use mc2048::solver::{GreedySolver, RandomSolver, Solver};
use mc2048::stats::{format_comparison, format_report, write_csv, StatisticsRunner};
use mc2048::run_tui;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive game in the terminal (default)
    Play,
    /// Benchmark the solvers over a number of games
    Bench(BenchArgs),
    /// Watch a solver play one game
    Solve(SolveArgs),
    /// Print a fresh game as a base64 snapshot
    Export,
    /// Load a base64 snapshot and show the position
    Import(ImportArgs),
}

#[derive(Args)]
struct BenchArgs {
    /// Games per solver
    #[arg(long, default_value_t = 10)]
    games: usize,
    /// Rollouts per candidate direction
    #[arg(long, default_value_t = 100)]
    simulations: u32,
    /// Step cap per rollout
    #[arg(long, default_value_t = 200)]
    max_steps: u32,
    /// Include the GPU solver
    #[arg(long)]
    gpu: bool,
    /// Write per-game results to a CSV file
    #[arg(long)]
    csv: Option<String>,
}

#[derive(Args)]
struct SolveArgs {
    /// Rollouts per candidate direction
    #[arg(long, default_value_t = 100)]
    simulations: u32,
    /// Step cap per rollout
    #[arg(long, default_value_t = 200)]
    max_steps: u32,
    /// Use the GPU solver
    #[arg(long)]
    gpu: bool,
    /// Master seed for a reproducible search
    #[arg(long)]
    seed: Option<u64>,
    /// Print the board every N moves
    #[arg(long, default_value_t = 50)]
    print_every: u32,
}

#[derive(Args)]
struct ImportArgs {
    /// Base64 encoded game snapshot
    data: String,
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Bench(args)) => run_bench(args),
        Some(Commands::Solve(args)) => run_solve(args),
        Some(Commands::Export) => {
            let game = Game::new();
            println!("{}", general_purpose::STANDARD.encode(game.to_binary()));
        }
        Some(Commands::Import(args)) => run_import(args),
        _ => {
            if let Err(e) = run_tui(None) {
                eprintln!("TUI error: {}", e);
            }
        }
    }
}

fn run_bench(args: &BenchArgs) {
    let config = EngineConfig {
        simulations_per_move: args.simulations,
        max_rollout_steps: args.max_steps,
        use_gpu: args.gpu,
        ..EngineConfig::default()
    };

    let mut solvers: Vec<Box<dyn Solver>> = vec![
        Box::new(RandomSolver::new()),
        Box::new(GreedySolver::new()),
        Box::new(MonteCarloSolver::with_config(config.clone())),
    ];
    if args.gpu {
        solvers.push(Box::new(GpuMonteCarloSolver::with_config(config)));
    }

    let runner = StatisticsRunner::new(args.games);
    let mut all_stats = Vec::new();
    let mut summaries = Vec::new();
    for solver in &mut solvers {
        println!("Running {} ({} games)...", solver.name(), args.games);
        let stats = runner.run_solver(solver.as_mut());
        if let Some(summary) = runner.summarize(&stats) {
            print!("{}", format_report(&summary));
            summaries.push(summary);
        }
        all_stats.extend(stats);
    }

    println!();
    print!("{}", format_comparison(&summaries));

    if let Some(path) = &args.csv {
        match write_csv(path, &all_stats) {
            Ok(()) => println!("Per-game results written to {}", path),
            Err(e) => eprintln!("{}", e),
        }
    }
}

fn run_solve(args: &SolveArgs) {
    let config = EngineConfig {
        simulations_per_move: args.simulations,
        max_rollout_steps: args.max_steps,
        use_gpu: args.gpu,
        ..EngineConfig::default()
    };

    let mut solver: Box<dyn Solver> = match (args.gpu, args.seed) {
        (true, Some(seed)) => Box::new(GpuMonteCarloSolver::with_config_seeded(config, seed)),
        (true, None) => Box::new(GpuMonteCarloSolver::with_config(config)),
        (false, Some(seed)) => Box::new(MonteCarloSolver::with_config_seeded(config, seed)),
        (false, None) => Box::new(MonteCarloSolver::with_config(config)),
    };

    let mut game = match args.seed {
        Some(seed) => Game::with_seed(seed),
        None => Game::new(),
    };

    println!("{} is playing...", solver.name());
    while game.state() == GameState::Playing {
        let direction = solver.choose_move(&game);
        if !game.apply(direction) {
            break;
        }
        if args.print_every > 0 && game.total_moves() % args.print_every == 0 {
            print!("{}", format_game(&game));
        }
    }

    println!("\nFinal position:");
    print!("{}", format_game(&game));
}

fn run_import(args: &ImportArgs) {
    match general_purpose::STANDARD.decode(&args.data) {
        Ok(bytes) => {
            if bytes.len() != SNAPSHOT_LEN {
                eprintln!(
                    "Invalid data length: expected {} bytes, got {}",
                    SNAPSHOT_LEN,
                    bytes.len()
                );
                return;
            }
            let mut snapshot = [0u8; SNAPSHOT_LEN];
            snapshot.copy_from_slice(&bytes);

            match Game::from_binary(&snapshot) {
                Ok(game) => {
                    print!("{}", format_game(&game));
                    let moves: Vec<&str> = game
                        .available_moves()
                        .iter()
                        .map(|d| d.as_str())
                        .collect();
                    println!("Available moves: {}", moves.join(", "));
                }
                Err(e) => eprintln!("Failed to restore game from data: {}", e),
            }
        }
        Err(e) => eprintln!("Failed to decode base64 data: {}", e),
    }
}