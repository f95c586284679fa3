use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use mc2048::board::Direction;
use mc2048::engine::{EngineConfig, GpuMonteCarloSolver};
use mc2048::game::{Game, SNAPSHOT_LEN};
use mc2048::solver::Solver;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};

// Shared solver state. The game itself is stateless: every request carries
// the full 37-byte snapshot.
struct AppState {
    solver: Mutex<GpuMonteCarloSolver>,
}

#[tokio::main]
async fn main() {
    let config = EngineConfig {
        simulations_per_move: 1000,
        gpu_batch_size: 2048,
        ..EngineConfig::default()
    };
    let solver = GpuMonteCarloSolver::with_config(config);
    if solver.gpu_available() {
        println!("✓ Solver initialized with GPU rollouts");
    } else {
        println!("✓ Solver initialized (CPU rollouts)");
    }

    let state = Arc::new(AppState {
        solver: Mutex::new(solver),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/new", get(new_game))
        .route("/moves", post(post_moves))
        .route("/play", post(play_move))
        .route("/solver-move", post(solver_move))
        .with_state(state)
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    println!("Listening on {}", addr);
    axum::serve(listener, app).await.unwrap();
}

async fn new_game() -> impl IntoResponse {
    let game = Game::new();
    (StatusCode::OK, game.to_binary().to_vec())
}

fn game_from_payload(payload: &[u8]) -> Result<Game, StatusCode> {
    if payload.len() != SNAPSHOT_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut snapshot = [0u8; SNAPSHOT_LEN];
    snapshot.copy_from_slice(payload);
    Game::from_binary(&snapshot).map_err(|_| StatusCode::BAD_REQUEST)
}

async fn post_moves(payload: Bytes) -> Result<Vec<u8>, StatusCode> {
    let game = game_from_payload(&payload)?;
    Ok(game
        .available_moves()
        .iter()
        .map(|d| d.to_u8())
        .collect())
}

/// Snapshot followed by one direction byte. An ineffective move is not an
/// error; the unchanged snapshot comes back.
async fn play_move(payload: Bytes) -> Result<Vec<u8>, StatusCode> {
    if payload.len() != SNAPSHOT_LEN + 1 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut game = game_from_payload(&payload[..SNAPSHOT_LEN])?;
    let direction =
        Direction::from_u8(payload[SNAPSHOT_LEN]).ok_or(StatusCode::BAD_REQUEST)?;
    game.apply(direction);
    Ok(game.to_binary().to_vec())
}

async fn solver_move(
    State(state): State<Arc<AppState>>,
    payload: Bytes,
) -> Result<Vec<u8>, StatusCode> {
    let game = game_from_payload(&payload)?;

    let mut solver = state
        .solver
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let direction = solver.choose_move(&game);

    Ok(vec![direction.to_u8()])
}
