use crate::board::{Board, Direction, BOARD_SIZE, WIN_VALUE};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Length of the binary snapshot: 16 exponent bytes, score (u32 LE), state
/// byte, four move counters (u32 LE each).
pub const SNAPSHOT_LEN: usize = BOARD_SIZE + 4 + 1 + 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

impl GameState {
    pub fn to_u8(self) -> u8 {
        match self {
            GameState::Playing => 0,
            GameState::Won => 1,
            GameState::Lost => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(GameState::Playing),
            1 => Some(GameState::Won),
            2 => Some(GameState::Lost),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameState::Playing => "Playing",
            GameState::Won => "Won",
            GameState::Lost => "Lost",
        }
    }
}

/// Per-direction move counters, monotonically non-decreasing within a game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveCounters {
    pub up: u32,
    pub down: u32,
    pub left: u32,
    pub right: u32,
}

impl MoveCounters {
    pub fn total(&self) -> u32 {
        self.up + self.down + self.left + self.right
    }

    fn increment(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.up += 1,
            Direction::Down => self.down += 1,
            Direction::Left => self.left += 1,
            Direction::Right => self.right += 1,
        }
    }

    pub fn get(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }
}

/// One game of 2048: a board, a score, a lifecycle state and the move
/// counters, mutated only through [`Game::apply`].
#[derive(Debug)]
pub struct Game {
    board: Board,
    score: u32,
    state: GameState,
    counters: MoveCounters,
    rng: StdRng,
}

impl Clone for Game {
    /// Deep copy with a fresh RNG. Simulation clones must not replay the
    /// source's spawn stream, or rollouts would be perfectly correlated.
    fn clone(&self) -> Self {
        Game {
            board: self.board,
            score: self.score,
            state: self.state,
            counters: self.counters,
            rng: StdRng::from_entropy(),
        }
    }
}

impl Game {
    pub fn new() -> Self {
        let mut game = Game {
            board: Board::empty(),
            score: 0,
            state: GameState::Playing,
            counters: MoveCounters::default(),
            rng: StdRng::from_entropy(),
        };
        game.reset();
        game
    }

    pub fn with_seed(seed: u64) -> Self {
        let mut game = Game {
            board: Board::empty(),
            score: 0,
            state: GameState::Playing,
            counters: MoveCounters::default(),
            rng: StdRng::seed_from_u64(seed),
        };
        game.reset();
        game
    }

    /// Wraps an existing board into a playable game. Score and counters start
    /// at zero; the lifecycle state is recomputed from the board.
    pub fn from_board(board: Board) -> Self {
        let mut game = Game {
            board,
            score: 0,
            state: GameState::Playing,
            counters: MoveCounters::default(),
            rng: StdRng::from_entropy(),
        };
        game.refresh_state();
        game
    }

    /// Starts a new game in place: empty board, score 0, two spawned tiles.
    pub fn reset(&mut self) {
        self.board = Board::empty();
        self.score = 0;
        self.state = GameState::Playing;
        self.counters = MoveCounters::default();
        self.board.spawn_tile(&mut self.rng);
        self.board.spawn_tile(&mut self.rng);
    }

    /// Deterministic clone for rollouts: same board/score/counters, RNG
    /// seeded from `seed` so a fixed master seed reproduces the search.
    pub fn fork_seeded(&self, seed: u64) -> Self {
        Game {
            board: self.board,
            score: self.score,
            state: self.state,
            counters: self.counters,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn counters(&self) -> &MoveCounters {
        &self.counters
    }

    pub fn max_tile(&self) -> u32 {
        self.board.max_tile()
    }

    pub fn empty_count(&self) -> u32 {
        self.board.empty_count()
    }

    pub fn total_moves(&self) -> u32 {
        self.counters.total()
    }

    /// Applies one move. Returns true when the board changed; a move on a
    /// terminal state or one that shifts nothing is a silent no-op.
    pub fn apply(&mut self, direction: Direction) -> bool {
        if self.state != GameState::Playing {
            return false;
        }

        let outcome = self.board.apply_move(direction);
        if !outcome.changed {
            return false;
        }

        self.score += outcome.score_delta;
        self.counters.increment(direction);
        self.board.spawn_tile(&mut self.rng);
        self.refresh_state();
        true
    }

    /// Legality probe on a private board copy; never mutates the real state.
    pub fn can_apply(&self, direction: Direction) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        let mut probe = self.board;
        probe.apply_move(direction).changed
    }

    /// Legal moves in stable Up, Down, Left, Right order. Empty means the
    /// state is effectively terminal.
    pub fn available_moves(&self) -> Vec<Direction> {
        Direction::ALL
            .iter()
            .copied()
            .filter(|&d| self.can_apply(d))
            .collect()
    }

    // Win takes priority over loss: a move that reaches 2048 on a board with
    // no remaining move is still Won.
    fn refresh_state(&mut self) {
        if self.board.max_tile() >= WIN_VALUE {
            self.state = GameState::Won;
        } else if !self.board.has_legal_move() {
            self.state = GameState::Lost;
        }
    }

    pub fn to_binary(&self) -> [u8; SNAPSHOT_LEN] {
        let mut out = [0u8; SNAPSHOT_LEN];
        out[..BOARD_SIZE].copy_from_slice(&self.board.exponents());
        out[BOARD_SIZE..BOARD_SIZE + 4].copy_from_slice(&self.score.to_le_bytes());
        out[BOARD_SIZE + 4] = self.state.to_u8();
        let counters = [
            self.counters.up,
            self.counters.down,
            self.counters.left,
            self.counters.right,
        ];
        for (i, counter) in counters.iter().enumerate() {
            let offset = BOARD_SIZE + 5 + i * 4;
            out[offset..offset + 4].copy_from_slice(&counter.to_le_bytes());
        }
        out
    }

    pub fn from_binary(binary: &[u8; SNAPSHOT_LEN]) -> Result<Self, String> {
        let mut exponents = [0u8; BOARD_SIZE];
        exponents.copy_from_slice(&binary[..BOARD_SIZE]);
        let board = Board::from_exponents(&exponents)?;

        let score = u32::from_le_bytes(
            binary[BOARD_SIZE..BOARD_SIZE + 4]
                .try_into()
                .map_err(|_| "Invalid score field".to_string())?,
        );
        let state = GameState::from_u8(binary[BOARD_SIZE + 4])
            .ok_or_else(|| format!("Invalid state byte: {}", binary[BOARD_SIZE + 4]))?;

        let mut raw = [0u32; 4];
        for (i, value) in raw.iter_mut().enumerate() {
            let offset = BOARD_SIZE + 5 + i * 4;
            *value = u32::from_le_bytes(
                binary[offset..offset + 4]
                    .try_into()
                    .map_err(|_| "Invalid counter field".to_string())?,
            );
        }

        Ok(Game {
            board,
            score,
            state,
            counters: MoveCounters {
                up: raw[0],
                down: raw[1],
                left: raw[2],
                right: raw[3],
            },
            rng: StdRng::from_entropy(),
        })
    }
}

impl Default for Game {
    fn default() -> Self {
        Game::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BOARD_DIMENSION;

    fn board_from_rows(rows: [[u32; 4]; 4]) -> Board {
        let mut board = Board::empty();
        for r in 0..BOARD_DIMENSION {
            for c in 0..BOARD_DIMENSION {
                board.set(r, c, rows[r][c]);
            }
        }
        board
    }

    #[test]
    fn new_game_has_two_tiles_and_zero_score() {
        for seed in 0..20 {
            let game = Game::with_seed(seed);
            assert_eq!(game.board().tile_count(), 2);
            assert_eq!(game.score(), 0);
            assert_eq!(game.state(), GameState::Playing);
            assert_eq!(game.total_moves(), 0);
        }
    }

    #[test]
    fn tiles_stay_powers_of_two_and_grow_by_one_per_move() {
        let mut game = Game::with_seed(42);
        for step in 0..200 {
            let before = game.board().tile_count();
            let moves = game.available_moves();
            if moves.is_empty() || game.state() != GameState::Playing {
                break;
            }
            let score_before = game.score();
            let changed = game.apply(moves[step % moves.len()]);
            assert!(changed);
            // The spawn adds exactly one tile; each merge removed one. With
            // no merges (score delta 0) the count grows by exactly 1.
            let after = game.board().tile_count();
            assert!(after <= before + 1);
            if game.score() == score_before {
                assert_eq!(after, before + 1);
            }
            for r in 0..BOARD_DIMENSION {
                for c in 0..BOARD_DIMENSION {
                    let v = game.board().get(r, c);
                    assert!(v == 0 || (v >= 2 && v.is_power_of_two()));
                }
            }
        }
    }

    #[test]
    fn rejected_move_changes_nothing() {
        let board = board_from_rows([
            [2, 4, 8, 16],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
        ]);
        let mut game = Game::from_board(board);
        assert!(!game.can_apply(Direction::Up));
        let before_board = *game.board();
        let before_counters = *game.counters();
        assert!(!game.apply(Direction::Up));
        assert_eq!(*game.board(), before_board);
        assert_eq!(game.score(), 0);
        assert_eq!(*game.counters(), before_counters);
    }

    #[test]
    fn available_moves_are_stable_ordered() {
        let board = board_from_rows([
            [0, 0, 0, 0],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
        ]);
        let game = Game::from_board(board);
        assert_eq!(game.available_moves(), vec![Direction::Up]);
    }

    #[test]
    fn full_board_without_pairs_is_lost() {
        let board = board_from_rows([
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ]);
        let game = Game::from_board(board);
        assert_eq!(game.state(), GameState::Lost);
        assert!(game.available_moves().is_empty());
    }

    #[test]
    fn win_takes_priority_over_loss() {
        let board = board_from_rows([
            [2048, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ]);
        let game = Game::from_board(board);
        assert_eq!(game.state(), GameState::Won);
    }

    #[test]
    fn reaching_2048_latches_won() {
        let board = board_from_rows([
            [1024, 1024, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
        ]);
        let mut game = Game::from_board(board);
        assert!(game.apply(Direction::Left));
        assert_eq!(game.state(), GameState::Won);
        assert_eq!(game.score(), 2048);
        // Terminal state ignores further moves.
        let snapshot = *game.board();
        assert!(!game.apply(Direction::Left));
        assert_eq!(*game.board(), snapshot);
    }

    #[test]
    fn counters_track_only_effective_moves() {
        let board = board_from_rows([
            [2, 4, 8, 16],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
        ]);
        let mut game = Game::from_board(board);
        assert!(!game.apply(Direction::Up));
        assert_eq!(game.counters().up, 0);
        assert!(game.apply(Direction::Down));
        assert_eq!(game.counters().down, 1);
        assert_eq!(game.total_moves(), 1);
    }

    #[test]
    fn clones_are_independent() {
        let original = Game::with_seed(5);
        let original_board = *original.board();
        let original_score = original.score();

        let mut clone = original.clone();
        for _ in 0..50 {
            let moves = clone.available_moves();
            if moves.is_empty() {
                break;
            }
            clone.apply(moves[0]);
        }

        assert_eq!(*original.board(), original_board);
        assert_eq!(original.score(), original_score);
        assert_eq!(original.total_moves(), 0);
    }

    #[test]
    fn forked_games_replay_identically() {
        let game = Game::with_seed(9);
        let mut a = game.fork_seeded(1234);
        let mut b = game.fork_seeded(1234);
        for _ in 0..30 {
            let moves = a.available_moves();
            if moves.is_empty() {
                break;
            }
            a.apply(moves[0]);
            b.apply(moves[0]);
        }
        assert_eq!(*a.board(), *b.board());
        assert_eq!(a.score(), b.score());
    }

    #[test]
    fn snapshot_round_trips() {
        let mut game = Game::with_seed(77);
        for _ in 0..40 {
            let moves = game.available_moves();
            if moves.is_empty() {
                break;
            }
            game.apply(moves[0]);
        }
        let binary = game.to_binary();
        let restored = Game::from_binary(&binary).unwrap();
        assert_eq!(*restored.board(), *game.board());
        assert_eq!(restored.score(), game.score());
        assert_eq!(restored.state(), game.state());
        assert_eq!(*restored.counters(), *game.counters());
    }

    #[test]
    fn snapshot_rejects_bad_state_byte() {
        let game = Game::with_seed(3);
        let mut binary = game.to_binary();
        binary[BOARD_SIZE + 4] = 9;
        assert!(Game::from_binary(&binary).is_err());
    }
}
