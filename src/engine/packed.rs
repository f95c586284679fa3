//! Bit-packed board representation for the accelerated solver.
//!
//! The 4x4 grid fits in a single u64: 4 bits per cell, row-major, each
//! nibble holding the tile's log2 exponent (0 = empty). Row `r` occupies
//! bits `16*r..16*r+16`, cell `(r, c)` the nibble at bit `4*(4*r+c)`.
//!
//! Everything in this module is a pure function over that word, so the
//! move/merge policy can be verified single-threaded before it is run
//! across thousands of GPU lanes. `shaders/rollout.wgsl` mirrors this file
//! operation for operation; any change here must be made there too.

use crate::board::{Board, Direction, BOARD_DIMENSION, BOARD_SIZE};

/// Largest exponent a 4-bit cell can hold.
pub const MAX_EXPONENT: u32 = 15;
/// 2^11 = 2048, the win threshold.
pub const WIN_EXPONENT: u32 = 11;

/// Packs a grid board into the 64-bit form. A tile above 2^15 cannot be
/// represented and is reported as an error, never truncated.
pub fn encode(board: &Board) -> Result<u64, String> {
    let mut packed = 0u64;
    for r in 0..BOARD_DIMENSION {
        for c in 0..BOARD_DIMENSION {
            let value = board.get(r, c);
            if value == 0 {
                continue;
            }
            let exponent = value.trailing_zeros() as u64;
            if exponent > MAX_EXPONENT as u64 {
                return Err(format!(
                    "Tile {} at ({}, {}) exceeds the packed exponent range",
                    value, r, c
                ));
            }
            packed |= exponent << (4 * (r * BOARD_DIMENSION + c));
        }
    }
    Ok(packed)
}

pub fn decode(packed: u64) -> Board {
    let mut board = Board::empty();
    for i in 0..BOARD_SIZE {
        let exponent = (packed >> (4 * i)) & 0xF;
        if exponent != 0 {
            board.set(i / BOARD_DIMENSION, i % BOARD_DIMENSION, 1u32 << exponent);
        }
    }
    board
}

/// Reflects the board in the main diagonal (nibble shuffle, no loops).
pub const fn transpose(board: u64) -> u64 {
    let keep = board & 0xF0F0_0F0F_F0F0_0F0F;
    let high = board & 0x0000_F0F0_0000_F0F0;
    let low = board & 0x0F0F_0000_0F0F_0000;
    let board = keep | (high << 12) | (low >> 12);

    let keep = board & 0xFF00_FF00_00FF_00FF;
    let high = board & 0x0000_0000_FF00_FF00;
    let low = board & 0x00FF_00FF_0000_0000;
    keep | (high << 24) | (low >> 24)
}

/// Rotates the board by 180 degrees (full nibble reversal).
pub const fn rotate180(board: u64) -> u64 {
    let board = board.swap_bytes();
    ((board << 4) & 0xF0F0_F0F0_F0F0_F0F0) | ((board >> 4) & 0x0F0F_0F0F_0F0F_0F0F)
}

/// Slides one 16-bit row toward nibble 0 with the single-pass pairwise merge
/// policy. Merging increments the exponent; the score delta is the merged
/// tile's value, `2^(k+1)`. Two exponent-15 tiles saturate to 15 instead of
/// wrapping; ordinary play never reaches them (rollouts stop at the 2048 win
/// latch), but restored snapshots can carry such boards.
pub fn slide_row(row: u16) -> (u16, u32, bool) {
    let mut cells = [0u16; BOARD_DIMENSION];
    let mut len = 0;
    for i in 0..BOARD_DIMENSION {
        let cell = (row >> (4 * i)) & 0xF;
        if cell != 0 {
            cells[len] = cell;
            len += 1;
        }
    }

    let mut out = 0u16;
    let mut write = 0;
    let mut score = 0u32;
    let mut i = 0;
    while i < len {
        if i + 1 < len && cells[i] == cells[i + 1] {
            let merged = (cells[i] + 1).min(MAX_EXPONENT as u16);
            out |= merged << (4 * write);
            score += 1u32 << merged;
            i += 2;
        } else {
            out |= cells[i] << (4 * write);
            i += 1;
        }
        write += 1;
    }

    (out, score, out != row)
}

fn slide_left(board: u64) -> (u64, u32, bool) {
    let mut out = 0u64;
    let mut score = 0u32;
    let mut changed = false;
    for r in 0..BOARD_DIMENSION {
        let row = ((board >> (16 * r)) & 0xFFFF) as u16;
        let (new_row, delta, moved) = slide_row(row);
        out |= (new_row as u64) << (16 * r);
        score += delta;
        changed |= moved;
    }
    (out, score, changed)
}

/// Packed twin of `Board::apply_move`. Up/Down/Right are reduced to the Left
/// primitive by transposing/rotating into the left frame and back out; both
/// transforms are involutions and commute, so the same mapping inverts
/// itself.
pub fn apply_move(board: u64, direction: Direction) -> (u64, u32, bool) {
    match direction {
        Direction::Left => slide_left(board),
        Direction::Right => {
            let (slid, score, changed) = slide_left(rotate180(board));
            (rotate180(slid), score, changed)
        }
        Direction::Up => {
            let (slid, score, changed) = slide_left(transpose(board));
            (transpose(slid), score, changed)
        }
        Direction::Down => {
            let (slid, score, changed) = slide_left(rotate180(transpose(board)));
            (transpose(rotate180(slid)), score, changed)
        }
    }
}

/// Zero-nibble count via bit-folding (no per-cell branch).
pub fn count_empty(board: u64) -> u32 {
    let mut folded = board;
    folded |= folded >> 1;
    folded |= folded >> 2;
    folded &= 0x1111_1111_1111_1111;
    BOARD_SIZE as u32 - folded.count_ones()
}

pub fn max_exponent(board: u64) -> u32 {
    let mut max = 0;
    for i in 0..BOARD_SIZE {
        let exponent = ((board >> (4 * i)) & 0xF) as u32;
        if exponent > max {
            max = exponent;
        }
    }
    max
}

/// Legal moves in the same stable order the grid game reports them.
pub fn legal_moves(board: u64) -> Vec<Direction> {
    Direction::ALL
        .iter()
        .copied()
        .filter(|&d| apply_move(board, d).2)
        .collect()
}

/// xorshift32; the per-lane generator of the GPU shader, mirrored here so
/// the CPU fallback and the parity tests follow the identical stream.
pub fn xorshift32(state: &mut u32) -> u32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

/// Uniform spawn into an empty nibble: 2 (exponent 1) with p = 0.9, else 4.
/// Draws the cell first, then the value, matching the shader's call order.
pub fn spawn_tile(board: u64, rng: &mut u32) -> u64 {
    let empties = count_empty(board);
    if empties == 0 {
        return board;
    }
    let target = xorshift32(rng) % empties;
    let exponent: u64 = if xorshift32(rng) % 10 < 9 { 1 } else { 2 };

    let mut seen = 0;
    for i in 0..BOARD_SIZE {
        if (board >> (4 * i)) & 0xF == 0 {
            if seen == target {
                return board | (exponent << (4 * i));
            }
            seen += 1;
        }
    }
    board
}

/// One complete simulation lane, entirely in packed arithmetic: apply the
/// candidate move, then random legal moves until win, dead board or the step
/// cap, and score the end position with the rollout evaluator. This is the
/// scalar reference for the WGSL shader and the CPU fallback when no GPU is
/// available.
pub fn rollout(
    board: u64,
    first_move: Direction,
    seed: u32,
    base_score: u32,
    max_steps: u32,
    empty_weight: f32,
    max_tile_weight: f32,
) -> f32 {
    let mut rng = if seed == 0 { 0x9E37_79B9 } else { seed };
    let mut board = board;
    let mut score = base_score;

    let (next, delta, moved) = apply_move(board, first_move);
    board = next;
    score += delta;
    if moved {
        board = spawn_tile(board, &mut rng);
    }

    let mut steps = 0;
    while steps < max_steps && max_exponent(board) < WIN_EXPONENT {
        let mut legal = [Direction::Up; 4];
        let mut count = 0;
        for direction in Direction::ALL {
            if apply_move(board, direction).2 {
                legal[count] = direction;
                count += 1;
            }
        }
        if count == 0 {
            break;
        }

        let pick = legal[(xorshift32(&mut rng) % count as u32) as usize];
        let (next, delta, _) = apply_move(board, pick);
        board = next;
        score += delta;
        board = spawn_tile(board, &mut rng);
        steps += 1;
    }

    score as f32
        + empty_weight * count_empty(board) as f32
        + max_tile_weight * (1u32 << max_exponent(board)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn transpose_shuffles_nibbles() {
        assert_eq!(transpose(0xFEDC_BA98_7654_3210), 0xFB73_EA62_D951_C840);
        assert_eq!(transpose(transpose(0x0123_4567_89AB_CDEF)), 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn rotate180_reverses_nibbles() {
        assert_eq!(rotate180(0xFEDC_BA98_7654_3210), 0x0123_4567_89AB_CDEF);
        assert_eq!(rotate180(rotate180(0xDEAD_BEEF_0123_4567)), 0xDEAD_BEEF_0123_4567);
    }

    #[test]
    fn transpose_and_rotate_commute() {
        let board = 0x0213_1102_3001_2210;
        assert_eq!(transpose(rotate180(board)), rotate180(transpose(board)));
    }

    #[test]
    fn slide_row_merges_pairwise() {
        // Exponents [1,1,1,1]: two merges, never a cascade.
        let (row, score, moved) = slide_row(0x1111);
        assert_eq!(row, 0x0022);
        assert_eq!(score, 8);
        assert!(moved);

        // [2,1,1,0] from the wall outward: the fresh 2 does not re-merge.
        let (row, score, _) = slide_row(0x0112);
        assert_eq!(row, 0x0022);
        assert_eq!(score, 4);
    }

    #[test]
    fn slide_row_reports_pure_shifts() {
        let (row, score, moved) = slide_row(0x1200);
        assert_eq!(row, 0x0021);
        assert_eq!(score, 0);
        assert!(moved);

        let (row, _, moved) = slide_row(0x0021);
        assert_eq!(row, 0x0021);
        assert!(!moved);
    }

    #[test]
    fn slide_row_saturates_at_the_packed_limit() {
        // Two exponent-15 tiles: the merge clamps to 15 instead of wrapping
        // into the neighbouring nibble. Reachable through restored
        // snapshots, never through ordinary play.
        let (row, score, moved) = slide_row(0x00FF);
        assert_eq!(row, 0x000F);
        assert_eq!(score, 1 << 15);
        assert!(moved);
    }

    #[test]
    fn codec_round_trips() {
        let mut board = Board::empty();
        board.set(0, 0, 2);
        board.set(1, 2, 2048);
        board.set(3, 3, 32768);
        let packed = encode(&board).unwrap();
        assert_eq!(decode(packed), board);
    }

    #[test]
    fn codec_rejects_oversized_tiles() {
        let mut board = Board::empty();
        board.set(2, 2, 65536); // 2^16 does not fit in a nibble
        assert!(encode(&board).is_err());
    }

    fn random_board(rng: &mut StdRng) -> Board {
        let mut board = Board::empty();
        for r in 0..BOARD_DIMENSION {
            for c in 0..BOARD_DIMENSION {
                let exponent: u32 = rng.gen_range(0..=10);
                if exponent > 0 && rng.gen_bool(0.6) {
                    board.set(r, c, 1 << exponent);
                }
            }
        }
        board
    }

    #[test]
    fn packed_moves_match_grid_moves() {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        for _ in 0..500 {
            let board = random_board(&mut rng);
            let packed = encode(&board).unwrap();
            for direction in Direction::ALL {
                let mut grid = board;
                let outcome = grid.apply_move(direction);
                let (packed_after, score, changed) = apply_move(packed, direction);
                assert_eq!(decode(packed_after), grid, "direction {:?}", direction);
                assert_eq!(score, outcome.score_delta, "direction {:?}", direction);
                assert_eq!(changed, outcome.changed, "direction {:?}", direction);
            }
            let expected: Vec<Direction> = Direction::ALL
                .iter()
                .copied()
                .filter(|&d| {
                    let mut grid = board;
                    grid.apply_move(d).changed
                })
                .collect();
            assert_eq!(legal_moves(packed), expected);
        }
    }

    #[test]
    fn empty_count_matches_grid() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..100 {
            let board = random_board(&mut rng);
            let packed = encode(&board).unwrap();
            assert_eq!(count_empty(packed), board.empty_count());
            let max = board.max_tile();
            let expected = if max == 0 { 0 } else { max.trailing_zeros() };
            assert_eq!(max_exponent(packed), expected);
        }
    }

    #[test]
    fn spawn_fills_one_empty_nibble() {
        let mut rng_state = 0x1234_5678u32;
        let mut board = 0u64;
        for expected in 1..=16 {
            board = spawn_tile(board, &mut rng_state);
            assert_eq!(16 - count_empty(board), expected);
        }
        // Full board: spawn is a no-op.
        assert_eq!(spawn_tile(board, &mut rng_state), board);
    }

    #[test]
    fn rollout_is_deterministic_per_seed() {
        let game = crate::game::Game::with_seed(17);
        let packed = encode(game.board()).unwrap();
        let a = rollout(packed, Direction::Left, 42, game.score(), 200, 128.0, 32.0);
        let b = rollout(packed, Direction::Left, 42, game.score(), 200, 128.0, 32.0);
        assert_eq!(a, b);
        assert!(a > 0.0);
    }

    #[test]
    fn rollout_with_zero_steps_scores_the_first_move() {
        // Single row [2,2,0,0]; Left merges for 4 points, then one spawn.
        let packed = 0x0000_0000_0000_0011u64;
        let score = rollout(packed, Direction::Left, 7, 0, 0, 0.0, 0.0);
        assert_eq!(score, 4.0);
    }
}
