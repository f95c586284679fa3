use rand::Rng;

pub const BOARD_DIMENSION: usize = 4; // 4x4 board
pub const BOARD_SIZE: usize = BOARD_DIMENSION * BOARD_DIMENSION; // Total number of cells
pub const WIN_VALUE: u32 = 2048;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Stable enumeration order used everywhere moves are listed.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    pub fn to_u8(self) -> u8 {
        self.index() as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }
}

/// Result of applying one directional move to a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    pub score_delta: u32,
    pub changed: bool,
}

/// A 4x4 grid of tile values. 0 = empty; non-zero cells are powers of two >= 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Board {
    cells: [[u32; BOARD_DIMENSION]; BOARD_DIMENSION],
}

impl Board {
    pub fn empty() -> Self {
        Board {
            cells: [[0; BOARD_DIMENSION]; BOARD_DIMENSION],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: u32) {
        self.cells[row][col] = value;
    }

    /// Slides and merges tiles toward `direction`, accumulating the score of
    /// every merge. The board is left untouched when nothing can move.
    pub fn apply_move(&mut self, direction: Direction) -> MoveOutcome {
        let mut score_delta = 0;
        let mut changed = false;

        for line_idx in 0..BOARD_DIMENSION {
            let mut line = [0u32; BOARD_DIMENSION];
            for offset in 0..BOARD_DIMENSION {
                let (r, c) = line_cell(direction, line_idx, offset);
                line[offset] = self.cells[r][c];
            }

            let (new_line, delta, moved) = process_line(line);

            for offset in 0..BOARD_DIMENSION {
                let (r, c) = line_cell(direction, line_idx, offset);
                self.cells[r][c] = new_line[offset];
            }

            score_delta += delta;
            if moved {
                changed = true;
            }
        }

        MoveOutcome {
            score_delta,
            changed,
        }
    }

    /// Inserts a 2 (90%) or 4 (10%) into a uniformly chosen empty cell.
    /// Returns false when the board is full.
    pub fn spawn_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return false;
        }
        let (r, c) = empty[rng.gen_range(0..empty.len())];
        self.cells[r][c] = if rng.gen_range(0..10) < 9 { 2 } else { 4 };
        true
    }

    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut empty = Vec::new();
        for r in 0..BOARD_DIMENSION {
            for c in 0..BOARD_DIMENSION {
                if self.cells[r][c] == 0 {
                    empty.push((r, c));
                }
            }
        }
        empty
    }

    pub fn empty_count(&self) -> u32 {
        let mut count = 0;
        for row in &self.cells {
            for &cell in row {
                if cell == 0 {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn tile_count(&self) -> u32 {
        BOARD_SIZE as u32 - self.empty_count()
    }

    pub fn max_tile(&self) -> u32 {
        let mut max = 0;
        for row in &self.cells {
            for &cell in row {
                if cell > max {
                    max = cell;
                }
            }
        }
        max
    }

    /// True while at least one move would change the board: an empty cell
    /// exists or two equal tiles are orthogonally adjacent.
    pub fn has_legal_move(&self) -> bool {
        if self.empty_count() > 0 {
            return true;
        }
        for r in 0..BOARD_DIMENSION {
            for c in 0..BOARD_DIMENSION - 1 {
                if self.cells[r][c] == self.cells[r][c + 1] {
                    return true;
                }
            }
        }
        for r in 0..BOARD_DIMENSION - 1 {
            for c in 0..BOARD_DIMENSION {
                if self.cells[r][c] == self.cells[r + 1][c] {
                    return true;
                }
            }
        }
        false
    }

    /// Cells as log2 exponents (0 = empty), row-major.
    pub fn exponents(&self) -> [u8; BOARD_SIZE] {
        let mut out = [0u8; BOARD_SIZE];
        for r in 0..BOARD_DIMENSION {
            for c in 0..BOARD_DIMENSION {
                let v = self.cells[r][c];
                if v != 0 {
                    out[r * BOARD_DIMENSION + c] = v.trailing_zeros() as u8;
                }
            }
        }
        out
    }

    pub fn from_exponents(exponents: &[u8; BOARD_SIZE]) -> Result<Self, String> {
        let mut board = Board::empty();
        for (i, &k) in exponents.iter().enumerate() {
            if k == 0 {
                continue;
            }
            if !(1..=17).contains(&k) {
                return Err(format!("Invalid tile exponent {} at cell {}", k, i));
            }
            board.cells[i / BOARD_DIMENSION][i % BOARD_DIMENSION] = 1u32 << k;
        }
        Ok(board)
    }
}

/// Maps (line index, offset along the line) to grid coordinates so that
/// offset 0 is always the cell against the wall being moved toward.
fn line_cell(direction: Direction, line: usize, offset: usize) -> (usize, usize) {
    match direction {
        Direction::Left => (line, offset),
        Direction::Right => (line, BOARD_DIMENSION - 1 - offset),
        Direction::Up => (offset, line),
        Direction::Down => (BOARD_DIMENSION - 1 - offset, line),
    }
}

/// Compacts a line toward index 0, then merges equal neighbours in a single
/// left-to-right pass. A merged tile never merges again in the same move, so
/// [2,2,2,2] becomes [4,4,0,0].
fn process_line(line: [u32; BOARD_DIMENSION]) -> ([u32; BOARD_DIMENSION], u32, bool) {
    let mut compacted = [0u32; BOARD_DIMENSION];
    let mut len = 0;
    for &v in &line {
        if v != 0 {
            compacted[len] = v;
            len += 1;
        }
    }

    let mut result = [0u32; BOARD_DIMENSION];
    let mut write = 0;
    let mut delta = 0;
    let mut i = 0;
    while i < len {
        if i + 1 < len && compacted[i] == compacted[i + 1] {
            let merged = compacted[i] * 2;
            result[write] = merged;
            delta += merged;
            i += 2;
        } else {
            result[write] = compacted[i];
            i += 1;
        }
        write += 1;
    }

    (result, delta, result != line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board_from_rows(rows: [[u32; 4]; 4]) -> Board {
        let mut board = Board::empty();
        for r in 0..4 {
            for c in 0..4 {
                board.set(r, c, rows[r][c]);
            }
        }
        board
    }

    #[test]
    fn merge_is_pairwise_left_to_right() {
        let (line, delta, moved) = process_line([2, 2, 2, 2]);
        assert_eq!(line, [4, 4, 0, 0]);
        assert_eq!(delta, 8);
        assert!(moved);
    }

    #[test]
    fn merged_tile_does_not_remerge() {
        let (line, delta, _) = process_line([4, 2, 2, 0]);
        assert_eq!(line, [4, 4, 0, 0]);
        assert_eq!(delta, 4);
    }

    #[test]
    fn compaction_without_merge_counts_as_moved() {
        let (line, delta, moved) = process_line([0, 2, 0, 4]);
        assert_eq!(line, [2, 4, 0, 0]);
        assert_eq!(delta, 0);
        assert!(moved);
    }

    #[test]
    fn unchanged_line_is_not_moved() {
        let (line, delta, moved) = process_line([2, 4, 8, 0]);
        assert_eq!(line, [2, 4, 8, 0]);
        assert_eq!(delta, 0);
        assert!(!moved);
    }

    #[test]
    fn row_moves_left_and_right() {
        let mut board = board_from_rows([[0, 2, 2, 0], [0; 4], [0; 4], [0; 4]]);
        let outcome = board.apply_move(Direction::Left);
        assert_eq!(board.get(0, 0), 4);
        assert_eq!(board.get(0, 1), 0);
        assert_eq!(outcome.score_delta, 4);
        assert!(outcome.changed);

        let mut board = board_from_rows([[0, 2, 2, 0], [0; 4], [0; 4], [0; 4]]);
        let outcome = board.apply_move(Direction::Right);
        assert_eq!(board.get(0, 3), 4);
        assert_eq!(board.get(0, 2), 0);
        assert_eq!(outcome.score_delta, 4);
        assert!(outcome.changed);
    }

    #[test]
    fn column_moves_toward_wall() {
        let mut board = board_from_rows([[2, 0, 0, 0], [2, 0, 0, 0], [4, 0, 0, 0], [0; 4]]);
        let outcome = board.apply_move(Direction::Down);
        assert_eq!(board.get(3, 0), 4);
        assert_eq!(board.get(2, 0), 4);
        assert_eq!(board.get(1, 0), 0);
        assert_eq!(outcome.score_delta, 4);
    }

    #[test]
    fn full_board_without_pairs_has_no_move() {
        let board = board_from_rows([
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ]);
        assert!(!board.has_legal_move());
        for direction in Direction::ALL {
            let mut copy = board;
            assert!(!copy.apply_move(direction).changed);
        }
    }

    #[test]
    fn spawn_fills_exactly_one_empty_cell() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut board = Board::empty();
        for expected in 1..=16u32 {
            assert!(board.spawn_tile(&mut rng));
            assert_eq!(board.tile_count(), expected);
        }
        assert!(!board.spawn_tile(&mut rng));
    }

    #[test]
    fn spawned_values_are_two_or_four() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let mut board = Board::empty();
            board.spawn_tile(&mut rng);
            let v = board.max_tile();
            assert!(v == 2 || v == 4);
        }
    }

    #[test]
    fn exponents_round_trip() {
        let board = board_from_rows([[2, 0, 8, 0], [0, 2048, 0, 4], [0; 4], [0, 0, 0, 131072]]);
        let exps = board.exponents();
        assert_eq!(exps[0], 1);
        assert_eq!(exps[5], 11);
        assert_eq!(exps[15], 17);
        assert_eq!(Board::from_exponents(&exps).unwrap(), board);
    }

    #[test]
    fn invalid_exponent_is_rejected() {
        let mut exps = [0u8; BOARD_SIZE];
        exps[3] = 18;
        assert!(Board::from_exponents(&exps).is_err());
    }
}
