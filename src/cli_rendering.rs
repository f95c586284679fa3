use crate::board::{Board, BOARD_DIMENSION};
use crate::game::Game;

pub fn format_board(board: &Board) -> String {
    let mut out = String::new();
    out.push_str("┏━━━━━━┳━━━━━━┳━━━━━━┳━━━━━━┓\n");
    for r in 0..BOARD_DIMENSION {
        if r > 0 {
            out.push_str("┣━━━━━━╋━━━━━━╋━━━━━━╋━━━━━━┫\n");
        }
        out.push('┃');
        for c in 0..BOARD_DIMENSION {
            let value = board.get(r, c);
            if value == 0 {
                out.push_str("      ");
            } else {
                out.push_str(&format!("{:^6}", value));
            }
            out.push('┃');
        }
        out.push('\n');
    }
    out.push_str("┗━━━━━━┻━━━━━━┻━━━━━━┻━━━━━━┛\n");
    out
}

pub fn format_game(game: &Game) -> String {
    format!(
        "Score: {}   Moves: {}   State: {}\n{}",
        game.score(),
        game.total_moves(),
        game.state().as_str(),
        format_board(game.board())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_rendering_shows_tile_values() {
        let mut board = Board::empty();
        board.set(0, 0, 2);
        board.set(3, 3, 2048);
        let text = format_board(&board);
        assert!(text.contains("2"));
        assert!(text.contains("2048"));
        assert_eq!(text.lines().count(), 9);
    }

    #[test]
    fn game_rendering_includes_the_header() {
        let game = Game::with_seed(3);
        let text = format_game(&game);
        assert!(text.starts_with("Score: 0"));
        assert!(text.contains("State: Playing"));
    }
}
