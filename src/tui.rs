use crate::board::{Direction, BOARD_DIMENSION};
use crate::engine::MonteCarloSolver;
use crate::game::{Game, GameState};
use crate::solver::Solver;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color as RatatuiColor, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;

pub struct App {
    game: Game,
    solver: MonteCarloSolver,
    hint: Option<Direction>,
}

impl App {
    pub fn new() -> Self {
        App::from_game(Game::new())
    }

    pub fn from_game(game: Game) -> Self {
        App {
            game,
            solver: MonteCarloSolver::new(),
            hint: None,
        }
    }

    pub fn handle_direction(&mut self, direction: Direction) {
        if self.game.apply(direction) {
            self.hint = None;
        }
    }

    pub fn new_game(&mut self) {
        self.game = Game::new();
        self.hint = None;
    }

    pub fn request_hint(&mut self) {
        if self.game.state() == GameState::Playing {
            self.hint = Some(self.solver.choose_move(&self.game));
        }
    }

    pub fn auto_move(&mut self) {
        if self.game.state() == GameState::Playing {
            let direction = self.solver.choose_move(&self.game);
            self.game.apply(direction);
            self.hint = None;
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

pub fn run_tui(game: Option<Game>) -> Result<Game, Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = if let Some(game) = game {
        App::from_game(game)
    } else {
        App::new()
    };

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(app.game)
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char('n') => app.new_game(),
                    KeyCode::Char('h') => app.request_hint(),
                    KeyCode::Char('a') => app.auto_move(),
                    KeyCode::Up => app.handle_direction(Direction::Up),
                    KeyCode::Down => app.handle_direction(Direction::Down),
                    KeyCode::Left => app.handle_direction(Direction::Left),
                    KeyCode::Right => app.handle_direction(Direction::Right),
                    _ => {}
                }
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(12),   // Board
            Constraint::Length(4), // Instructions
        ])
        .split(f.area());

    let title = match app.game.state() {
        GameState::Playing => match app.hint {
            Some(direction) => format!(
                "Score: {}   Solver suggests: {}",
                app.game.score(),
                direction.as_str()
            ),
            None => format!("Score: {}", app.game.score()),
        },
        GameState::Won => format!("🎉 YOU WIN! Score: {} 🎉", app.game.score()),
        GameState::Lost => format!("GAME OVER - Score: {}", app.game.score()),
    };

    let title_paragraph = Paragraph::new(title)
        .block(Block::default().borders(Borders::ALL).title("2048"))
        .alignment(Alignment::Center);
    f.render_widget(title_paragraph, chunks[0]);

    render_board(f, app, chunks[1]);

    let instructions = vec![
        Line::from(vec![
            Span::raw("Use "),
            Span::styled("Arrow Keys", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" to move, "),
            Span::styled("H", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" for a hint, "),
            Span::styled("A", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" for a solver move"),
        ]),
        Line::from(vec![
            Span::styled("N", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" for a new game, "),
            Span::styled("Q", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" to quit"),
        ]),
    ];

    let instructions_paragraph = Paragraph::new(instructions)
        .block(Block::default().borders(Borders::ALL).title("Controls"))
        .alignment(Alignment::Center);
    f.render_widget(instructions_paragraph, chunks[2]);
}

fn tile_style(value: u32) -> Style {
    let color = match value {
        2 => RatatuiColor::Gray,
        4 => RatatuiColor::White,
        8 => RatatuiColor::LightYellow,
        16 => RatatuiColor::Yellow,
        32 => RatatuiColor::LightRed,
        64 => RatatuiColor::Red,
        128 | 256 => RatatuiColor::LightGreen,
        512 | 1024 => RatatuiColor::Green,
        2048 => RatatuiColor::LightCyan,
        _ => RatatuiColor::Cyan,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn render_board(f: &mut Frame, app: &App, area: Rect) {
    let board = app.game.board();

    let board_area = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };

    let block = Block::default().borders(Borders::ALL).title("Board");
    f.render_widget(block, area);

    let mut board_lines = Vec::new();
    board_lines.push(Line::from("   ┏━━━━━━┳━━━━━━┳━━━━━━┳━━━━━━┓"));

    for r in 0..BOARD_DIMENSION {
        if r > 0 {
            board_lines.push(Line::from("   ┣━━━━━━╋━━━━━━╋━━━━━━╋━━━━━━┫"));
        }

        let mut row_spans = vec![Span::raw("   ┃")];
        for c in 0..BOARD_DIMENSION {
            let value = board.get(r, c);
            if value == 0 {
                row_spans.push(Span::raw("      "));
            } else {
                row_spans.push(Span::styled(format!("{:^6}", value), tile_style(value)));
            }
            row_spans.push(Span::raw("┃"));
        }
        board_lines.push(Line::from(row_spans));
    }

    board_lines.push(Line::from("   ┗━━━━━━┻━━━━━━┻━━━━━━┻━━━━━━┛"));
    board_lines.push(Line::from(Span::styled(
        format!("        Moves: {}", app.game.total_moves()),
        Style::default().add_modifier(Modifier::BOLD),
    )));

    let board_paragraph = Paragraph::new(board_lines).alignment(Alignment::Left);
    f.render_widget(board_paragraph, board_area);
}
