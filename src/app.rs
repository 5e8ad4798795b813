//! App: terminal init, main loop, event draining, key and mouse handling.

use crate::RunOptions;
use crate::highscores::{self, HighScores};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use chiseltui::{Coord, GameConfig, GameEvent, Level, Outcome};
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// How long the moves counter highlights after a bonus move.
const MOVES_FLASH_MS: u64 = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    Won,
    Lost,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Restart,
    Exit,
}

impl QuitOption {
    fn next(self) -> Self {
        match self {
            Self::Resume => Self::Restart,
            Self::Restart => Self::Exit,
            Self::Exit => Self::Resume,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Resume => Self::Exit,
            Self::Restart => Self::Resume,
            Self::Exit => Self::Restart,
        }
    }
}

/// Presentation-only state the UI needs besides the level itself.
#[derive(Default)]
pub struct Presentation {
    pub cursor: Coord,
    pub show_guide: bool,
    /// Cells that broke and have not finished fading out.
    pub breaking: Vec<Coord>,
    /// Fade started (cells disabled); until then broken cells flash.
    pub fading: bool,
    pub break_effect: Option<Effect>,
    pub break_effect_time: Option<Instant>,
    pub moves_flash_until: Option<Instant>,
    pub new_record: bool,
}

pub struct App {
    config: GameConfig,
    options: RunOptions,
    theme: Theme,
    level: Level,
    /// Restarts of the current level; mixed into the seed so each retry gets a fresh board.
    attempt: u64,
    screen: Screen,
    quit_selected: QuitOption,
    view: Presentation,
    high_scores: HighScores,
    last_tick: Instant,
}

impl App {
    pub fn new(config: GameConfig, options: RunOptions, theme: Theme) -> Result<Self> {
        let level = Level::new(&config, options.start_level, options.seed)?;
        let mut app = Self {
            config,
            options,
            theme,
            level,
            attempt: 0,
            screen: Screen::Playing,
            quit_selected: QuitOption::Resume,
            view: Presentation::default(),
            high_scores: highscores::load_high_scores(),
            last_tick: Instant::now(),
        };
        app.enter_level();
        Ok(app)
    }

    fn seed_for(&self, index: usize) -> u64 {
        self.options
            .seed
            .wrapping_add(index as u64)
            .wrapping_add(self.attempt.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn load_level(&mut self, index: usize) -> Result<()> {
        self.level = Level::new(&self.config, index, self.seed_for(index))?;
        self.enter_level();
        Ok(())
    }

    fn enter_level(&mut self) {
        self.screen = if self.level.outcome() == Outcome::Lost {
            Screen::Lost
        } else {
            Screen::Playing
        };
        self.view = Presentation {
            show_guide: self.view.show_guide,
            ..Presentation::default()
        };
        if self.options.tutorial {
            self.level.open_tutorial();
        }
        self.last_tick = Instant::now();
    }

    fn restart(&mut self) -> Result<()> {
        self.attempt = self.attempt.wrapping_add(1);
        self.load_level(self.level.index())
    }

    fn next_level(&mut self) -> Result<()> {
        self.attempt = 0;
        let next = self.config.next_level_index(self.level.index());
        self.load_level(next)
    }

    /// React to everything the level reported since the last frame.
    fn handle_events(&mut self, now: Instant) {
        for ev in self.level.drain_events() {
            match ev {
                GameEvent::BlockBroken { coord } => {
                    self.view.breaking.push(coord);
                    self.view.fading = false;
                    self.view.break_effect = None;
                    self.view.break_effect_time = None;
                }
                GameEvent::BlockDisabled { .. } => {
                    if self.options.no_animation {
                        self.view.breaking.clear();
                    } else {
                        self.view.fading = true;
                    }
                }
                GameEvent::BonusMoveGranted => {
                    self.view.moves_flash_until = Some(now + Duration::from_millis(MOVES_FLASH_MS));
                }
                GameEvent::MultiplierChanged(m) => log::debug!("multiplier x{}", m),
                GameEvent::Won => {
                    self.finish_level();
                    self.screen = Screen::Won;
                }
                GameEvent::Lost => {
                    self.finish_level();
                    self.screen = Screen::Lost;
                }
                GameEvent::HealthChanged { .. }
                | GameEvent::ScoreChanged(_)
                | GameEvent::ComboTooltip { .. }
                | GameEvent::TooltipExpired
                | GameEvent::MovesChanged(_) => {}
            }
        }
    }

    fn finish_level(&mut self) {
        let score = self.level.score();
        self.view.new_record = highscores::record(&mut self.high_scores, self.level.name(), score);
        if self.view.new_record {
            if let Err(e) = highscores::save_high_scores(&self.high_scores) {
                log::warn!("could not save high scores: {}", e);
            }
        }
    }

    fn move_cursor(&mut self, dx: i32, dy: i32) {
        let grid = self.level.grid();
        let x = (i32::from(self.view.cursor.x) + dx).clamp(0, i32::from(grid.width.saturating_sub(1)));
        let y = (i32::from(self.view.cursor.y) + dy).clamp(0, i32::from(grid.height.saturating_sub(1)));
        self.view.cursor = Coord::new(x as u16, y as u16);
    }

    fn break_at(&mut self, coord: Coord) {
        self.view.cursor = coord;
        if self.level.click(coord) {
            log::debug!("click ({}, {}), {} moves left", coord.x, coord.y, self.level.moves());
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.options.frame_rate);
        let mut area = Rect::default();
        loop {
            let now = Instant::now();

            if self.screen != Screen::QuitMenu && !self.level.is_paused() {
                let dt = now.saturating_duration_since(self.last_tick);
                self.level.tick(dt);
            }
            self.last_tick = now;
            self.handle_events(now);

            if self
                .view
                .break_effect
                .as_ref()
                .is_some_and(tachyonfx::Effect::done)
            {
                self.view.breaking.clear();
                self.view.break_effect = None;
                self.view.break_effect_time = None;
                self.view.fading = false;
            }

            terminal.draw(|f| {
                area = f.area();
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.level,
                    &self.theme,
                    &mut self.view,
                    &self.high_scores,
                    if self.screen == Screen::QuitMenu { Some(self.quit_selected) } else { None },
                    self.options.no_animation,
                    now,
                );
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if !self.on_action(key_to_action(key))? {
                            return Ok(());
                        }
                    }
                    Event::Mouse(MouseEvent {
                        kind: MouseEventKind::Down(MouseButton::Left),
                        column,
                        row,
                        ..
                    }) => {
                        if self.screen == Screen::Playing {
                            if let Some(c) = crate::ui::cell_at(area, self.level.grid(), column, row) {
                                self.break_at(c);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Apply one action. Returns Ok(false) when the app should exit.
    fn on_action(&mut self, action: Action) -> Result<bool> {
        match self.screen {
            Screen::Playing if self.level.tutorial_page().is_some() => match action {
                Action::Select | Action::Right => self.level.next_tutorial_page(),
                Action::Quit | Action::Tutorial => self.level.close_tutorial(),
                _ => {}
            },
            Screen::Playing if self.level.is_paused() => match action {
                Action::Pause => self.level.set_paused(false),
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                _ => {}
            },
            Screen::Playing => match action {
                Action::Up => self.move_cursor(0, -1),
                Action::Down => self.move_cursor(0, 1),
                Action::Left => self.move_cursor(-1, 0),
                Action::Right => self.move_cursor(1, 0),
                Action::Select => self.break_at(self.view.cursor),
                Action::ToggleGuide => self.view.show_guide = !self.view.show_guide,
                Action::Tutorial => self.level.open_tutorial(),
                Action::Pause => self.level.set_paused(true),
                Action::Restart => self.restart()?,
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                Action::None => {}
            },
            Screen::QuitMenu => match action {
                Action::Down | Action::Right => self.quit_selected = self.quit_selected.next(),
                Action::Up | Action::Left => self.quit_selected = self.quit_selected.prev(),
                Action::Select => match self.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::Restart => self.restart()?,
                    QuitOption::Exit => return Ok(false),
                },
                Action::Pause | Action::Quit => self.screen = Screen::Playing,
                _ => {}
            },
            Screen::Won => match action {
                Action::Select => self.next_level()?,
                Action::Restart => self.restart()?,
                Action::Quit => return Ok(false),
                _ => {}
            },
            Screen::Lost => match action {
                Action::Select | Action::Restart => self.restart()?,
                Action::Quit => return Ok(false),
                _ => {}
            },
        }
        Ok(true)
    }
}
