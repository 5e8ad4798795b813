//! Layout and drawing: board, sidebar (stats, combo bar, tasks, colour guide), tooltip and overlays.

use crate::app::{Presentation, QuitOption, Screen};
use crate::highscores::HighScores;
use crate::theme::Theme;
use chiseltui::grid::Grid;
use chiseltui::{Coord, Level};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal cells per block: CELL_W - 1 columns painted plus a 1-column gap.
const CELL_W: u16 = 4;
const CELL_H: u16 = 2;
const SIDEBAR_WIDTH: u16 = 28;

/// Duration of the break fade (TachyonFX) in ms.
const BREAK_FADE_MS: u32 = 350;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// Board size in terminal cells including the border.
fn board_outer_size(grid: &Grid) -> (u16, u16) {
    (
        grid.width.saturating_mul(CELL_W).saturating_add(1),
        grid.height.saturating_mul(CELL_H).saturating_add(2),
    )
}

/// Smallest terminal (cols, rows) that shows the whole board and the sidebar.
fn min_terminal_size(grid: &Grid) -> (u16, u16) {
    let (bw, bh) = board_outer_size(grid);
    (bw.saturating_add(SIDEBAR_WIDTH), bh)
}

fn fits_terminal(area: Rect, grid: &Grid) -> bool {
    let (w, h) = min_terminal_size(grid);
    area.width >= w && area.height >= h
}

/// True when `r` lies entirely inside `outer`.
fn fits(outer: Rect, r: Rect) -> bool {
    r.x >= outer.x && r.y >= outer.y && r.right() <= outer.right() && r.bottom() <= outer.bottom()
}

/// Board outer rect and sidebar rect, centred in `area`. Shared by drawing and mouse mapping.
fn game_layout(area: Rect, grid: &Grid) -> (Rect, Rect) {
    let (bw, bh) = board_outer_size(grid);
    let total_w = bw + SIDEBAR_WIDTH;
    let total_h = bh.max(24);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let board = Rect {
        height: bh.min(inner[0].height),
        ..inner[0]
    };
    (board, inner[1])
}

/// Inner board rect (inside the border) where cells are painted.
fn board_inner(area: Rect, grid: &Grid) -> Rect {
    let (outer, _) = game_layout(area, grid);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    }
}

/// Terminal rect of one grid cell (painted part only).
fn cell_rect(inner: Rect, c: Coord) -> Rect {
    Rect {
        x: inner.x.saturating_add(c.x.saturating_mul(CELL_W)),
        y: inner.y.saturating_add(c.y.saturating_mul(CELL_H)),
        width: CELL_W - 1,
        height: CELL_H,
    }
}

/// Map a mouse position to the grid cell under it. The gap column belongs to no cell,
/// and nothing maps while the board does not fit the terminal.
pub fn cell_at(area: Rect, grid: &Grid, column: u16, row: u16) -> Option<Coord> {
    if !fits_terminal(area, grid) {
        return None;
    }
    let inner = board_inner(area, grid);
    if !inner.contains(Position::new(column, row)) {
        return None;
    }
    let (dx, dy) = (column - inner.x, row - inner.y);
    if dx % CELL_W == CELL_W - 1 {
        return None;
    }
    let c = Coord::new(dx / CELL_W, dy / CELL_H);
    (c.x < grid.width && c.y < grid.height && fits(inner, cell_rect(inner, c))).then_some(c)
}

/// Draw current screen, with overlays. Runs the break fade (TachyonFX) unless `no_animation`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    level: &Level,
    theme: &Theme,
    view: &mut Presentation,
    high_scores: &HighScores,
    quit_selected: Option<QuitOption>,
    no_animation: bool,
    now: Instant,
) {
    let area = frame.area();
    if !fits_terminal(area, level.grid()) {
        draw_too_small(frame, theme, area, min_terminal_size(level.grid()));
        if let (Screen::QuitMenu, Some(opt)) = (screen, quit_selected) {
            draw_quit_menu(frame, theme, opt);
        }
        return;
    }
    draw_game(frame, level, theme, view, high_scores, area, now);
    if view.fading && !view.breaking.is_empty() && !no_animation {
        apply_break_effect(frame, level, theme, view, area, now);
    }
    if let Some((page, count, text)) = level.tutorial_page() {
        draw_tutorial(frame, theme, area, page, count, text);
    } else if level.is_paused() && screen == Screen::Playing {
        draw_pause_overlay(frame, theme, area);
    }
    match screen {
        Screen::Won | Screen::Lost => draw_outcome(frame, level, theme, view, high_scores, area, screen),
        Screen::QuitMenu => {
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::Playing => {}
    }
}

/// Create or continue the fade of broken cells to the background.
fn apply_break_effect(
    frame: &mut Frame,
    level: &Level,
    theme: &Theme,
    view: &mut Presentation,
    area: Rect,
    now: Instant,
) {
    let inner = board_inner(area, level.grid());
    let delta = view
        .break_effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    view.break_effect_time = Some(now);

    if view.break_effect.is_none() {
        let mut positions = HashSet::new();
        for &c in &view.breaking {
            let r = cell_rect(inner, c);
            for x in r.x..r.x + r.width {
                for y in r.y..r.y + r.height {
                    positions.insert((x, y));
                }
            }
        }
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect: Effect = fx::fade_to(bg, bg, (BREAK_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(inner);
        view.break_effect = Some(effect);
    }

    if let Some(effect) = view.break_effect.as_mut() {
        frame.render_effect(effect, inner, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_game(
    frame: &mut Frame,
    level: &Level,
    theme: &Theme,
    view: &Presentation,
    high_scores: &HighScores,
    area: Rect,
    now: Instant,
) {
    let (board, sidebar) = game_layout(area, level.grid());
    draw_board(frame, level, theme, view, board);
    draw_sidebar(frame, level, theme, view, high_scores, sidebar, now);
}

fn draw_board(frame: &mut Frame, level: &Level, theme: &Theme, view: &Presentation, area: Rect) {
    let title = format!(" Chisel  | {}: {} ", level.index() + 1, level.name());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let grid = level.grid();
    let breaking: HashSet<Coord> = view.breaking.iter().copied().collect();
    let buf = frame.buffer_mut();

    // Background first so gaps and holes match the board.
    for y in inner.y..inner.y + inner.height {
        for x in inner.x..inner.x + inner.width {
            buf[(x, y)].set_symbol(" ").set_style(Style::default().bg(theme.bg));
        }
    }

    for b in grid.blocks() {
        let r = cell_rect(inner, b.coord);
        if !fits(inner, r) {
            continue;
        }
        let color = if b.is_active() {
            theme.tier_color(b.health)
        } else if breaking.contains(&b.coord) {
            Color::White
        } else {
            continue;
        };
        for y in r.y..r.y + r.height {
            for x in r.x..r.x + r.width {
                buf[(x, y)].set_symbol(" ").set_style(Style::default().bg(color));
            }
        }
        if view.show_guide && b.is_active() {
            let label = b.health.to_string();
            buf.set_string(r.x + 1, r.y, label, Style::default().fg(Color::Black).bg(color));
        }
    }

    // Cursor: corner markers around the selected cell.
    let c = view.cursor;
    let r = cell_rect(inner, c);
    if c.x < grid.width && c.y < grid.height && fits(inner, r) {
        let under = grid
            .active_at(c)
            .map_or(theme.bg, |b| theme.tier_color(b.health));
        let fg = if grid.active_at(c).is_some() { Color::Black } else { theme.inactive_fg };
        let style = Style::default().fg(fg).bg(under).add_modifier(Modifier::BOLD);
        buf.set_string(r.x, r.y, "▛", style);
        buf.set_string(r.x + r.width - 1, r.y + r.height - 1, "▟", style);
    }

    // Floating combo score over the clicked block.
    if let Some(tip) = level.tooltip().filter(|t| fits(inner, cell_rect(inner, t.at))) {
        let r = cell_rect(inner, tip.at);
        let label = format!("+{}", tip.amount);
        let x = r.x.min(inner.right().saturating_sub(label.len() as u16)).max(inner.x);
        let y = r.y.saturating_sub(1).max(inner.y);
        let style = Style::default().fg(Color::Yellow).bg(theme.bg).add_modifier(Modifier::BOLD);
        buf.set_string(x, y, label, style);
    }
}

fn draw_sidebar(
    frame: &mut Frame,
    level: &Level,
    theme: &Theme,
    view: &Presentation,
    high_scores: &HighScores,
    area: Rect,
    now: Instant,
) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);
    let best = high_scores.get(level.name()).copied().unwrap_or(0).max(level.score());
    let guide_rows = if view.show_guide { theme.tiers.len() as u16 + 2 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Stats
            Constraint::Length(5), // Combo
            Constraint::Length(level.tasks().len() as u16 + 3), // Tasks
            Constraint::Length(guide_rows),
            Constraint::Fill(1),
        ])
        .split(area);

    // --- Stats: score, best, moves ---
    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let moves_style = if view.moves_flash_until.is_some_and(|t| now < t) {
        Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD)
    } else if level.moves() <= 3 {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        fg_style
    };
    let stats = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(level.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best:  ", title_style),
            Span::styled(best.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Moves: ", title_style),
            Span::styled(format!(" {} ", level.moves()), moves_style),
        ]),
    ];
    Paragraph::new(Text::from(stats)).render(stats_inner, frame.buffer_mut());

    // --- Combo: multiplier and streak above, charge bar below ---
    let combo = level.combo();
    let combo_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let combo_inner = combo_block.inner(chunks[1]);
    combo_block.render(chunks[1], frame.buffer_mut());
    let combo_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(combo_inner);
    Paragraph::new(Line::from(Span::styled(
        format!("Combo x{}", combo.multiplier()),
        title_style.add_modifier(Modifier::BOLD),
    )))
    .render(combo_layout[0], frame.buffer_mut());
    Paragraph::new(Line::from(Span::styled(
        format!("Streak {}/{}", combo.streak(), combo.config().bonus_move_streak),
        fg_style,
    )))
    .render(combo_layout[1], frame.buffer_mut());
    let ratio = combo.charge_ratio().clamp(0.0, 1.0);
    let bar_color = match combo.multiplier() {
        5 => Color::Magenta,
        4 => Color::Red,
        3 => Color::Yellow,
        2 => Color::Green,
        _ => Color::Blue,
    };
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(bar_color).bg(theme.div_line))
        .render(combo_layout[2], frame.buffer_mut());

    // --- Tasks ---
    let tasks_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Tasks ", title_style));
    let tasks_inner = tasks_block.inner(chunks[2]);
    tasks_block.render(chunks[2], frame.buffer_mut());
    let mut task_lines: Vec<Line> = level
        .tasks()
        .iter()
        .map(|t| Line::from(Span::styled(format!("• {}", t), fg_style)))
        .collect();
    task_lines.push(Line::from(Span::styled(
        format!("{} blocks left", level.grid().active_count()),
        Style::default().fg(theme.inactive_fg),
    )));
    Paragraph::new(task_lines).render(tasks_inner, frame.buffer_mut());

    if view.show_guide {
        draw_colour_guide(frame, level, theme, chunks[3]);
    }

    let help = Paragraph::new(vec![
        Line::from(Span::styled("click/⏎ chip  g guide", Style::default().fg(theme.inactive_fg))),
        Line::from(Span::styled("t tutorial  p pause  q quit", Style::default().fg(theme.inactive_fg))),
    ]);
    help.render(chunks[4], frame.buffer_mut());
}

/// Tier colours from highest health down to broken.
fn draw_colour_guide(frame: &mut Frame, level: &Level, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Colours ", Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());
    let lines: Vec<Line> = (0..=level.max_health())
        .rev()
        .map(|h| {
            let c = theme.tier_color(h);
            let label = if h == 0 { "broken".to_string() } else { format!("{} hit{}", h, if h == 1 { "" } else { "s" }) };
            Line::from(vec![
                Span::styled("   ", Style::default().bg(c)),
                Span::styled(format!(" {}", label), Style::default().fg(theme.main_fg)),
            ])
        })
        .collect();
    Paragraph::new(lines).render(inner, frame.buffer_mut());
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn clear_rect(frame: &mut Frame, rect: Rect, bg: Color) {
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            frame.buffer_mut()[(x, y)].set_symbol(" ").set_style(Style::default().bg(bg));
        }
    }
}

fn draw_too_small(frame: &mut Frame, theme: &Theme, area: Rect, (need_w, need_h): (u16, u16)) {
    clear_rect(frame, area, theme.bg);
    let lines = vec![
        Line::from(Span::styled("Terminal too small", bold().fg(Color::Red))),
        Line::from(Span::styled(
            format!("need {}x{}, have {}x{}", need_w, need_h, area.width, area.height),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled("q quit", Style::default().fg(theme.inactive_fg))),
    ];
    let rect = centered(area, area.width, 3);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(rect, frame.buffer_mut());
}

fn draw_tutorial(frame: &mut Frame, theme: &Theme, area: Rect, page: usize, count: usize, text: &str) {
    let popup = centered(area, 44, 9);
    clear_rect(frame, popup, theme.bg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(text.to_string(), Style::default().fg(theme.main_fg))),
        Line::from(""),
        Line::from(Span::styled(
            format!(" {}/{}   ⏎ next   Esc close ", page + 1, count),
            Style::default().fg(theme.inactive_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.title).bg(theme.bg))
                .title(Span::styled(" How to play ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    clear_rect(frame, popup, theme.bg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Paused ", Style::default().fg(Color::Black).bg(Color::Yellow))),
        Line::from(Span::styled(" P Resume    Q Quit ", Style::default().fg(theme.main_fg))),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_outcome(
    frame: &mut Frame,
    level: &Level,
    theme: &Theme,
    view: &Presentation,
    high_scores: &HighScores,
    area: Rect,
    screen: Screen,
) {
    let popup = centered(area, 34, 10);
    clear_rect(frame, popup, theme.bg);
    let (title, title_style, hint) = if screen == Screen::Won {
        (
            " Level cleared! ",
            Style::default().fg(Color::Black).bg(Color::Green),
            " ⏎ Next level   R Retry   Q Quit ",
        )
    } else {
        (
            " Out of moves ",
            Style::default().fg(Color::White).bg(Color::Red),
            " ⏎/R Retry   Q Quit ",
        )
    };
    let best = high_scores.get(level.name()).copied().unwrap_or(0);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(title, title_style)),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", level.score()), Style::default().fg(theme.main_fg))),
        Line::from(Span::styled(format!(" Best: {} ", best), Style::default().fg(theme.main_fg))),
    ];
    if view.new_record {
        lines.push(Line::from(Span::styled(" New record! ", bold().fg(Color::Yellow))));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(hint, Style::default().fg(theme.main_fg))));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Chiseltui ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let quit_rect = centered(frame.area(), 24, 8);
    clear_rect(frame, quit_rect, theme.bg);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::Restart, " Restart "),
        (QuitOption::Exit, " Exit "),
    ];
    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.y + inner.height {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}
