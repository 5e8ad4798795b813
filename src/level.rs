//! Level session: owns the board, cascade session, combo engine, timers and move budget.
//!
//! One click is one move. The cascade it triggers runs to completion inside [`Level::click`];
//! everything deferred (hiding broken blocks, closing the combo, expiring the tooltip) goes
//! through the scheduler and fires from [`Level::tick`].

use crate::combo::ComboEngine;
use crate::config::{ConfigError, GameConfig};
use crate::events::{EventSink, GameEvent};
use crate::grid::{Coord, Grid};
use crate::reactor::{self, CascadeObserver, CascadeSession};
use crate::scheduler::Scheduler;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

/// Deferred work, one pending timer per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    DisableBlock(Coord),
    FinalizeCombo,
    ClearTooltip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Playing,
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tooltip {
    pub amount: u64,
    pub at: Coord,
}

/// Routes each cascade step to the event queue and the combo engine.
struct ComboBridge<'a> {
    combo: &'a mut ComboEngine,
    events: &'a mut Vec<GameEvent>,
    base: u32,
}

impl CascadeObserver for ComboBridge<'_> {
    fn on_health_changed(&mut self, coord: Coord, old: u8, new: u8) {
        self.events.emit(GameEvent::HealthChanged { coord, old, new });
        self.combo.on_block_break(self.base, &mut *self.events);
        if new > 0 {
            self.combo.on_color_change(&mut *self.events);
        }
    }

    fn on_broken(&mut self, coord: Coord) {
        self.events.emit(GameEvent::BlockBroken { coord });
    }
}

#[derive(Debug)]
pub struct Level {
    index: usize,
    name: String,
    tasks: Vec<String>,
    tutorial: Vec<String>,
    tutorial_page: Option<usize>,
    max_health: u8,
    grid: Grid,
    session: CascadeSession,
    combo: ComboEngine,
    scheduler: Scheduler<Task>,
    break_points: u32,
    tooltip_duration: Duration,
    moves: i32,
    outcome: Outcome,
    paused: bool,
    last_click: Option<Coord>,
    tooltip: Option<Tooltip>,
    events: Vec<GameEvent>,
}

impl Level {
    /// Start level `index` of `config`; `seed` fixes the random block layout.
    pub fn new(config: &GameConfig, index: usize, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let level = config.level(index)?;
        let max_health = config.max_health()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let grid = Grid::from_level(level, max_health, &mut rng)?;
        log::info!(
            "level {} '{}': {} blocks, {} moves",
            index + 1,
            level.name,
            grid.active_count(),
            level.moves
        );
        let mut this = Self {
            index,
            name: level.name.clone(),
            tasks: level.tasks.clone(),
            tutorial: level.tutorial.clone(),
            tutorial_page: None,
            max_health,
            grid,
            session: CascadeSession::new(),
            combo: ComboEngine::new(config.combo.clone()),
            scheduler: Scheduler::new(),
            break_points: config.break_points,
            tooltip_duration: config.tooltip_duration(),
            moves: level.moves,
            outcome: Outcome::Playing,
            paused: false,
            last_click: None,
            tooltip: None,
            events: Vec::new(),
        };
        this.evaluate();
        Ok(this)
    }

    /// Breaking is disabled while an outcome, the tutorial or the pause screen is showing.
    pub fn can_break(&self) -> bool {
        self.outcome == Outcome::Playing && self.tutorial_page.is_none() && !self.paused
    }

    /// Player break request. Returns false (and changes nothing) when gated or when
    /// there is no active block at `coord`.
    pub fn click(&mut self, coord: Coord) -> bool {
        if !self.can_break() || self.grid.active_at(coord).is_none() {
            return false;
        }
        // A click inside the grace window re-enters the running combo.
        self.scheduler.cancel(&Task::FinalizeCombo);

        let first_event = self.events.len();
        let mut bridge = ComboBridge {
            combo: &mut self.combo,
            events: &mut self.events,
            base: self.break_points,
        };
        let report = match reactor::break_block(&mut self.grid, &mut self.session, coord, &mut bridge)
        {
            Some(r) => r,
            None => return false,
        };
        for &c in &report.broken {
            self.scheduler.schedule(Task::DisableBlock(c), Duration::ZERO);
        }
        self.last_click = Some(coord);

        let bonus = self.events[first_event..]
            .iter()
            .filter(|e| **e == GameEvent::BonusMoveGranted)
            .count() as i32;
        self.moves = self.moves - 1 + bonus;
        self.events.emit(GameEvent::MovesChanged(self.moves));

        if let Some(grace) = self.combo.on_cascade_end() {
            self.scheduler.schedule(Task::FinalizeCombo, grace);
        }
        self.evaluate();
        true
    }

    /// Advance time: combo bar decay plus any due deferred tasks.
    pub fn tick(&mut self, dt: Duration) {
        self.combo.tick(dt, &mut self.events);
        for task in self.scheduler.advance(dt) {
            match task {
                Task::DisableBlock(coord) => self.events.emit(GameEvent::BlockDisabled { coord }),
                Task::FinalizeCombo => {
                    let at = self.last_click.unwrap_or_default();
                    if let Some(amount) = self.combo.finalize(at, &mut self.events) {
                        if amount > 0 {
                            self.tooltip = Some(Tooltip { amount, at });
                            self.scheduler.schedule(Task::ClearTooltip, self.tooltip_duration);
                        }
                    }
                }
                Task::ClearTooltip => {
                    self.tooltip = None;
                    self.events.emit(GameEvent::TooltipExpired);
                }
            }
        }
    }

    fn evaluate(&mut self) {
        if self.outcome != Outcome::Playing {
            return;
        }
        if self.grid.active_count() == 0 {
            self.outcome = Outcome::Won;
            log::info!("level '{}' won with score {}", self.name, self.combo.score());
            self.events.emit(GameEvent::Won);
        } else if self.moves <= 0 {
            self.outcome = Outcome::Lost;
            log::info!("level '{}' lost, {} blocks left", self.name, self.grid.active_count());
            self.events.emit(GameEvent::Lost);
        }
    }

    /// Take all events produced since the last call, in emission order.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn open_tutorial(&mut self) {
        if !self.tutorial.is_empty() {
            self.tutorial_page = Some(0);
        }
    }

    /// Next page, closing the tutorial after the last one.
    pub fn next_tutorial_page(&mut self) {
        self.tutorial_page = match self.tutorial_page {
            Some(p) if p + 1 < self.tutorial.len() => Some(p + 1),
            _ => None,
        };
    }

    pub fn close_tutorial(&mut self) {
        self.tutorial_page = None;
    }

    /// Current tutorial page as (index, count, text).
    pub fn tutorial_page(&self) -> Option<(usize, usize, &str)> {
        self.tutorial_page
            .and_then(|p| self.tutorial.get(p).map(|t| (p, self.tutorial.len(), t.as_str())))
    }

    pub fn has_tutorial(&self) -> bool {
        !self.tutorial.is_empty()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn combo(&self) -> &ComboEngine {
        &self.combo
    }

    pub fn score(&self) -> u64 {
        self.combo.score()
    }

    pub fn moves(&self) -> i32 {
        self.moves
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn tooltip(&self) -> Option<Tooltip> {
        self.tooltip
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn max_health(&self) -> u8 {
        self.max_health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combo::ComboState;
    use crate::config::LevelConfig;

    fn level_with(layout: &[&str], moves: i32) -> Level {
        let config = GameConfig {
            levels: vec![LevelConfig {
                name: "test".to_string(),
                moves,
                layout: Some(layout.iter().map(|s| (*s).to_string()).collect()),
                tutorial: vec!["one".to_string(), "two".to_string()],
                ..LevelConfig::default()
            }],
            ..GameConfig::default()
        };
        Level::new(&config, 0, 1).unwrap()
    }

    fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(*e)).count()
    }

    #[test]
    fn test_row_cascade_is_one_move_and_one_combo() {
        let mut l = level_with(&["222", "444"], 10);
        assert!(l.click(Coord::new(0, 0)));
        let ev = l.drain_events();
        assert_eq!(count(&ev, |e| matches!(e, GameEvent::HealthChanged { .. })), 3);
        assert_eq!(l.combo().streak(), 3);
        assert_eq!(l.combo().state(), ComboState::InCombo);
        assert_eq!(l.moves(), 9);
        // 3 * (500 break + 50 colour change)
        assert_eq!(l.score(), 1_650);
    }

    #[test]
    fn test_invalid_clicks_cost_nothing() {
        let mut l = level_with(&["1.2"], 10);
        assert!(!l.click(Coord::new(1, 0)));
        assert!(!l.click(Coord::new(9, 9)));
        assert!(l.click(Coord::new(0, 0)));
        assert!(!l.click(Coord::new(0, 0)));
        assert_eq!(l.moves(), 9);
    }

    #[test]
    fn test_breaking_to_zero_hides_block_next_tick() {
        let mut l = level_with(&["13"], 10);
        l.click(Coord::new(0, 0));
        let ev = l.drain_events();
        assert!(ev.contains(&GameEvent::BlockBroken { coord: Coord::new(0, 0) }));
        assert!(!ev.contains(&GameEvent::BlockDisabled { coord: Coord::new(0, 0) }));
        assert_eq!(l.grid().active_count(), 1);
        l.tick(Duration::from_millis(16));
        assert!(l.drain_events().contains(&GameEvent::BlockDisabled { coord: Coord::new(0, 0) }));
    }

    #[test]
    fn test_grace_window_keeps_combo_open() {
        let mut l = level_with(&["3.3"], 10);
        l.click(Coord::new(0, 0));
        l.tick(Duration::from_millis(300));
        l.click(Coord::new(2, 0));
        assert_eq!(l.combo().streak(), 2);
        l.tick(Duration::from_millis(599));
        assert!(l.tooltip().is_none());
        l.tick(Duration::from_millis(1));
        assert_eq!(
            l.tooltip(),
            Some(Tooltip { amount: 1_000, at: Coord::new(2, 0) })
        );
        let ev = l.drain_events();
        assert_eq!(count(&ev, |e| matches!(e, GameEvent::ComboTooltip { .. })), 1);
        assert_eq!(l.combo().state(), ComboState::Idle);
        assert_eq!(l.combo().charge(), 1_000);
    }

    #[test]
    fn test_tooltip_expires() {
        let mut l = level_with(&["3"], 10);
        l.click(Coord::new(0, 0));
        l.tick(Duration::from_millis(600));
        assert!(l.tooltip().is_some());
        l.tick(Duration::from_millis(1_499));
        assert!(l.tooltip().is_some());
        l.tick(Duration::from_millis(1));
        assert!(l.tooltip().is_none());
        assert_eq!(count(&l.drain_events(), |e| *e == GameEvent::TooltipExpired), 1);
    }

    #[test]
    fn test_ten_quick_breaks_grant_one_bonus_move() {
        let mut l = level_with(&["1313131313"], 20);
        for x in 0..10 {
            assert!(l.click(Coord::new(x, 0)));
            l.tick(Duration::from_millis(100));
        }
        let ev = l.drain_events();
        assert_eq!(count(&ev, |e| *e == GameEvent::BonusMoveGranted), 1);
        assert_eq!(l.moves(), 20 - 10 + 1);
    }

    #[test]
    fn test_long_cascade_bonus_move_in_same_click() {
        let mut l = level_with(&["11111111114"], 5);
        l.click(Coord::new(0, 0));
        assert_eq!(l.grid().active_count(), 1);
        assert_eq!(l.moves(), 5);
        assert_eq!(l.outcome(), Outcome::Playing);
    }

    #[test]
    fn test_loss_fires_once() {
        let mut l = level_with(&["3434"], 2);
        l.click(Coord::new(0, 0));
        l.click(Coord::new(1, 0));
        assert_eq!(l.outcome(), Outcome::Lost);
        assert!(!l.click(Coord::new(2, 0)));
        l.tick(Duration::from_secs(3));
        assert_eq!(count(&l.drain_events(), |e| *e == GameEvent::Lost), 1);
    }

    #[test]
    fn test_win_fires_once() {
        let mut l = level_with(&["11"], 10);
        l.click(Coord::new(0, 0));
        assert_eq!(l.outcome(), Outcome::Won);
        assert!(!l.click(Coord::new(1, 0)));
        l.tick(Duration::from_secs(3));
        let ev = l.drain_events();
        assert_eq!(count(&ev, |e| *e == GameEvent::Won), 1);
        assert_eq!(count(&ev, |e| *e == GameEvent::Lost), 0);
    }

    #[test]
    fn test_clearing_board_on_last_move_wins() {
        let mut l = level_with(&["1"], 1);
        l.click(Coord::new(0, 0));
        assert_eq!(l.outcome(), Outcome::Won);
    }

    #[test]
    fn test_tutorial_gates_breaking() {
        let mut l = level_with(&["22"], 10);
        l.open_tutorial();
        assert_eq!(l.tutorial_page(), Some((0, 2, "one")));
        assert!(!l.click(Coord::new(0, 0)));
        l.next_tutorial_page();
        assert_eq!(l.tutorial_page().map(|p| p.0), Some(1));
        l.next_tutorial_page();
        assert!(l.tutorial_page().is_none());
        assert!(l.click(Coord::new(0, 0)));
    }

    #[test]
    fn test_pause_gates_breaking() {
        let mut l = level_with(&["22"], 10);
        l.set_paused(true);
        assert!(!l.click(Coord::new(0, 0)));
        l.set_paused(false);
        assert!(l.click(Coord::new(0, 0)));
    }

    #[test]
    fn test_zero_starting_moves_is_lost() {
        let mut l = level_with(&["22"], 0);
        assert_eq!(l.outcome(), Outcome::Lost);
        assert_eq!(l.drain_events(), vec![GameEvent::Lost]);
    }

    #[test]
    fn test_same_seed_same_board() {
        let config = GameConfig::default();
        let a = Level::new(&config, 0, 42).unwrap();
        let b = Level::new(&config, 0, 42).unwrap();
        let ha: Vec<u8> = a.grid().blocks().map(|b| b.health).collect();
        let hb: Vec<u8> = b.grid().blocks().map(|b| b.health).collect();
        assert_eq!(ha, hb);
    }

    #[test]
    fn test_level_out_of_range() {
        let config = GameConfig::default();
        assert!(matches!(
            Level::new(&config, 99, 0),
            Err(ConfigError::LevelOutOfRange { .. })
        ));
    }
}
