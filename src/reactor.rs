//! Chain reaction: breaking a block cascades into same-health orthogonal neighbours.

use crate::events::GameEvent;
use crate::grid::{Coord, Grid};
use std::collections::HashSet;

/// Blocks already processed in the current cascade.
#[derive(Debug, Default, Clone)]
pub struct CascadeSession {
    visited: HashSet<Coord>,
    active: bool,
}

impl CascadeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session. Returns false if one was already open (the caller does not own it).
    pub fn begin(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.visited.clear();
        true
    }

    pub fn finish(&mut self) {
        self.visited.clear();
        self.active = false;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn is_visited(&self, c: Coord) -> bool {
        self.visited.contains(&c)
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }
}

/// Receives each mutation of a cascade, in traversal order.
pub trait CascadeObserver {
    fn on_health_changed(&mut self, coord: Coord, old: u8, new: u8);
    fn on_broken(&mut self, coord: Coord);
}

impl CascadeObserver for Vec<GameEvent> {
    fn on_health_changed(&mut self, coord: Coord, old: u8, new: u8) {
        self.push(GameEvent::HealthChanged { coord, old, new });
    }

    fn on_broken(&mut self, coord: Coord) {
        self.push(GameEvent::BlockBroken { coord });
    }
}

/// What one break call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    pub origin: Coord,
    /// Blocks hit, in depth-first visit order (origin first).
    pub visited: Vec<Coord>,
    /// Subset of `visited` that reached health 0.
    pub broken: Vec<Coord>,
}

/// Break the block at `origin` and cascade.
///
/// No-op (returns None) when there is no active block at `origin` or it was already
/// visited in the open session. Opens a session if none is open and closes it when the
/// whole cascade has run, so the next click starts clean.
pub fn break_block<O: CascadeObserver + ?Sized>(
    grid: &mut Grid,
    session: &mut CascadeSession,
    origin: Coord,
    observer: &mut O,
) -> Option<CascadeReport> {
    if grid.active_at(origin).is_none() || session.is_visited(origin) {
        return None;
    }
    let owns_session = session.begin();
    let mut report = CascadeReport {
        origin,
        visited: Vec::new(),
        broken: Vec::new(),
    };
    step(grid, session, origin, observer, &mut report);
    if owns_session {
        session.finish();
    }
    Some(report)
}

fn step<O: CascadeObserver + ?Sized>(
    grid: &mut Grid,
    session: &mut CascadeSession,
    coord: Coord,
    observer: &mut O,
    report: &mut CascadeReport,
) {
    let h = match grid.active_at(coord) {
        Some(b) => b.health,
        None => return,
    };
    if !session.visited.insert(coord) {
        return;
    }
    report.visited.push(coord);

    let new = h.saturating_sub(1);
    if grid.set_health(coord, new).is_none() {
        return;
    }
    log::debug!("block ({}, {}) health {} -> {}", coord.x, coord.y, h, new);
    observer.on_health_changed(coord, h, new);
    if new == 0 {
        report.broken.push(coord);
        observer.on_broken(coord);
    }

    for n in coord.neighbours() {
        let qualifies = grid.active_at(n).is_some_and(|b| b.health == h) && !session.is_visited(n);
        if qualifies {
            step(grid, session, n, observer, report);
        }
    }
}
