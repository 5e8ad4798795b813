//! Events the core reports to its presentation sink.

use crate::grid::Coord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    HealthChanged { coord: Coord, old: u8, new: u8 },
    BlockBroken { coord: Coord },
    /// Deferred hide of a broken block, one step after it broke.
    BlockDisabled { coord: Coord },
    ScoreChanged(u64),
    MultiplierChanged(u32),
    /// Floating score for a finished combo, anchored at the clicked block.
    ComboTooltip { amount: u64, at: Coord },
    TooltipExpired,
    BonusMoveGranted,
    MovesChanged(i32),
    Won,
    Lost,
}

/// Receives core events. The host drains them once per frame and never blocks the core.
pub trait EventSink {
    fn emit(&mut self, event: GameEvent);
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}
