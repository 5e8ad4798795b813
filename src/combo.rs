//! Combo and score: flat colour-change bonus, multiplied break score, decaying combo bar.

use crate::config::ComboConfig;
use crate::events::{EventSink, GameEvent};
use crate::grid::Coord;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboState {
    Idle,
    InCombo,
}

/// Multiplier for a charge level: 1 plus one per band the fill percentage has reached.
pub fn multiplier_for(charge: u32, config: &ComboConfig) -> u32 {
    if config.charge_max == 0 {
        return 1;
    }
    let pct = u64::from(charge.min(config.charge_max)) * 100 / u64::from(config.charge_max);
    1 + config
        .band_percents
        .iter()
        .filter(|&&band| pct >= u64::from(band))
        .count() as u32
}

#[derive(Debug, Clone)]
pub struct ComboEngine {
    config: ComboConfig,
    state: ComboState,
    score: u64,
    multiplier: u32,
    charge: u32,
    combo_score: u64,
    streak: u32,
    /// Time since the last decay step.
    decay_elapsed: Duration,
}

impl ComboEngine {
    pub fn new(config: ComboConfig) -> Self {
        Self {
            config,
            state: ComboState::Idle,
            score: 0,
            multiplier: 1,
            charge: 0,
            combo_score: 0,
            streak: 0,
            decay_elapsed: Duration::ZERO,
        }
    }

    pub fn state(&self) -> ComboState {
        self.state
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn charge(&self) -> u32 {
        self.charge
    }

    /// Combo bar fill in 0.0..=1.0.
    pub fn charge_ratio(&self) -> f64 {
        if self.config.charge_max == 0 {
            0.0
        } else {
            f64::from(self.charge) / f64::from(self.config.charge_max)
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn combo_score(&self) -> u64 {
        self.combo_score
    }

    pub fn config(&self) -> &ComboConfig {
        &self.config
    }

    fn add_score(&mut self, amount: u64, sink: &mut impl EventSink) {
        if amount == 0 {
            return;
        }
        self.score = self.score.saturating_add(amount);
        sink.emit(GameEvent::ScoreChanged(self.score));
    }

    fn refresh_multiplier(&mut self, sink: &mut impl EventSink) {
        let m = multiplier_for(self.charge, &self.config);
        if m != self.multiplier {
            self.multiplier = m;
            sink.emit(GameEvent::MultiplierChanged(m));
        }
    }

    pub fn on_color_change(&mut self, sink: &mut impl EventSink) {
        self.add_score(self.config.color_change_bonus, sink);
    }

    pub fn on_block_break(&mut self, base: u32, sink: &mut impl EventSink) {
        if self.state == ComboState::Idle {
            self.state = ComboState::InCombo;
            self.combo_score = 0;
            self.streak = 0;
        }
        self.charge = self.charge.saturating_add(base).min(self.config.charge_max);
        self.refresh_multiplier(sink);

        let final_score = u64::from(base) * u64::from(self.multiplier);
        self.add_score(final_score, sink);
        self.combo_score = self.combo_score.saturating_add(final_score);
        self.streak = self.streak.saturating_add(1);
        if self.config.bonus_move_streak > 0 && self.streak == self.config.bonus_move_streak {
            log::info!("combo streak {} reached, bonus move", self.streak);
            sink.emit(GameEvent::BonusMoveGranted);
        }
    }

    /// Grace delay to wait before [`Self::finalize`], or None when no combo is running.
    pub fn on_cascade_end(&self) -> Option<Duration> {
        (self.state == ComboState::InCombo).then(|| self.config.grace())
    }

    /// Close the running combo. Emits the tooltip for its accumulated score.
    /// Charge and multiplier are left to decay on their own.
    pub fn finalize(&mut self, at: Coord, sink: &mut impl EventSink) -> Option<u64> {
        if self.state != ComboState::InCombo {
            return None;
        }
        let amount = self.combo_score;
        if amount > 0 {
            sink.emit(GameEvent::ComboTooltip { amount, at });
        }
        self.state = ComboState::Idle;
        self.combo_score = 0;
        self.streak = 0;
        Some(amount)
    }

    /// Drain the combo bar on its fixed cadence, independent of clicks.
    pub fn tick(&mut self, dt: Duration, sink: &mut impl EventSink) {
        let interval = self.config.decay_interval();
        self.decay_elapsed += dt;
        while self.decay_elapsed >= interval {
            self.decay_elapsed -= interval;
            self.charge = self.charge.saturating_sub(self.config.drain_per_interval);
            self.refresh_multiplier(sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ComboEngine {
        ComboEngine::new(ComboConfig::default())
    }

    #[test]
    fn test_combo_score_saturates() {
        let mut e = engine();
        let mut sink = Vec::new();
        e.on_block_break(500, &mut sink);
        e.combo_score = u64::MAX - 10;
        e.score = u64::MAX - 10;
        e.on_block_break(500, &mut sink);
        assert_eq!(e.combo_score(), u64::MAX);
        assert_eq!(e.score(), u64::MAX);
    }

    #[test]
    fn test_multiplier_bands() {
        let c = ComboConfig::default();
        assert_eq!(multiplier_for(0, &c), 1);
        assert_eq!(multiplier_for(4_999, &c), 1);
        assert_eq!(multiplier_for(5_000, &c), 2);
        assert_eq!(multiplier_for(10_000, &c), 3);
        assert_eq!(multiplier_for(15_000, &c), 4);
        assert_eq!(multiplier_for(20_000, &c), 5);
        assert_eq!(multiplier_for(25_000, &c), 5);
        assert_eq!(multiplier_for(99_999, &c), 5);
    }

    #[test]
    fn test_multiplier_always_in_range() {
        let c = ComboConfig::default();
        for charge in (0..=30_000).step_by(250) {
            assert!((1..=5).contains(&multiplier_for(charge, &c)));
        }
    }

    #[test]
    fn test_color_change_is_flat_bonus() {
        let mut e = engine();
        e.charge = 20_000;
        e.multiplier = 5;
        let mut ev = Vec::new();
        e.on_color_change(&mut ev);
        assert_eq!(e.score(), 50);
        assert_eq!(ev, vec![GameEvent::ScoreChanged(50)]);
        assert_eq!(e.state(), ComboState::Idle);
    }

    #[test]
    fn test_break_scores_with_multiplier() {
        let mut e = engine();
        let mut ev = Vec::new();
        e.on_block_break(5_000, &mut ev);
        // Charge 5000 = 20% -> x2.
        assert_eq!(e.multiplier(), 2);
        assert_eq!(e.score(), 10_000);
        assert_eq!(e.combo_score(), 10_000);
        assert_eq!(e.streak(), 1);
        assert_eq!(e.state(), ComboState::InCombo);
        assert_eq!(
            ev,
            vec![GameEvent::MultiplierChanged(2), GameEvent::ScoreChanged(10_000)]
        );
    }

    #[test]
    fn test_charge_is_capped() {
        let mut e = engine();
        let mut ev = Vec::new();
        for _ in 0..10 {
            e.on_block_break(5_000, &mut ev);
        }
        assert_eq!(e.charge(), 25_000);
        assert_eq!(e.multiplier(), 5);
    }

    #[test]
    fn test_bonus_move_exactly_once_per_crossing() {
        let mut e = engine();
        let mut ev = Vec::new();
        for _ in 0..15 {
            e.on_block_break(100, &mut ev);
        }
        let bonus = ev.iter().filter(|e| **e == GameEvent::BonusMoveGranted).count();
        assert_eq!(bonus, 1);
        assert_eq!(e.streak(), 15);

        // A new combo can earn it again.
        e.finalize(Coord::new(0, 0), &mut ev);
        ev.clear();
        for _ in 0..10 {
            e.on_block_break(100, &mut ev);
        }
        assert_eq!(ev.iter().filter(|e| **e == GameEvent::BonusMoveGranted).count(), 1);
    }

    #[test]
    fn test_finalize_emits_tooltip_and_keeps_charge() {
        let mut e = engine();
        let mut ev = Vec::new();
        e.on_block_break(500, &mut ev);
        e.on_block_break(500, &mut ev);
        assert_eq!(e.on_cascade_end(), Some(Duration::from_millis(600)));
        ev.clear();
        assert_eq!(e.finalize(Coord::new(2, 3), &mut ev), Some(1_000));
        assert_eq!(
            ev,
            vec![GameEvent::ComboTooltip { amount: 1_000, at: Coord::new(2, 3) }]
        );
        assert_eq!(e.state(), ComboState::Idle);
        assert_eq!(e.streak(), 0);
        assert_eq!(e.combo_score(), 0);
        assert_eq!(e.charge(), 1_000);
        assert_eq!(e.score(), 1_000);
        assert_eq!(e.on_cascade_end(), None);
        assert_eq!(e.finalize(Coord::new(0, 0), &mut ev), None);
    }

    #[test]
    fn test_decay_drains_to_zero() {
        let mut e = engine();
        let mut ev = Vec::new();
        e.on_block_break(2_500, &mut ev);
        e.finalize(Coord::new(0, 0), &mut ev);
        assert_eq!(e.charge(), 2_500);

        e.tick(Duration::from_millis(999), &mut ev);
        assert_eq!(e.charge(), 2_500);
        e.tick(Duration::from_millis(1), &mut ev);
        assert_eq!(e.charge(), 1_500);
        e.tick(Duration::from_secs(1), &mut ev);
        assert_eq!(e.charge(), 500);
        e.tick(Duration::from_secs(1), &mut ev);
        assert_eq!(e.charge(), 0);
        e.tick(Duration::from_secs(5), &mut ev);
        assert_eq!(e.charge(), 0);
    }

    #[test]
    fn test_decay_refreshes_multiplier_on_band_change_only() {
        let mut e = engine();
        let mut ev = Vec::new();
        e.on_block_break(6_000, &mut ev);
        assert_eq!(e.multiplier(), 2);
        ev.clear();
        // 6000 -> 5000: still 20%.
        e.tick(Duration::from_secs(1), &mut ev);
        assert!(ev.is_empty());
        // 5000 -> 4000: drops below the first band.
        e.tick(Duration::from_secs(1), &mut ev);
        assert_eq!(ev, vec![GameEvent::MultiplierChanged(1)]);
    }

    #[test]
    fn test_score_never_decreases() {
        let mut e = engine();
        let mut ev = Vec::new();
        let mut last = 0;
        for i in 0..40u32 {
            if i % 3 == 0 {
                e.on_color_change(&mut ev);
            } else {
                e.on_block_break(700, &mut ev);
            }
            if i % 7 == 0 {
                e.finalize(Coord::new(0, 0), &mut ev);
            }
            e.tick(Duration::from_millis(450), &mut ev);
            assert!(e.score() >= last);
            last = e.score();
        }
    }
}
