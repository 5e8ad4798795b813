//! Static game configuration: colour tiers, scoring, combo tuning and the level list.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no colour tiers configured and no default tier list")]
    NoColorTiers,
    #[error("colour tier list needs at least 2 entries (broken + one health tier), got {0}")]
    TooFewTiers(usize),
    #[error("no levels configured")]
    NoLevels,
    #[error("level {index} out of range (have {count})")]
    LevelOutOfRange { index: usize, count: usize },
    #[error("level '{0}' has no blocks")]
    EmptyLayout(String),
    #[error("level '{name}' is {width}x{height}, max is {MAX_LEVEL_SIDE}x{MAX_LEVEL_SIDE}")]
    LevelTooLarge {
        name: String,
        width: usize,
        height: usize,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Largest board side, in blocks.
pub const MAX_LEVEL_SIDE: usize = 64;

/// Combo bar and multiplier tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ComboConfig {
    /// Flat bonus for a block that changes colour (not multiplied).
    pub color_change_bonus: u64,
    pub charge_max: u32,
    /// Fill percentages at which the multiplier steps up by one.
    pub band_percents: [u32; 4],
    /// Streak length that grants one bonus move.
    pub bonus_move_streak: u32,
    pub drain_per_interval: u32,
    pub decay_interval_ms: u64,
    /// Idle gap after a cascade before the combo is finalized.
    pub grace_ms: u64,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            color_change_bonus: 50,
            charge_max: 25_000,
            band_percents: [20, 40, 60, 80],
            bonus_move_streak: 10,
            drain_per_interval: 1000,
            decay_interval_ms: 1000,
            grace_ms: 600,
        }
    }
}

impl ComboConfig {
    pub fn decay_interval(&self) -> Duration {
        Duration::from_millis(self.decay_interval_ms.max(1))
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// One playable level.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub name: String,
    pub moves: i32,
    pub width: u16,
    pub height: u16,
    /// Optional rows: `.` hole, `#` random block, `1`-`9` fixed health.
    pub layout: Option<Vec<String>>,
    pub tasks: Vec<String>,
    pub tutorial: Vec<String>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            name: "Level".to_string(),
            moves: 20,
            width: 8,
            height: 8,
            layout: None,
            tasks: Vec::new(),
            tutorial: Vec::new(),
        }
    }
}

impl LevelConfig {
    /// Dimensions, taking the layout's extent when one is given.
    pub fn dimensions(&self) -> (u16, u16) {
        let (w, h) = self.extent();
        (
            u16::try_from(w).unwrap_or(u16::MAX),
            u16::try_from(h).unwrap_or(u16::MAX),
        )
    }

    fn extent(&self) -> (usize, usize) {
        match &self.layout {
            Some(rows) => {
                let w = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
                (w, rows.len())
            }
            None => (usize::from(self.width), usize::from(self.height)),
        }
    }

    /// The board must fit [`MAX_LEVEL_SIDE`] and hold at least one block.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = self.extent();
        if width > MAX_LEVEL_SIDE || height > MAX_LEVEL_SIDE {
            return Err(ConfigError::LevelTooLarge {
                name: self.name.clone(),
                width,
                height,
            });
        }
        let has_block = match &self.layout {
            Some(rows) => rows
                .iter()
                .any(|r| r.chars().any(|c| matches!(c, '#' | '1'..='9'))),
            None => width > 0 && height > 0,
        };
        if !has_block {
            return Err(ConfigError::EmptyLayout(self.name.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Hex colours indexed by health; index 0 is the broken colour.
    pub tiers: Vec<String>,
    pub default_tiers: Vec<String>,
    /// Base amount fed to the combo engine per break step.
    pub break_points: u32,
    pub combo: ComboConfig,
    pub tooltip_ms: u64,
    pub levels: Vec<LevelConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tiers: Vec::new(),
            default_tiers: ["#5C6370", "#E06C75", "#D19A66", "#E5C07B", "#98C379"]
                .into_iter()
                .map(String::from)
                .collect(),
            break_points: 500,
            combo: ComboConfig::default(),
            tooltip_ms: 1500,
            levels: builtin_levels(),
        }
    }
}

fn builtin_levels() -> Vec<LevelConfig> {
    vec![
        LevelConfig {
            name: "Quarry".to_string(),
            moves: 25,
            width: 6,
            height: 6,
            layout: None,
            tasks: vec![
                "Clear every block".to_string(),
                "Chain same colours together".to_string(),
            ],
            tutorial: vec![
                "Click a block to chip it. Each hit lowers its tier by one.".to_string(),
                "Neighbours of the same tier chip along with it: up, down, left and right.".to_string(),
                "Long chains fill the combo bar. A fuller bar means a bigger multiplier.".to_string(),
                "Ten breaks in one combo earns an extra move. Clear the board before moves run out!".to_string(),
            ],
        },
        LevelConfig {
            name: "Ridge".to_string(),
            moves: 30,
            layout: Some(
                [
                    "..####..",
                    ".######.",
                    "########",
                    "###..###",
                    "###..###",
                    "########",
                    ".######.",
                    "..####..",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
            ),
            tasks: vec!["Clear the ring".to_string()],
            ..LevelConfig::default()
        },
        LevelConfig {
            name: "Bedrock".to_string(),
            moves: 35,
            width: 10,
            height: 8,
            tasks: vec![
                "Clear every block".to_string(),
                "Earn bonus moves with long combos".to_string(),
            ],
            ..LevelConfig::default()
        },
    ]
}

impl GameConfig {
    /// Load from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        if config.uses_default_tiers() {
            log::warn!("no colour tiers configured, using defaults");
        }
        Ok(config)
    }

    /// Checks the load-time invariants: a usable tier list and at least one level,
    /// every one of them playable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tiers = self.color_tiers()?;
        if tiers.len() < 2 {
            return Err(ConfigError::TooFewTiers(tiers.len()));
        }
        if self.levels.is_empty() {
            return Err(ConfigError::NoLevels);
        }
        self.levels.iter().try_for_each(LevelConfig::validate)
    }

    /// True when `tiers` is empty and `default_tiers` stands in for it.
    pub fn uses_default_tiers(&self) -> bool {
        self.tiers.is_empty() && !self.default_tiers.is_empty()
    }

    /// Configured tiers, or the default list when the configured one is empty.
    pub fn color_tiers(&self) -> Result<&[String], ConfigError> {
        if !self.tiers.is_empty() {
            return Ok(&self.tiers);
        }
        if !self.default_tiers.is_empty() {
            return Ok(&self.default_tiers);
        }
        Err(ConfigError::NoColorTiers)
    }

    /// Highest health a block can start with (tier 0 is broken).
    pub fn max_health(&self) -> Result<u8, ConfigError> {
        let n = self.color_tiers()?.len();
        if n < 2 {
            return Err(ConfigError::TooFewTiers(n));
        }
        Ok((n - 1).min(u8::MAX as usize) as u8)
    }

    pub fn level(&self, index: usize) -> Result<&LevelConfig, ConfigError> {
        self.levels.get(index).ok_or(ConfigError::LevelOutOfRange {
            index,
            count: self.levels.len(),
        })
    }

    /// Level after `index`, wrapping to the first past the end.
    pub fn next_level_index(&self, index: usize) -> usize {
        if index + 1 < self.levels.len() { index + 1 } else { 0 }
    }

    pub fn tooltip_duration(&self) -> Duration {
        Duration::from_millis(self.tooltip_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let c = GameConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.max_health().unwrap(), 4);
    }

    #[test]
    fn test_empty_tiers_fall_back_to_defaults() {
        let c = GameConfig::from_json(r#"{"tiers": []}"#).unwrap();
        assert_eq!(c.color_tiers().unwrap(), c.default_tiers.as_slice());
    }

    #[test]
    fn test_configured_tiers_win() {
        let c = GameConfig::from_json(r##"{"tiers": ["#000", "#F00", "#0F0"]}"##).unwrap();
        assert_eq!(c.max_health().unwrap(), 2);
    }

    #[test]
    fn test_no_tiers_is_fatal() {
        let err = GameConfig::from_json(r#"{"tiers": [], "default_tiers": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NoColorTiers));
    }

    #[test]
    fn test_no_levels_is_fatal() {
        let err = GameConfig::from_json(r#"{"levels": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NoLevels));
    }

    #[test]
    fn test_every_level_is_checked_at_load() {
        let err = GameConfig::from_json(
            r#"{"levels": [{"name": "ok"}, {"name": "holes", "layout": ["..."]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLayout(ref n) if n == "holes"));

        let err =
            GameConfig::from_json(r#"{"levels": [{"name": "ok"}, {"name": "flat", "width": 0}]}"#)
                .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLayout(ref n) if n == "flat"));
    }

    #[test]
    fn test_oversized_level_rejected() {
        let err = GameConfig::from_json(r#"{"levels": [{"name": "huge", "width": 20000}]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::LevelTooLarge { width: 20000, .. }));

        let row = "#".repeat(MAX_LEVEL_SIDE + 1);
        let l = LevelConfig {
            layout: Some(vec![row]),
            ..LevelConfig::default()
        };
        assert!(matches!(l.validate(), Err(ConfigError::LevelTooLarge { .. })));
    }

    #[test]
    fn test_fixed_health_layout_is_playable() {
        let l = LevelConfig {
            layout: Some(vec!["..3".to_string()]),
            ..LevelConfig::default()
        };
        assert!(l.validate().is_ok());
    }

    #[test]
    fn test_default_tiers_flag() {
        let c = GameConfig::default();
        assert!(c.uses_default_tiers());
        let c = GameConfig::from_json(r##"{"tiers": ["#000", "#F00"]}"##).unwrap();
        assert!(!c.uses_default_tiers());
    }

    #[test]
    fn test_partial_combo_section() {
        let c = GameConfig::from_json(r#"{"combo": {"bonus_move_streak": 4}}"#).unwrap();
        assert_eq!(c.combo.bonus_move_streak, 4);
        assert_eq!(c.combo.charge_max, 25_000);
    }

    #[test]
    fn test_layout_dimensions() {
        let l = LevelConfig {
            layout: Some(vec!["##.".to_string(), "#".to_string()]),
            ..LevelConfig::default()
        };
        assert_eq!(l.dimensions(), (3, 2));
    }

    #[test]
    fn test_next_level_wraps() {
        let c = GameConfig::default();
        assert_eq!(c.next_level_index(0), 1);
        assert_eq!(c.next_level_index(c.levels.len() - 1), 0);
    }
}
