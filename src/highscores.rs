//! Persist best score per level to disk (XDG config or ~/.config/chiseltui).

use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

const FILENAME: &str = "highscores";

/// Returns the path to the high scores file (config dir / chiseltui / highscores).
fn config_path() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join("chiseltui").join(FILENAME)
}

/// Best score keyed by level name.
pub type HighScores = BTreeMap<String, u64>;

/// Parse `name=score` lines; malformed lines are skipped.
fn parse(content: &str) -> HighScores {
    content
        .lines()
        .filter_map(|line| {
            let (name, score) = line.rsplit_once('=')?;
            let score = score.trim().parse::<u64>().ok()?;
            Some((name.trim().to_string(), score))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Load high scores from disk. Empty on missing file.
pub fn load_high_scores() -> HighScores {
    match fs::read_to_string(config_path()) {
        Ok(c) => parse(&c),
        Err(_) => HighScores::new(),
    }
}

/// Save high scores to disk. Creates config directory if needed.
pub fn save_high_scores(scores: &HighScores) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = fs::File::create(path)?;
    for (name, score) in scores {
        writeln!(f, "{}={}", name, score)?;
    }
    Ok(())
}

/// Record `score` for `level`; returns true if it beat the stored best.
pub fn record(scores: &mut HighScores, level: &str, score: u64) -> bool {
    let best = scores.entry(level.to_string()).or_insert(0);
    if score > *best {
        *best = score;
        true
    } else {
        false
    }
}
