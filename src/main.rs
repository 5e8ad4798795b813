//! Chiseltui: chain-reaction block breaking puzzle in the terminal.

mod app;
mod highscores;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use chiseltui::GameConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Options derived from CLI that affect the session (starting level, seed, animation).
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub start_level: usize,
    pub seed: u64,
    pub frame_rate: f64,
    pub no_animation: bool,
    pub tutorial: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    let tiers = config.color_tiers()?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette, tiers).unwrap_or_else(|e| {
        log::warn!("theme: {}, using fallback colours", e);
        theme::Theme::fallback(tiers.len(), args.palette)
    });

    let options = RunOptions {
        start_level: args.level.saturating_sub(1),
        seed: args.seed.unwrap_or_else(rand::random),
        frame_rate: args.frame_rate.clamp(5.0, 240.0),
        no_animation: args.no_animation,
        tutorial: !args.no_tutorial,
    };
    let mut app = App::new(config, options, theme)?;
    app.run()?;
    Ok(())
}

/// Log to a file only; the terminal belongs to the UI.
fn init_logging(path: Option<&PathBuf>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Chain-reaction block breaking puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "chiseltui",
    version,
    about = "Chain-reaction block breaking puzzle in the terminal. Chip blocks, chain same colours, clear the board before your moves run out.",
    long_about = "Chiseltui is a terminal puzzle game about chipping coloured blocks.\n\n\
        Each hit lowers a block's tier by one; every neighbour (up, down, left, right) that had \
        the same tier is chipped too, and so on. Long chains fill the combo bar for a bigger \
        multiplier; ten breaks in one combo earn an extra move.\n\n\
        CONTROLS:\n  Mouse click / Enter / Space  Chip block   Arrows / hjkl  Move cursor\n  \
        G  Colour guide   T / ?  Tutorial   P  Pause   R  Restart   Q / Esc  Quit"
)]
pub struct Args {
    /// Game configuration (JSON). Built-in levels and tuning if not set.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Level to start on (1-based).
    #[arg(short, long, default_value = "1", value_name = "N")]
    pub level: usize,

    /// Seed for the random board layout; random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette for block tiers: normal (config), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Target frames (and game ticks) per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Disable the break fade animation.
    #[arg(long)]
    pub no_animation: bool,

    /// Do not open the tutorial when a level starts.
    #[arg(long)]
    pub no_tutorial: bool,

    /// Write logs to this file (RUST_LOG filters; default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
