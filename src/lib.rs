//! Chiseltui core: chain-reaction block breaking with a decaying combo multiplier.
//!
//! - `grid`: blocks by coordinate, orthogonal neighbours.
//! - `reactor`: breaking a block and cascading through same-health neighbours.
//! - `combo`: score, combo bar, multiplier bands, bonus moves.
//! - `scheduler`: cancellable deferred tasks driven by the frame tick.
//! - `level`: one playable session (moves, win/loss, tutorial gating, event queue).
//! - `config`: static tuning and the level list.
//!
//! The host owns input and presentation: it turns clicks into [`grid::Coord`]s, calls
//! [`level::Level::click`] and [`level::Level::tick`], and drains [`events::GameEvent`]s.

pub mod combo;
pub mod config;
pub mod events;
pub mod grid;
pub mod level;
pub mod reactor;
pub mod scheduler;

pub use config::{ConfigError, GameConfig};
pub use events::GameEvent;
pub use grid::Coord;
pub use level::{Level, Outcome};
