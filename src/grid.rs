//! Block grid: coordinates, blocks and orthogonal neighbour lookup.

use crate::config::{ConfigError, LevelConfig};
use rand::Rng;

/// Grid coordinate. y=0 is the top row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: u16,
    pub y: u16,
}

impl Coord {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Orthogonal neighbours in cascade order: up, down, left, right.
    /// Offsets that leave the non-negative quadrant are skipped.
    pub fn neighbours(self) -> impl Iterator<Item = Self> {
        const OFFSETS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
        OFFSETS.into_iter().filter_map(move |(dx, dy)| {
            let x = i32::from(self.x) + dx;
            let y = i32::from(self.y) + dy;
            (x >= 0 && y >= 0 && x <= i32::from(u16::MAX) && y <= i32::from(u16::MAX))
                .then(|| Self::new(x as u16, y as u16))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub coord: Coord,
    pub health: u8,
    pub broken: bool,
}

impl Block {
    pub const fn new(coord: Coord, health: u8) -> Self {
        Self {
            coord,
            health,
            broken: health == 0,
        }
    }

    #[inline]
    pub const fn is_active(&self) -> bool {
        self.health > 0 && !self.broken
    }
}

/// Blocks by coordinate. Cells may be holes; broken blocks stay in place as inert.
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: u16,
    pub height: u16,
    /// cells[y * width + x]
    cells: Vec<Option<Block>>,
    active: usize,
}

impl Grid {
    pub fn empty(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
            active: 0,
        }
    }

    /// Full rectangle of blocks with random health in `1..=max_health`.
    pub fn random<R: Rng + ?Sized>(width: u16, height: u16, max_health: u8, rng: &mut R) -> Self {
        let mut grid = Self::empty(width, height);
        for y in 0..height {
            for x in 0..width {
                let health = rng.random_range(1..=max_health.max(1));
                grid.insert(Block::new(Coord::new(x, y), health));
            }
        }
        grid
    }

    /// Build from a level: its ASCII layout when present, otherwise a random rectangle.
    pub fn from_level<R: Rng + ?Sized>(
        level: &LevelConfig,
        max_health: u8,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let grid = match &level.layout {
            Some(rows) => Self::from_layout(rows, max_health, rng),
            None => Self::random(level.width, level.height, max_health, rng),
        };
        if grid.active_count() == 0 {
            return Err(ConfigError::EmptyLayout(level.name.clone()));
        }
        Ok(grid)
    }

    /// `.` (or any unknown char) = hole, `#` = random health, `1`-`9` = fixed health.
    pub fn from_layout<R: Rng + ?Sized, S: AsRef<str>>(
        rows: &[S],
        max_health: u8,
        rng: &mut R,
    ) -> Self {
        let width = rows
            .iter()
            .map(|r| r.as_ref().chars().count())
            .max()
            .unwrap_or(0);
        let width = u16::try_from(width).unwrap_or(u16::MAX);
        let height = u16::try_from(rows.len()).unwrap_or(u16::MAX);
        let mut grid = Self::empty(width, height);
        let max_health = max_health.max(1);
        for (y, row) in rows.iter().enumerate() {
            let Ok(y) = u16::try_from(y) else {
                break;
            };
            for (x, ch) in row.as_ref().chars().enumerate() {
                let Ok(x) = u16::try_from(x) else {
                    break;
                };
                let health = match ch {
                    '#' => rng.random_range(1..=max_health),
                    '1'..='9' => (ch as u8 - b'0').min(max_health),
                    _ => continue,
                };
                grid.insert(Block::new(Coord::new(x, y), health));
            }
        }
        grid
    }

    #[inline]
    fn index(&self, c: Coord) -> Option<usize> {
        (c.x < self.width && c.y < self.height)
            .then(|| c.y as usize * self.width as usize + c.x as usize)
    }

    /// Place a block, replacing whatever was at its coordinate. Out-of-bounds is ignored.
    pub fn insert(&mut self, block: Block) {
        if let Some(i) = self.index(block.coord) {
            if self.cells[i].is_some_and(|b| b.is_active()) {
                self.active -= 1;
            }
            if block.is_active() {
                self.active += 1;
            }
            self.cells[i] = Some(block);
        }
    }

    #[inline]
    pub fn get(&self, c: Coord) -> Option<&Block> {
        self.index(c).and_then(|i| self.cells[i].as_ref())
    }

    /// The block at `c` if it exists and is not inert.
    pub fn active_at(&self, c: Coord) -> Option<&Block> {
        self.get(c).filter(|b| b.is_active())
    }

    /// Set health (floored at 0). Reaching 0 marks the block broken and drops the active count.
    /// Returns (old, new) health, or None if there is no active block at `c`.
    pub fn set_health(&mut self, c: Coord, health: u8) -> Option<(u8, u8)> {
        let i = self.index(c)?;
        let block = self.cells[i].as_mut().filter(|b| b.is_active())?;
        let old = block.health;
        block.health = health;
        if health == 0 {
            block.broken = true;
            self.active -= 1;
        }
        Some((old, health))
    }

    /// Number of blocks still breakable; the board is cleared at 0.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.cells.iter().flatten()
    }
}
