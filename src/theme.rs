//! Theme loading: btop-style `theme[key]="value"`, hex → ratatui Color, block tier colours.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Tier colours for the high-contrast palette, cycled past the end. Tier 0 keeps the broken colour.
const HIGH_CONTRAST: [Color; 6] = [
    Color::Rgb(0xFF, 0x00, 0x00),
    Color::Rgb(0xFF, 0x88, 0x00),
    Color::Rgb(0xFF, 0xFF, 0x00),
    Color::Rgb(0x00, 0xFF, 0x00),
    Color::Rgb(0x00, 0x88, 0xFF),
    Color::Rgb(0xFF, 0x00, 0xFF),
];

/// Colorblind-friendly tiers (blue/orange/teal first, avoiding red/green pairs).
const COLORBLIND: [Color; 6] = [
    Color::Rgb(0x00, 0x77, 0xBB),
    Color::Rgb(0xEE, 0x77, 0x33),
    Color::Rgb(0x00, 0x99, 0x88),
    Color::Rgb(0xBB, 0xBB, 0x00),
    Color::Rgb(0xEE, 0x33, 0x77),
    Color::Rgb(0xCC, 0x33, 0x11),
];

/// Block tier colours plus UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Block colour by health; index 0 is the broken colour.
    pub tiers: Vec<Color>,
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, moves).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text and the cursor on inert cells.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Theme {
    /// One Dark UI colours with the given tier colours.
    fn onedark(tiers: Vec<Color>) -> Self {
        Self {
            tiers,
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
        }
    }

    /// Grey broken tier followed by `tier_count - 1` high-contrast colours.
    /// Used when configured tier colours cannot be parsed.
    pub fn fallback(tier_count: usize, palette: crate::Palette) -> Self {
        let mut tiers = vec![Color::Rgb(0x5C, 0x63, 0x70)];
        tiers.extend(HIGH_CONTRAST.iter().cycle().take(tier_count.saturating_sub(1)));
        let mut t = Self::onedark(tiers);
        t.apply_palette(palette);
        t
    }

    /// Load UI colours from a btop-style file (`theme[key]="value"`) and tier colours from hex strings.
    /// UI colours fall back to One Dark if path is None or the file is missing.
    pub fn load(
        path: Option<&Path>,
        palette: crate::Palette,
        tier_hexes: &[String],
    ) -> Result<Self, ThemeError> {
        let tiers = tier_hexes
            .iter()
            .map(|h| parse_hex(h))
            .collect::<Result<Vec<_>, _>>()?;
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s), tiers)
            }
            _ => Self::onedark(tiers),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override tier colours (not the broken tier) for high-contrast or colorblind.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        let source: &[Color] = match palette {
            crate::Palette::Normal => return,
            crate::Palette::HighContrast => &HIGH_CONTRAST,
            crate::Palette::Colorblind => &COLORBLIND,
        };
        for (tier, c) in self.tiers.iter_mut().skip(1).zip(source.iter().cycle()) {
            *tier = *c;
        }
    }

    fn from_map(map: &HashMap<String, String>, tiers: Vec<Color>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let d = Self::onedark(tiers);
        Self {
            bg: get("meter_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
            tiers: d.tiers,
        }
    }

    /// Colour for a block of the given health (clamped to the last tier).
    #[inline]
    pub fn tier_color(&self, health: u8) -> Color {
        let i = (health as usize).min(self.tiers.len().saturating_sub(1));
        self.tiers.get(i).copied().unwrap_or(self.main_fg)
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&s[range], 16).map_err(|_| bad());
    if !s.is_ascii() {
        return Err(bad());
    }
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(bad()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Palette;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_tier_color_clamps() {
        let t = Theme::load(None, Palette::Normal, &["#000".to_string(), "#F00".to_string()])
            .unwrap();
        assert_eq!(t.tier_color(0), Color::Rgb(0, 0, 0));
        assert_eq!(t.tier_color(1), Color::Rgb(255, 0, 0));
        assert_eq!(t.tier_color(9), Color::Rgb(255, 0, 0));
    }

    #[test]
    fn test_palette_keeps_broken_tier() {
        let hexes: Vec<String> = ["#111", "#222", "#333"].iter().map(|s| s.to_string()).collect();
        let t = Theme::load(None, Palette::Colorblind, &hexes).unwrap();
        assert_eq!(t.tier_color(0), Color::Rgb(0x11, 0x11, 0x11));
        assert_eq!(t.tier_color(1), COLORBLIND[0]);
        assert_eq!(t.tier_color(2), COLORBLIND[1]);
    }

    #[test]
    fn test_invalid_tier_hex_is_error() {
        let err = Theme::load(None, Palette::Normal, &["nope".to_string()]).unwrap_err();
        assert!(matches!(err, ThemeError::InvalidHex(_)));
    }

    #[test]
    fn test_fallback_tier_count() {
        let t = Theme::fallback(5, Palette::Normal);
        assert_eq!(t.tiers.len(), 5);
    }
}
