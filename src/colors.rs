//! Terminal color theme.
//!
//! This module provides [`TerminalTheme`] and [`TerminalThemeBuilder`], which
//! turn the raw colors stored in a [`Screen`](crate::screen::Screen) into
//! concrete RGB values:
//!
//! - **Indices 0-15**: the 16 named ANSI slots, taken from the editor theme
//! - **Indices 16-255**: the emulator's built-in 256-color palette
//! - **Default**: the theme's terminal foreground/background
//! - **True color**: passed through unchanged
//!
//! # 256-Color Palette
//!
//! Colors 16-255 are calculated, never themed:
//!
//! - **16-231**: 6×6×6 RGB cube where each component is `0, 95, 135, 175, 215, 255`
//! - **232-255**: 24-step grayscale from `#080808` to `#EEEEEE`
//!
//! # Example
//!
//! ```
//! use oni_terminal::colors::TerminalTheme;
//! use oni_terminal::screen::RawColor;
//!
//! let theme = TerminalTheme::builder()
//!     .background(0x1a, 0x1b, 0x26)
//!     .red(0xf7, 0x76, 0x8e)
//!     .build();
//!
//! let red = theme.resolve_fg(RawColor::Indexed(1));
//! assert_eq!((red.r, red.g, red.b), (0xf7, 0x76, 0x8e));
//! ```

use crate::screen::RawColor;
use alacritty_terminal::vte::ansi::Rgb;
use std::collections::HashMap;

/// The 16 named ANSI color slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl AnsiColor {
    /// All slots, in palette order.
    pub const ALL: [AnsiColor; 16] = [
        AnsiColor::Black,
        AnsiColor::Red,
        AnsiColor::Green,
        AnsiColor::Yellow,
        AnsiColor::Blue,
        AnsiColor::Magenta,
        AnsiColor::Cyan,
        AnsiColor::White,
        AnsiColor::BrightBlack,
        AnsiColor::BrightRed,
        AnsiColor::BrightGreen,
        AnsiColor::BrightYellow,
        AnsiColor::BrightBlue,
        AnsiColor::BrightMagenta,
        AnsiColor::BrightCyan,
        AnsiColor::BrightWhite,
    ];

    /// Maps a raw palette index to its named slot, if it has one.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Palette index of this slot.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Key of this slot in an editor color theme.
    pub fn theme_key(self) -> &'static str {
        match self {
            AnsiColor::Black => "terminal.ansiBlack",
            AnsiColor::Red => "terminal.ansiRed",
            AnsiColor::Green => "terminal.ansiGreen",
            AnsiColor::Yellow => "terminal.ansiYellow",
            AnsiColor::Blue => "terminal.ansiBlue",
            AnsiColor::Magenta => "terminal.ansiMagenta",
            AnsiColor::Cyan => "terminal.ansiCyan",
            AnsiColor::White => "terminal.ansiWhite",
            AnsiColor::BrightBlack => "terminal.ansiBrightBlack",
            AnsiColor::BrightRed => "terminal.ansiBrightRed",
            AnsiColor::BrightGreen => "terminal.ansiBrightGreen",
            AnsiColor::BrightYellow => "terminal.ansiBrightYellow",
            AnsiColor::BrightBlue => "terminal.ansiBrightBlue",
            AnsiColor::BrightMagenta => "terminal.ansiBrightMagenta",
            AnsiColor::BrightCyan => "terminal.ansiBrightCyan",
            AnsiColor::BrightWhite => "terminal.ansiBrightWhite",
        }
    }
}

const FOREGROUND_KEY: &str = "terminal.foreground";
const BACKGROUND_KEY: &str = "terminal.background";

/// Resolved terminal colors for the active editor theme.
///
/// Only the 16 ANSI slots and the default foreground/background are themed;
/// the rest of the 256-color palette is the emulator's fixed default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalTheme {
    ansi_colors: [Rgb; 16],
    extended_colors: [Rgb; 256],
    foreground: Rgb,
    background: Rgb,
}

impl Default for TerminalTheme {
    fn default() -> Self {
        // Standard ANSI colors (based on common terminal emulator defaults)
        let ansi_colors = [
            // Normal colors
            rgb(0x00, 0x00, 0x00), // Black
            rgb(0xcc, 0x00, 0x00), // Red
            rgb(0x4e, 0x9a, 0x06), // Green
            rgb(0xc4, 0xa0, 0x00), // Yellow
            rgb(0x34, 0x65, 0xa4), // Blue
            rgb(0x75, 0x50, 0x7b), // Magenta
            rgb(0x06, 0x98, 0x9a), // Cyan
            rgb(0xd3, 0xd7, 0xcf), // White
            // Bright colors
            rgb(0x55, 0x57, 0x53), // Bright Black (Gray)
            rgb(0xef, 0x29, 0x29), // Bright Red
            rgb(0x8a, 0xe2, 0x34), // Bright Green
            rgb(0xfc, 0xe9, 0x4f), // Bright Yellow
            rgb(0x72, 0x9f, 0xcf), // Bright Blue
            rgb(0xad, 0x7f, 0xa8), // Bright Magenta
            rgb(0x34, 0xe2, 0xe2), // Bright Cyan
            rgb(0xee, 0xee, 0xec), // Bright White
        ];

        Self {
            ansi_colors,
            extended_colors: default_palette(&ansi_colors),
            foreground: rgb(0xd4, 0xd4, 0xd4),
            background: rgb(0x1e, 0x1e, 0x1e),
        }
    }
}

impl TerminalTheme {
    /// Creates a theme with default colors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for customizing colors.
    pub fn builder() -> TerminalThemeBuilder {
        TerminalThemeBuilder::new()
    }

    /// Builds a theme from editor theme colors.
    ///
    /// Keys are the editor's terminal color keys (`terminal.ansiRed`,
    /// `terminal.foreground`, ...) and values are `#rrggbb` strings. Missing or
    /// malformed entries keep the default color.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use oni_terminal::colors::{AnsiColor, TerminalTheme};
    ///
    /// let mut colors = HashMap::new();
    /// colors.insert("terminal.ansiBlue".to_string(), "#0000ff".to_string());
    ///
    /// let theme = TerminalTheme::from_theme_colors(&colors);
    /// assert_eq!(theme.ansi(AnsiColor::Blue).b, 0xff);
    /// ```
    pub fn from_theme_colors(colors: &HashMap<String, String>) -> Self {
        let lookup = |key: &str| colors.get(key).and_then(|value| parse_hex(value));

        let mut builder = TerminalThemeBuilder::new();
        for slot in AnsiColor::ALL {
            if let Some(color) = lookup(slot.theme_key()) {
                builder.set_ansi_color(slot.index(), color);
            }
        }
        if let Some(color) = lookup(FOREGROUND_KEY) {
            builder.theme.foreground = color;
        }
        if let Some(color) = lookup(BACKGROUND_KEY) {
            builder.theme.background = color;
        }
        builder.build()
    }

    /// Resolves a cell's foreground color.
    pub fn resolve_fg(&self, color: RawColor) -> Rgb {
        self.resolve(color, self.foreground)
    }

    /// Resolves a cell's background color.
    pub fn resolve_bg(&self, color: RawColor) -> Rgb {
        self.resolve(color, self.background)
    }

    fn resolve(&self, color: RawColor, default: Rgb) -> Rgb {
        match color {
            RawColor::Default => default,
            RawColor::Indexed(idx) => match AnsiColor::from_index(idx) {
                Some(slot) => self.ansi(slot),
                None => self.extended_colors[idx as usize],
            },
            RawColor::Rgb(rgb) => rgb,
        }
    }

    /// Color of a named ANSI slot.
    pub fn ansi(&self, slot: AnsiColor) -> Rgb {
        self.ansi_colors[slot.index()]
    }

    /// The emulator's 256-color palette.
    pub fn extended_colors(&self) -> &[Rgb; 256] {
        &self.extended_colors
    }

    /// Default foreground color.
    pub fn foreground(&self) -> Rgb {
        self.foreground
    }

    /// Default background color.
    pub fn background(&self) -> Rgb {
        self.background
    }
}

const fn rgb(r: u8, g: u8, b: u8) -> Rgb {
    Rgb { r, g, b }
}

/// Builds the emulator's default 256-color palette.
fn default_palette(ansi_colors: &[Rgb; 16]) -> [Rgb; 256] {
    let mut colors = [rgb(0, 0, 0); 256];

    // First 16 colors are the standard ANSI colors
    colors[0..16].copy_from_slice(ansi_colors);

    // Colors 16-231: 6x6x6 RGB cube
    let component = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
    let mut idx = 16;
    for r in 0..6 {
        for g in 0..6 {
            for b in 0..6 {
                colors[idx] = rgb(component(r), component(g), component(b));
                idx += 1;
            }
        }
    }

    // Colors 232-255: Grayscale ramp
    for i in 0..24 {
        let gray = (8 + i * 10) as u8;
        colors[232 + i] = rgb(gray, gray, gray);
    }

    colors
}

/// Parses `#rrggbb` (the leading `#` is optional).
fn parse_hex(value: &str) -> Option<Rgb> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Builder for a customized theme.
///
/// Start with default colors and override specific ones as needed.
#[derive(Debug, Clone)]
pub struct TerminalThemeBuilder {
    theme: TerminalTheme,
}

impl Default for TerminalThemeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalThemeBuilder {
    /// Creates a new builder with default colors.
    pub fn new() -> Self {
        Self {
            theme: TerminalTheme::default(),
        }
    }

    /// Sets the background color.
    pub fn background(mut self, r: u8, g: u8, b: u8) -> Self {
        self.theme.background = rgb(r, g, b);
        self
    }

    /// Sets the foreground color.
    pub fn foreground(mut self, r: u8, g: u8, b: u8) -> Self {
        self.theme.foreground = rgb(r, g, b);
        self
    }

    /// Sets any named slot.
    pub fn ansi(mut self, slot: AnsiColor, r: u8, g: u8, b: u8) -> Self {
        self.set_ansi_color(slot.index(), rgb(r, g, b));
        self
    }

    /// Sets color 0 (black).
    pub fn black(self, r: u8, g: u8, b: u8) -> Self {
        self.ansi(AnsiColor::Black, r, g, b)
    }

    /// Sets color 1 (red).
    pub fn red(self, r: u8, g: u8, b: u8) -> Self {
        self.ansi(AnsiColor::Red, r, g, b)
    }

    /// Sets color 2 (green).
    pub fn green(self, r: u8, g: u8, b: u8) -> Self {
        self.ansi(AnsiColor::Green, r, g, b)
    }

    /// Sets color 3 (yellow).
    pub fn yellow(self, r: u8, g: u8, b: u8) -> Self {
        self.ansi(AnsiColor::Yellow, r, g, b)
    }

    /// Sets color 4 (blue).
    pub fn blue(self, r: u8, g: u8, b: u8) -> Self {
        self.ansi(AnsiColor::Blue, r, g, b)
    }

    /// Sets color 5 (magenta).
    pub fn magenta(self, r: u8, g: u8, b: u8) -> Self {
        self.ansi(AnsiColor::Magenta, r, g, b)
    }

    /// Sets color 6 (cyan).
    pub fn cyan(self, r: u8, g: u8, b: u8) -> Self {
        self.ansi(AnsiColor::Cyan, r, g, b)
    }

    /// Sets color 7 (white).
    pub fn white(self, r: u8, g: u8, b: u8) -> Self {
        self.ansi(AnsiColor::White, r, g, b)
    }

    /// Sets an ANSI color by index (0-15).
    fn set_ansi_color(&mut self, idx: usize, color: Rgb) {
        self.theme.ansi_colors[idx] = color;
        self.theme.extended_colors[idx] = color;
    }

    /// Builds the theme.
    pub fn build(self) -> TerminalTheme {
        self.theme
    }
}
