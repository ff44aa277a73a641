//! Screen snapshots.
//!
//! A [`Screen`] is an owned, immutable-by-convention copy of an emulated
//! terminal's cell grid, scrollback included. Snapshots are produced by the
//! bridge (see [`TerminalState::snapshot`](crate::terminal::TerminalState::snapshot))
//! and replaced wholesale on every update, so the registry and the highlight
//! projector never observe a half-written grid.
//!
//! Cells carry a raw code point rather than a `char`: emulators hand out `0`
//! for never-written cells, and the projector is responsible for deciding what
//! counts as printable.

use crate::session::SessionId;
use alacritty_terminal::vte::ansi::Rgb;
use std::sync::Arc;

/// Color of a cell as reported by the emulator, before theme resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawColor {
    /// The emulator's default foreground or background, depending on channel.
    #[default]
    Default,

    /// A palette index. `0..=15` are the named ANSI slots.
    Indexed(u8),

    /// A 24-bit color set directly by the program.
    Rgb(Rgb),
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    /// Unicode code point, `0` for an empty cell.
    pub codepoint: u32,

    /// Foreground color.
    pub fg: RawColor,

    /// Background color.
    pub bg: RawColor,
}

impl Cell {
    /// Creates a cell holding `ch` with default colors.
    pub fn new(ch: char) -> Self {
        Self {
            codepoint: ch as u32,
            ..Self::default()
        }
    }

    /// Sets the foreground and background colors.
    pub fn with_colors(mut self, fg: RawColor, bg: RawColor) -> Self {
        self.fg = fg;
        self.bg = bg;
        self
    }
}

/// Grid of cells, scrollback rows first.
///
/// Rows are reference counted, so consecutive snapshots of one emulator share
/// every scrollback row that did not change between them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screen {
    columns: usize,
    rows: Vec<Arc<[Cell]>>,
}

impl Screen {
    /// The screen a session starts with: no rows, no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a grid of empty cells.
    pub fn new(rows: usize, columns: usize) -> Self {
        let blank: Arc<[Cell]> = vec![Cell::default(); columns].into();
        Self {
            columns,
            rows: vec![blank; rows],
        }
    }

    /// Builds a screen from existing rows.
    ///
    /// # Panics
    ///
    /// Panics if a row is not `columns` cells long.
    pub fn from_rows(columns: usize, rows: Vec<Arc<[Cell]>>) -> Self {
        assert!(
            rows.iter().all(|row| row.len() == columns),
            "every row must have {columns} cells"
        );
        Self { columns, rows }
    }

    /// Builds a screen from text lines, one row per line.
    ///
    /// Lines shorter than `columns` are padded with empty cells and longer
    /// ones are truncated.
    ///
    /// ```
    /// use oni_terminal::screen::Screen;
    ///
    /// let screen = Screen::from_lines(&["", "hello", ""], 8);
    /// assert_eq!(screen.total_rows(), 3);
    /// assert_eq!(screen.cell(1, 0).codepoint, 'h' as u32);
    /// ```
    pub fn from_lines(lines: &[&str], columns: usize) -> Self {
        let rows = lines
            .iter()
            .map(|line| {
                let mut cells = vec![Cell::default(); columns];
                for (cell, ch) in cells.iter_mut().zip(line.chars()) {
                    *cell = Cell::new(ch);
                }
                cells.into()
            })
            .collect();
        Self { columns, rows }
    }

    /// Total number of rows, scrollback included.
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns per row.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Returns the cell at `(row, column)`.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside the grid.
    pub fn cell(&self, row: usize, column: usize) -> Cell {
        self.check(row, column);
        self.rows[row][column]
    }

    /// Replaces the cell at `(row, column)`. A row shared with another
    /// screen is copied first.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside the grid.
    pub fn set_cell(&mut self, row: usize, column: usize, cell: Cell) {
        self.check(row, column);
        let cells = &mut self.rows[row];
        match Arc::get_mut(cells) {
            Some(cells) => cells[column] = cell,
            None => {
                let mut copy = cells.to_vec();
                copy[column] = cell;
                *cells = copy.into();
            }
        }
    }

    /// The cells of one row.
    pub fn row(&self, row: usize) -> &[Cell] {
        &self.rows[row]
    }

    /// The shared handle of one row.
    pub fn shared_row(&self, row: usize) -> &Arc<[Cell]> {
        &self.rows[row]
    }

    fn check(&self, row: usize, column: usize) {
        assert!(
            row < self.rows.len() && column < self.columns,
            "cell ({row}, {column}) outside {}x{} screen",
            self.rows.len(),
            self.columns
        );
    }
}

/// Shape the cursor is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Beam,
}

/// Cursor snapshot. `row` counts from the top of the [`Screen`], so it
/// includes the scrollback rows above the visible area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
    pub column: usize,
    pub visible: bool,
    pub shape: CursorShape,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            row: 0,
            column: 0,
            visible: true,
            shape: CursorShape::Block,
        }
    }
}

/// Anything that can hand out the latest screen of a session.
///
/// Implemented by the [`Registry`](crate::registry::Registry) (last snapshot
/// it was sent) and by bridges that own live emulators.
pub trait ScreenSource {
    /// Latest snapshot for `id`, or `None` for unknown or not-yet-started
    /// sessions.
    fn current_screen(&self, id: SessionId) -> Option<Arc<Screen>>;
}
