//! Emulator state for one session.
//!
//! [`TerminalState`] owns alacritty's [`Term`] together with the VTE parser
//! that drives it. The bridge keeps each state behind one mutex shared by the
//! session's pump thread, which feeds PTY output through [`process_bytes`]
//! and takes a [`snapshot`] per burst, and by input encoding, which reads
//! the terminal mode.
//!
//! ```text
//! PTY bytes → VTE Parser → Term handlers → Grid → snapshot() → Screen + Cursor
//! ```
//!
//! Snapshots include the scrollback. Rows that were already in the history
//! at the previous snapshot are handed out again instead of being copied, so
//! an echoed keystroke converts the visible screen and nothing else.
//!
//! # Example
//!
//! ```
//! use oni_terminal::event::SessionEventProxy;
//! use oni_terminal::session::SessionId;
//! use oni_terminal::terminal::TerminalState;
//!
//! let (tx, _rx) = flume::unbounded();
//! let proxy = SessionEventProxy::new(SessionId(0), tx, "sh");
//! let mut terminal = TerminalState::new(80, 24, proxy);
//!
//! terminal.process_bytes(b"\x1b[31mRed text\x1b[0m");
//! let (screen, cursor) = terminal.snapshot();
//! assert_eq!(screen.cell(0, 0).codepoint, 'R' as u32);
//! assert_eq!(cursor.column, 8);
//! ```
//!
//! [`process_bytes`]: TerminalState::process_bytes
//! [`snapshot`]: TerminalState::snapshot

use crate::event::SessionEventProxy;
use crate::screen::{Cell, Cursor, CursorShape, RawColor, Screen};
use alacritty_terminal::grid::{Dimensions, Grid, GridCell};
use alacritty_terminal::index::{Column, Line};
use alacritty_terminal::term::cell::{Cell as TermCell, Flags};
use alacritty_terminal::term::{Config, Term, TermMode};
use alacritty_terminal::vte::ansi::{self, Color, Processor};
use std::sync::Arc;

/// Lines of scrollback kept per session unless configured otherwise.
pub const DEFAULT_SCROLLBACK: usize = 10_000;

/// Shifts tried when lining the cached history up with the grid. Runs of
/// identical rows make several shifts match at the newest row.
const MAX_HISTORY_ALIGNMENTS: usize = 8;

struct TermDimensions {
    columns: usize,
    screen_lines: usize,
}

impl TermDimensions {
    fn new(columns: usize, screen_lines: usize) -> Self {
        Self {
            // A zero-sized grid is not something alacritty can represent.
            columns: columns.max(1),
            screen_lines: screen_lines.max(1),
        }
    }
}

impl Dimensions for TermDimensions {
    fn total_lines(&self) -> usize {
        self.screen_lines
    }

    fn screen_lines(&self) -> usize {
        self.screen_lines
    }

    fn columns(&self) -> usize {
        self.columns
    }
}

/// A [`Term`] plus its parser.
pub struct TerminalState {
    term: Term<SessionEventProxy>,
    parser: Processor,
    history: HistoryCache,
    cols: usize,
    rows: usize,
}

impl TerminalState {
    /// Creates an emulator with [`DEFAULT_SCROLLBACK`] lines of history.
    pub fn new(cols: usize, rows: usize, event_proxy: SessionEventProxy) -> Self {
        Self::with_scrollback(cols, rows, DEFAULT_SCROLLBACK, event_proxy)
    }

    pub fn with_scrollback(
        cols: usize,
        rows: usize,
        scrollback: usize,
        event_proxy: SessionEventProxy,
    ) -> Self {
        let config = Config {
            scrolling_history: scrollback,
            ..Config::default()
        };

        Self {
            term: Term::new(config, &TermDimensions::new(cols, rows), event_proxy),
            parser: Processor::new(),
            history: HistoryCache::default(),
            cols,
            rows,
        }
    }

    /// Feeds output from the PTY through the parser.
    pub fn process_bytes(&mut self, bytes: &[u8]) {
        self.parser.advance(&mut self.term, bytes);
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.cols = cols;
        self.rows = rows;
        self.term.resize(TermDimensions::new(cols, rows));
        // Reflow rewrites the history.
        self.history = HistoryCache::default();
    }

    /// Current mode flags; arrow keys and pastes depend on them.
    pub fn mode(&self) -> TermMode {
        *self.term.mode()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The grid, scrollback first, and the cursor.
    pub fn snapshot(&mut self) -> (Screen, Cursor) {
        let screen = grid_screen(self.term.grid(), &mut self.history);
        (screen, cursor(&self.term))
    }
}

/// Converted scrollback rows of the previous snapshot, oldest first.
///
/// Scrollback grows at the bottom and, once full, loses rows at the top, so
/// the cached rows normally reappear in the grid shifted up by the number of
/// rows that fell off. A cached row is reused only after it compared equal to
/// the grid row at its new position; a history clear, a reset or a switch to
/// the alternate screen therefore just starts the cache over.
#[derive(Default)]
struct HistoryCache {
    rows: Vec<Arc<[Cell]>>,
}

impl HistoryCache {
    fn refresh(&mut self, grid: &Grid<TermCell>) -> &[Arc<[Cell]>] {
        let history = grid.history_size();
        match self.dropped_rows(grid) {
            Some(dropped) => {
                self.rows.drain(..dropped);
            }
            None => self.rows.clear(),
        }

        let kept = self.rows.len();
        self.rows.extend((kept..history).map(|row| convert_row(grid, history_line(row, history))));
        &self.rows
    }

    /// How many of the oldest cached rows left the grid since the last
    /// refresh, or `None` when the cache does not line up with the grid.
    fn dropped_rows(&self, grid: &Grid<TermCell>) -> Option<usize> {
        let history = grid.history_size();
        let cached = self.rows.len();
        let newest = self.rows.last()?;

        (cached.saturating_sub(history)..cached)
            .filter(|&dropped| {
                row_matches(newest, grid, history_line(cached - 1 - dropped, history))
            })
            .take(MAX_HISTORY_ALIGNMENTS)
            .find(|&dropped| {
                self.rows[dropped..]
                    .iter()
                    .enumerate()
                    .all(|(row, cells)| row_matches(cells, grid, history_line(row, history)))
            })
    }
}

/// Grid line of history row `row`, counting from the oldest.
fn history_line(row: usize, history: usize) -> Line {
    Line(row as i32 - history as i32)
}

fn grid_screen(grid: &Grid<TermCell>, history: &mut HistoryCache) -> Screen {
    let mut rows = history.refresh(grid).to_vec();
    rows.extend((0..grid.screen_lines()).map(|line| convert_row(grid, Line(line as i32))));
    Screen::from_rows(grid.columns(), rows)
}

fn convert_row(grid: &Grid<TermCell>, line: Line) -> Arc<[Cell]> {
    let cells = &grid[line];
    (0..grid.columns())
        .map(|column| convert_cell(&cells[Column(column)]))
        .collect()
}

fn row_matches(cached: &[Cell], grid: &Grid<TermCell>, line: Line) -> bool {
    let cells = &grid[line];
    cached.len() == grid.columns()
        && cached
            .iter()
            .enumerate()
            .all(|(column, cell)| convert_cell(&cells[Column(column)]) == *cell)
}

/// The cursor row counts scrollback rows.
fn cursor<T>(term: &Term<T>) -> Cursor {
    let history = term.grid().history_size();
    let point = term.grid().cursor.point;
    let style = term.cursor_style();
    Cursor {
        row: usize::try_from(history as i32 + point.line.0).unwrap_or(0),
        column: point.column.0,
        visible: term.mode().contains(TermMode::SHOW_CURSOR)
            && style.shape != ansi::CursorShape::Hidden,
        shape: match style.shape {
            ansi::CursorShape::Underline => CursorShape::Underline,
            ansi::CursorShape::Beam => CursorShape::Beam,
            ansi::CursorShape::Block | ansi::CursorShape::HollowBlock | ansi::CursorShape::Hidden => {
                CursorShape::Block
            }
        },
    }
}

/// Never-written and erased cells come out as empty (code point `0`), like
/// the spacer halves of wide characters.
fn convert_cell(cell: &TermCell) -> Cell {
    if cell.is_empty()
        || cell
            .flags
            .intersects(Flags::WIDE_CHAR_SPACER | Flags::LEADING_WIDE_CHAR_SPACER)
    {
        return Cell::default();
    }

    let (fg, bg) = if cell.flags.contains(Flags::INVERSE) {
        (cell.bg, cell.fg)
    } else {
        (cell.fg, cell.bg)
    };
    Cell {
        codepoint: cell.c as u32,
        fg: convert_color(fg),
        bg: convert_color(bg),
    }
}

/// Named colors past the 16 ANSI slots (foreground, background, dim variants)
/// all mean "the default" to the projector.
fn convert_color(color: Color) -> RawColor {
    match color {
        Color::Named(named) => match u8::try_from(named as usize) {
            Ok(index) if index < 16 => RawColor::Indexed(index),
            _ => RawColor::Default,
        },
        Color::Indexed(index) => RawColor::Indexed(index),
        Color::Spec(rgb) => RawColor::Rgb(rgb),
    }
}
