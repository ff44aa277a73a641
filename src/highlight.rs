//! Screen-to-text projection.
//!
//! [`project`] turns a [`Screen`] into the plain lines an editor buffer shows
//! and the color runs a renderer paints over them:
//!
//! ```text
//! Screen rows → decode cells → color runs per row → trim empty rows → right-trim
//! ```
//!
//! Runs are keyed by line index in the *trimmed* output. A run covers the
//! columns from its start up to the next run's start (or the end of the line).
//!
//! # Run boundaries
//!
//! A new run starts only when a cell's foreground **and** background both
//! differ from the run that was last started. A cell that changes just one of
//! the two stays in the current run. Editors consuming these runs depend on
//! the coarse split, so it is kept as is.

use crate::colors::TerminalTheme;
use crate::screen::{Cell, Screen, ScreenSource};
use crate::session::SessionId;
use alacritty_terminal::vte::ansi::Rgb;
use std::collections::BTreeMap;

/// A span of a line sharing one color pair, starting at `column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRun {
    pub column: usize,
    pub background: Rgb,
    pub foreground: Rgb,
}

/// Output of [`project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// Visible text, leading and trailing empty rows removed, each line
    /// right-trimmed.
    pub lines: Vec<String>,

    /// Runs per line index into `lines`. Lines without runs have no entry.
    pub highlights: BTreeMap<usize, Vec<HighlightRun>>,
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Projects `screen` using `theme` for color resolution.
///
/// ```
/// use oni_terminal::colors::TerminalTheme;
/// use oni_terminal::highlight::project;
/// use oni_terminal::screen::Screen;
///
/// let screen = Screen::from_lines(&["", "hello", ""], 10);
/// let projection = project(&screen, &TerminalTheme::default());
/// assert_eq!(projection.lines, vec!["hello".to_string()]);
/// assert_eq!(projection.highlights[&0].len(), 1);
/// ```
pub fn project(screen: &Screen, theme: &TerminalTheme) -> Projection {
    let mut lines = Vec::with_capacity(screen.total_rows());
    let mut runs = Vec::with_capacity(screen.total_rows());

    for row in 0..screen.total_rows() {
        let (text, row_runs) = layout_row(screen.row(row), theme);
        lines.push(text);
        runs.push(row_runs);
    }

    let is_blank = |line: &String| trim_padding(line).is_empty();
    let Some(start) = lines.iter().position(|line| !is_blank(line)) else {
        return Projection::default();
    };
    // A non-blank line exists, so the reverse scan finds one too.
    let end = lines.iter().rposition(|line| !is_blank(line)).unwrap_or(start);

    let lines: Vec<String> = lines[start..=end]
        .iter()
        .map(|line| trim_padding(line).to_string())
        .collect();

    let highlights = runs
        .into_iter()
        .enumerate()
        .take(end + 1)
        .skip(start)
        .filter(|(_, row_runs)| !row_runs.is_empty())
        .map(|(row, row_runs)| (row - start, row_runs))
        .collect();

    Projection { lines, highlights }
}

/// Projects the current screen of session `id`, or returns an empty
/// projection when `source` has none.
pub fn project_session(
    source: &impl ScreenSource,
    id: SessionId,
    theme: &TerminalTheme,
) -> Projection {
    match source.current_screen(id) {
        Some(screen) => project(&screen, theme),
        None => Projection::default(),
    }
}

/// Decodes one row into its text and color runs.
fn layout_row(cells: &[Cell], theme: &TerminalTheme) -> (String, Vec<HighlightRun>) {
    let mut text = String::with_capacity(cells.len());
    let mut runs: Vec<HighlightRun> = Vec::new();

    for (column, cell) in cells.iter().enumerate() {
        let Some(ch) = printable(cell.codepoint) else {
            text.push(' ');
            continue;
        };
        text.push(ch);

        let foreground = theme.resolve_fg(cell.fg);
        let background = theme.resolve_bg(cell.bg);
        let starts_run = match runs.last() {
            Some(last) => last.foreground != foreground && last.background != background,
            None => true,
        };
        if starts_run {
            runs.push(HighlightRun {
                column,
                background,
                foreground,
            });
        }
    }

    (text, runs)
}

/// Strips the trailing spaces that blank cells decode to. Other Unicode
/// spacing, such as NBSP or the ideographic space, is content.
fn trim_padding(line: &str) -> &str {
    line.trim_end_matches(|c: char| c.is_ascii_whitespace())
}

/// `None` for empty cells and code points that are not Unicode scalar values.
fn printable(codepoint: u32) -> Option<char> {
    if codepoint == 0 {
        return None;
    }
    char::from_u32(codepoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::AnsiColor;
    use crate::screen::RawColor;
    use std::sync::Arc;

    const RED: RawColor = RawColor::Indexed(1);
    const BLUE: RawColor = RawColor::Indexed(4);
    const BLACK: RawColor = RawColor::Indexed(0);
    const WHITE: RawColor = RawColor::Indexed(7);

    fn theme() -> TerminalTheme {
        TerminalTheme::default()
    }

    #[test]
    fn test_all_blank_screen() {
        let projection = project(&Screen::new(3, 5), &theme());
        assert!(projection.lines.is_empty());
        assert!(projection.highlights.is_empty());
    }

    #[test]
    fn test_empty_screen() {
        assert_eq!(project(&Screen::empty(), &theme()), Projection::default());
    }

    #[test]
    fn test_trims_and_rebases() {
        let screen = Screen::from_lines(&["", "hello", ""], 8);
        let projection = project(&screen, &theme());
        assert_eq!(projection.lines, vec!["hello"]);
        assert_eq!(projection.highlights.keys().copied().collect::<Vec<_>>(), vec![0]);

        let theme = theme();
        assert_eq!(
            projection.highlights[&0],
            vec![HighlightRun {
                column: 0,
                background: theme.background(),
                foreground: theme.foreground(),
            }]
        );
    }

    #[test]
    fn test_keeps_interior_blank_lines() {
        let screen = Screen::from_lines(&["", "a", "", "  b  ", ""], 6);
        let projection = project(&screen, &theme());
        assert_eq!(projection.lines, vec!["a", "", "  b"]);
        assert_eq!(
            projection.highlights.keys().copied().collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert_eq!(projection.highlights[&2][0].column, 0);
    }

    #[test]
    fn test_whitespace_only_rows_are_trimmed() {
        let screen = Screen::from_lines(&["   ", "x", "  "], 3);
        let projection = project(&screen, &theme());
        assert_eq!(projection.lines, vec!["x"]);
        assert_eq!(projection.highlights.len(), 1);
        assert!(projection.highlights.contains_key(&0));
    }

    #[test]
    fn test_unicode_spaces_are_content() {
        let screen = Screen::from_lines(&["\u{a0}\u{a0}", "\u{3000} ", ""], 3);
        let projection = project(&screen, &theme());
        assert_eq!(projection.lines, vec!["\u{a0}\u{a0}", "\u{3000}"]);
        assert_eq!(
            projection.highlights.keys().copied().collect::<Vec<_>>(),
            vec![0, 1]
        );
    }

    #[test]
    fn test_run_starts_only_when_both_colors_change() {
        let mut screen = Screen::new(1, 3);
        screen.set_cell(0, 0, Cell::new('a').with_colors(RED, BLACK));
        screen.set_cell(0, 1, Cell::new('b').with_colors(RED, WHITE));
        screen.set_cell(0, 2, Cell::new('c').with_colors(BLUE, WHITE));

        let theme = theme();
        let projection = project(&screen, &theme);
        assert_eq!(projection.lines, vec!["abc"]);
        assert_eq!(
            projection.highlights[&0],
            vec![
                HighlightRun {
                    column: 0,
                    background: theme.ansi(AnsiColor::Black),
                    foreground: theme.ansi(AnsiColor::Red),
                },
                HighlightRun {
                    column: 2,
                    background: theme.ansi(AnsiColor::White),
                    foreground: theme.ansi(AnsiColor::Blue),
                },
            ]
        );
    }

    #[test]
    fn test_compares_against_last_started_run() {
        // fg changes at column 1, bg at column 2: neither cell differs from
        // the run started at column 0 in both channels at once.
        let mut screen = Screen::new(1, 3);
        screen.set_cell(0, 0, Cell::new('a').with_colors(RED, BLACK));
        screen.set_cell(0, 1, Cell::new('b').with_colors(BLUE, BLACK));
        screen.set_cell(0, 2, Cell::new('c').with_colors(RED, WHITE));
        let projection = project(&screen, &theme());
        assert_eq!(projection.highlights[&0].len(), 1);
    }

    #[test]
    fn test_blank_cells_do_not_start_runs() {
        let mut screen = Screen::new(1, 4);
        screen.set_cell(0, 1, Cell::new('x').with_colors(RED, BLACK));
        screen.set_cell(0, 3, Cell::new('y').with_colors(BLUE, WHITE));
        let projection = project(&screen, &theme());
        assert_eq!(projection.lines, vec![" x y"]);
        let columns: Vec<_> = projection.highlights[&0].iter().map(|run| run.column).collect();
        assert_eq!(columns, vec![1, 3]);
    }

    #[test]
    fn test_invalid_codepoints_become_spaces() {
        let mut screen = Screen::new(1, 4);
        screen.set_cell(0, 0, Cell::new('a'));
        for (column, codepoint) in [(1, 0x11_0000), (2, 0xD800), (3, 0)] {
            screen.set_cell(
                0,
                column,
                Cell {
                    codepoint,
                    ..Cell::default()
                },
            );
        }
        let mut screen_with_tail = screen.clone();
        screen_with_tail.set_cell(0, 3, Cell::new('z'));

        assert_eq!(project(&screen, &theme()).lines, vec!["a"]);
        let projection = project(&screen_with_tail, &theme());
        assert_eq!(projection.lines, vec!["a  z"]);
        assert_eq!(projection.highlights[&0].len(), 1);
    }

    #[test]
    fn test_extended_and_truecolor_cells() {
        let theme = theme();
        let orange = Rgb {
            r: 0xff,
            g: 0x88,
            b: 0x00,
        };
        let mut screen = Screen::new(1, 2);
        screen.set_cell(
            0,
            0,
            Cell::new('a').with_colors(RawColor::Indexed(196), RawColor::Indexed(232)),
        );
        screen.set_cell(
            0,
            1,
            Cell::new('b').with_colors(RawColor::Rgb(orange), RawColor::Default),
        );
        let runs = &project(&screen, &theme).highlights[&0];
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].foreground, theme.extended_colors()[196]);
        assert_eq!(runs[0].background, theme.extended_colors()[232]);
        assert_eq!(runs[1].foreground, orange);
        assert_eq!(runs[1].background, theme.background());
    }

    struct OneScreen(Arc<Screen>);

    impl ScreenSource for OneScreen {
        fn current_screen(&self, id: SessionId) -> Option<Arc<Screen>> {
            (id == SessionId(0)).then(|| Arc::clone(&self.0))
        }
    }

    #[test]
    fn test_project_session() {
        let source = OneScreen(Arc::new(Screen::from_lines(&["$ "], 4)));
        assert_eq!(project_session(&source, SessionId(0), &theme()).lines, vec!["$"]);
        assert!(project_session(&source, SessionId(1), &theme()).is_empty());
    }
}
