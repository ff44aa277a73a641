//! Per-pane terminal session state.

use crate::launch::LaunchConfig;
use crate::screen::{Cursor, Screen};
use std::fmt;
use std::sync::Arc;

/// Rows and columns a session starts with, before the host's first resize.
pub const DEFAULT_ROWS: usize = 40;
pub const DEFAULT_COLUMNS: usize = 40;

/// Identifier of a terminal session. Assigned in creation order, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub usize);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One terminal pane.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub launch_config: LaunchConfig,
    pub rows: usize,
    pub columns: usize,
    pub pid: Option<u32>,
    pub title: Option<String>,
    pub screen: Arc<Screen>,
    pub cursor: Cursor,
    pub close_on_exit: bool,
}

impl Session {
    pub(crate) fn new(id: SessionId, launch_config: LaunchConfig, close_on_exit: bool) -> Self {
        Self {
            id,
            launch_config,
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            pid: None,
            title: None,
            screen: Arc::new(Screen::empty()),
            cursor: Cursor::default(),
            close_on_exit,
        }
    }

    /// Virtual buffer name the editor binds this pane to.
    ///
    /// The executable is inserted as-is, without escaping.
    pub fn buffer_name(&self) -> String {
        buffer_name(self.id, &self.launch_config.executable)
    }
}

/// `oni://terminal/<id>/<executable>`.
pub fn buffer_name(id: SessionId, executable: &str) -> String {
    format!("oni://terminal/{id}/{executable}")
}
