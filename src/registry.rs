//! The set of live terminal sessions.
//!
//! Sessions live in an arena: a session's id is its slot index, so lookups are
//! a bounds check and ids come out in creation order. Slots are never reused.
//! The registry itself never deletes anything; hosts that want the memory back
//! after an exit call [`Registry::remove`], which leaves a tombstone.
//!
//! Every mutation targeting an unknown (or removed) id is silently dropped.
//! Bridge events routinely race with pane teardown, so a late `ScreenUpdated`
//! for a closed pane is expected, not an error.

use crate::launch::{LaunchConfig, LaunchContext};
use crate::screen::{Cursor, Screen, ScreenSource};
use crate::session::{Session, SessionId};
use std::sync::Arc;
use tracing::{debug, trace};

/// Returned by [`Registry::create_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCreated {
    pub id: SessionId,
    pub buffer_name: String,
}

/// What the host should do about a process that exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitNotification {
    pub id: SessionId,
    pub exit_code: i32,
    pub should_close: bool,
}

/// A session the bridge should have a live process for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub id: SessionId,
    pub launch_config: LaunchConfig,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    slots: Vec<Option<Session>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next created session will get.
    pub fn next_id(&self) -> SessionId {
        SessionId(self.slots.len())
    }

    /// Number of live (not removed) sessions.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Creates a session for `command`, or for the configured shell when
    /// `command` is `None`.
    ///
    /// ```
    /// use oni_terminal::config::TerminalSettings;
    /// use oni_terminal::launch::{BridgeEnvironment, LaunchContext};
    /// use oni_terminal::registry::Registry;
    ///
    /// let ctx = LaunchContext::for_current_process(
    ///     TerminalSettings::default(),
    ///     BridgeEnvironment::default(),
    /// );
    /// let mut registry = Registry::new();
    /// let created = registry.create_session(Some("bash"), true, &ctx);
    /// assert_eq!(created.buffer_name, "oni://terminal/0/bash");
    /// assert_eq!(registry.next_id().0, 1);
    /// ```
    pub fn create_session(
        &mut self,
        command: Option<&str>,
        close_on_exit: bool,
        ctx: &LaunchContext,
    ) -> SessionCreated {
        let id = self.next_id();
        let session = Session::new(id, ctx.resolve(command), close_on_exit);
        let buffer_name = session.buffer_name();
        debug!(
            %id,
            executable = %session.launch_config.executable,
            close_on_exit,
            "created terminal session"
        );
        self.slots.push(Some(session));
        SessionCreated { id, buffer_name }
    }

    pub fn resize(&mut self, id: SessionId, rows: usize, columns: usize) {
        self.update_session(id, "resize", |session| {
            session.rows = rows;
            session.columns = columns;
        });
    }

    pub fn on_process_started(&mut self, id: SessionId, pid: u32) {
        self.update_session(id, "process started", |session| session.pid = Some(pid));
    }

    pub fn on_title_changed(&mut self, id: SessionId, title: String) {
        self.update_session(id, "title changed", |session| session.title = Some(title));
    }

    /// Replaces the session's screen and cursor snapshot.
    pub fn on_screen_updated(&mut self, id: SessionId, screen: Arc<Screen>, cursor: Cursor) {
        self.update_session(id, "screen updated", |session| {
            session.screen = screen;
            session.cursor = cursor;
        });
    }

    /// Builds the exit notification for `id`. The registry is left unchanged;
    /// unknown ids are reported as closable.
    pub fn on_process_exited(&self, id: SessionId, exit_code: i32) -> ExitNotification {
        let should_close = self.get(id).is_none_or(|session| session.close_on_exit);
        debug!(%id, exit_code, should_close, "terminal process exited");
        ExitNotification {
            id,
            exit_code,
            should_close,
        }
    }

    /// Live sessions in id order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.slots.iter().flatten()
    }

    /// Tombstones `id`, returning the session if it was live. The id is not
    /// handed out again.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        let removed = self.slots.get_mut(id.0).and_then(Option::take);
        if removed.is_some() {
            debug!(%id, "removed terminal session");
        }
        removed
    }

    /// One request per live session, in id order.
    pub fn spawn_requests(&self) -> Vec<SpawnRequest> {
        self.sessions()
            .map(|session| SpawnRequest {
                id: session.id,
                launch_config: session.launch_config.clone(),
                rows: session.rows,
                columns: session.columns,
            })
            .collect()
    }

    fn update_session(&mut self, id: SessionId, event: &str, f: impl FnOnce(&mut Session)) {
        match self.slots.get_mut(id.0).and_then(Option::as_mut) {
            Some(session) => f(session),
            None => trace!(%id, event, "dropping event for unknown terminal session"),
        }
    }
}

impl ScreenSource for Registry {
    fn current_screen(&self, id: SessionId) -> Option<Arc<Screen>> {
        self.get(id).map(|session| Arc::clone(&session.screen))
    }
}
