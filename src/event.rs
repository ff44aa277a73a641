//! Event handling for the emulator.
//!
//! [`SessionEventProxy`] implements alacritty's [`EventListener`] for one
//! session. It turns the events the core cares about into [`Msg`]s tagged with
//! the session id and answers terminal queries by writing back to the PTY.
//!
//! # Event Flow
//!
//! ```text
//! alacritty Term → SessionEventProxy → flume channel → host update loop
//!                        │
//!                        └─ query replies → PTY writer
//! ```
//!
//! | Alacritty Event | Result |
//! |-----------------|--------|
//! | `Event::Title(_)` | `ServiceMsg::ProcessTitleChanged` |
//! | `Event::ResetTitle` | `ProcessTitleChanged` with the executable name |
//! | `Event::PtyWrite(_)` | bytes written to the PTY (cursor reports etc.) |
//! | `Event::Bell` | logged |
//!
//! Everything else is ignored: screen changes are reported by the bridge after
//! each chunk of output, and exits after the child is reaped.
//!
//! [`EventListener`]: alacritty_terminal::event::EventListener

use crate::session::SessionId;
use crate::update::{Msg, ServiceMsg};
use alacritty_terminal::event::{Event, EventListener};
use flume::Sender;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tracing::{trace, warn};

/// Writer half of a PTY, shared between input encoding and query replies.
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

pub struct SessionEventProxy {
    id: SessionId,
    tx: Sender<Msg>,
    default_title: String,
    writer: Option<SharedWriter>,
}

impl SessionEventProxy {
    /// Creates a proxy for session `id`. `default_title` is reported when the
    /// program resets its title.
    ///
    /// ```
    /// use oni_terminal::event::SessionEventProxy;
    /// use oni_terminal::session::SessionId;
    ///
    /// let (tx, rx) = flume::unbounded();
    /// let proxy = SessionEventProxy::new(SessionId(0), tx, "bash");
    /// # drop((proxy, rx));
    /// ```
    pub fn new(id: SessionId, tx: Sender<Msg>, default_title: impl Into<String>) -> Self {
        Self {
            id,
            tx,
            default_title: default_title.into(),
            writer: None,
        }
    }

    /// Routes terminal query replies to `writer`. Without one they are dropped.
    pub fn with_writer(mut self, writer: SharedWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Ignores send errors: they only mean the host stopped listening.
    fn send(&self, msg: ServiceMsg) {
        let _ = self.tx.send(Msg::Service(msg));
    }

    fn title_changed(&self, title: String) {
        self.send(ServiceMsg::ProcessTitleChanged { id: self.id, title });
    }

    fn write_back(&self, data: &str) {
        let Some(writer) = &self.writer else {
            return;
        };
        let mut writer = writer.lock();
        if let Err(err) = writer.write_all(data.as_bytes()).and_then(|()| writer.flush()) {
            warn!(id = %self.id, "failed to answer terminal query: {err}");
        }
    }
}

impl EventListener for SessionEventProxy {
    fn send_event(&self, event: Event) {
        match event {
            Event::Title(title) => self.title_changed(title),
            Event::ResetTitle => self.title_changed(self.default_title.clone()),
            Event::PtyWrite(data) => self.write_back(&data),
            Event::Bell => trace!(id = %self.id, "bell"),
            _ => {}
        }
    }
}
