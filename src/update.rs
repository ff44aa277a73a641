//! Messages, effects and the transition function between them.
//!
//! The host feeds every terminal-related event into [`update`] from a single
//! loop and acts on the returned [`Effect`]. `update` never performs I/O:
//! starting processes and writing input are the bridge's job.

use crate::launch::LaunchContext;
use crate::registry::{ExitNotification, Registry};
use crate::screen::{Cursor, Screen};
use crate::session::SessionId;
use std::sync::Arc;
use tracing::trace;

/// Where the host should open a new terminal pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitDirection {
    /// Replace the buffer in the current window.
    #[default]
    Current,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    NewTerminal {
        /// Explicit command line; `None` launches the configured shell.
        cmd: Option<String>,
        split_direction: SplitDirection,
        close_on_exit: bool,
    },
}

/// Events reported by the process bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceMsg {
    ProcessStarted {
        id: SessionId,
        pid: u32,
    },
    ProcessTitleChanged {
        id: SessionId,
        title: String,
    },
    ScreenUpdated {
        id: SessionId,
        screen: Arc<Screen>,
        cursor: Cursor,
    },
    ProcessExit {
        id: SessionId,
        exit_code: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Command(Command),
    Resized {
        id: SessionId,
        rows: usize,
        columns: usize,
    },
    KeyPressed {
        id: SessionId,
        key: String,
    },
    Pasted {
        id: SessionId,
        text: String,
    },
    Service(ServiceMsg),
}

/// Input destined for a session's process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPayload {
    /// A key in the editor's key notation, e.g. `"ctrl-c"` or `"<CR>"`.
    Key(String),
    Paste(String),
}

/// What the host should do after an [`update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Nothing,
    /// Open a pane bound to the virtual buffer `name`.
    TerminalCreated {
        name: String,
        split_direction: SplitDirection,
    },
    TerminalExit(ExitNotification),
    SendInput {
        id: SessionId,
        input: InputPayload,
    },
}

/// Applies `msg` to the registry.
///
/// ```
/// use oni_terminal::config::TerminalSettings;
/// use oni_terminal::launch::{BridgeEnvironment, LaunchContext};
/// use oni_terminal::registry::Registry;
/// use oni_terminal::update::{update, Command, Effect, Msg, SplitDirection};
///
/// let ctx = LaunchContext::for_current_process(
///     TerminalSettings::default(),
///     BridgeEnvironment::default(),
/// );
/// let (registry, effect) = update(
///     Registry::new(),
///     &ctx,
///     Msg::Command(Command::NewTerminal {
///         cmd: Some("zsh".into()),
///         split_direction: SplitDirection::Vertical,
///         close_on_exit: true,
///     }),
/// );
/// assert_eq!(registry.len(), 1);
/// assert_eq!(
///     effect,
///     Effect::TerminalCreated {
///         name: "oni://terminal/0/zsh".into(),
///         split_direction: SplitDirection::Vertical,
///     }
/// );
/// ```
pub fn update(mut registry: Registry, ctx: &LaunchContext, msg: Msg) -> (Registry, Effect) {
    let effect = match msg {
        Msg::Command(Command::NewTerminal {
            cmd,
            split_direction,
            close_on_exit,
        }) => {
            let created = registry.create_session(cmd.as_deref(), close_on_exit, ctx);
            Effect::TerminalCreated {
                name: created.buffer_name,
                split_direction,
            }
        }
        Msg::Resized { id, rows, columns } => {
            registry.resize(id, rows, columns);
            Effect::Nothing
        }
        Msg::KeyPressed { id, key } => send_input(&registry, id, InputPayload::Key(key)),
        Msg::Pasted { id, text } => send_input(&registry, id, InputPayload::Paste(text)),
        Msg::Service(ServiceMsg::ProcessStarted { id, pid }) => {
            registry.on_process_started(id, pid);
            Effect::Nothing
        }
        Msg::Service(ServiceMsg::ProcessTitleChanged { id, title }) => {
            registry.on_title_changed(id, title);
            Effect::Nothing
        }
        Msg::Service(ServiceMsg::ScreenUpdated { id, screen, cursor }) => {
            registry.on_screen_updated(id, screen, cursor);
            Effect::Nothing
        }
        Msg::Service(ServiceMsg::ProcessExit { id, exit_code }) => {
            Effect::TerminalExit(registry.on_process_exited(id, exit_code))
        }
    };
    (registry, effect)
}

fn send_input(registry: &Registry, id: SessionId, input: InputPayload) -> Effect {
    if registry.get(id).is_none() {
        trace!(%id, "dropping input for unknown terminal session");
        return Effect::Nothing;
    }
    Effect::SendInput { id, input }
}
