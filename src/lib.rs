//! # oni-terminal
//!
//! The terminal pane core of a text editor: session bookkeeping, shell launch
//! resolution, and the projection of emulated screens into highlighted text.
//!
//! The core is a pure state machine. A [`Registry`] holds every session, and
//! [`update`] applies one [`Msg`] to it and tells the host what to do next
//! through an [`Effect`]. Processes live behind a [`ProcessBridge`]; the crate
//! ships [`PtyBridge`], which runs each shell in a pseudo-terminal from
//! [portable-pty](https://docs.rs/portable-pty) and emulates it with
//! [alacritty_terminal](https://docs.rs/alacritty_terminal).
//!
//! ## Features
//!
//! - **Pure update loop**: no I/O, no locks; unknown session ids are ignored
//! - **Per-platform shell settings**: parsed from the editor's JSON settings
//! - **Linux bundle sanitizing**: restores the user's `PATH`/`LD_LIBRARY_PATH`
//! - **Highlight projection**: trimmed lines plus run-length color spans, with
//!   16 themable ANSI colors, the 256-color palette and 24-bit color
//! - **PTY bridge**: reader threads, coalesced screen snapshots, key and
//!   bracketed-paste encoding
//!
//! ## Quick Start
//!
//! ```
//! use oni_terminal::colors::TerminalTheme;
//! use oni_terminal::config::TerminalSettings;
//! use oni_terminal::highlight::project_session;
//! use oni_terminal::launch::{BridgeEnvironment, LaunchContext};
//! use oni_terminal::screen::Screen;
//! use oni_terminal::session::SessionId;
//! use oni_terminal::update::{update, Command, Effect, Msg, ServiceMsg, SplitDirection};
//! use oni_terminal::{Cursor, Registry};
//! use std::sync::Arc;
//!
//! let ctx = LaunchContext::for_current_process(
//!     TerminalSettings::default(),
//!     BridgeEnvironment::default(),
//! );
//!
//! // 1. The user asks for a terminal.
//! let (registry, effect) = update(
//!     Registry::new(),
//!     &ctx,
//!     Msg::Command(Command::NewTerminal {
//!         cmd: Some("bash".into()),
//!         split_direction: SplitDirection::Horizontal,
//!         close_on_exit: true,
//!     }),
//! );
//! assert!(matches!(effect, Effect::TerminalCreated { ref name, .. } if name == "oni://terminal/0/bash"));
//!
//! // 2. The bridge reports output.
//! let (registry, _) = update(
//!     registry,
//!     &ctx,
//!     Msg::Service(ServiceMsg::ScreenUpdated {
//!         id: SessionId(0),
//!         screen: Arc::new(Screen::from_lines(&["", "$ ls", ""], 20)),
//!         cursor: Cursor::default(),
//!     }),
//! );
//!
//! // 3. The renderer asks for text.
//! let projection = project_session(&registry, SessionId(0), &TerminalTheme::default());
//! assert_eq!(projection.lines, vec!["$ ls"]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Host editor                           │
//! └──────────────────────────────────────────────────────────────┘
//!        │ Msg                 ▲ Effect              │ render
//!        ▼                     │                     ▼
//! ┌──────────────────────────────────┐   ┌───────────────────────┐
//! │ update()                         │   │ highlight::project    │
//! │ ├─ Registry (arena of Session)   │   │ ├─ TerminalTheme      │
//! │ └─ LaunchContext → LaunchConfig  │   │ └─ Projection         │
//! └──────────────────────────────────┘   └───────────────────────┘
//!        │ spawn_requests()                          ▲ Screen
//!        ▼                                           │
//! ┌──────────────────────────────────────────────────────────────┐
//! │ PtyBridge (ProcessBridge)                                    │
//! │ ├─ portable-pty pair + child per session                     │
//! │ ├─ reader thread → flume → pump thread → TerminalState       │
//! │ └─ Msg::Service(..) → flume → host                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`registry`] | Session arena ([`Registry`]) |
//! | [`session`] | Per-pane state ([`Session`], [`SessionId`]) |
//! | [`update`] | Messages, effects and the transition function |
//! | [`launch`] | Shell and environment resolution ([`LaunchConfig`]) |
//! | [`config`] | Terminal settings ([`TerminalSettings`]) |
//! | [`screen`] | Screen snapshots ([`Screen`], [`Cursor`]) |
//! | [`highlight`] | Screen to lines and color runs |
//! | [`colors`] | Theme colors ([`TerminalTheme`]) |
//! | [`bridge`] | Process lifecycle ([`ProcessBridge`], [`PtyBridge`]) |
//! | [`terminal`] | Emulator wrapper ([`TerminalState`]) |
//! | [`event`] | Emulator events to messages |
//! | [`input`] | Keys and pastes to PTY bytes |
//! | [`error`] | Settings errors ([`ConfigError`]) |
//!
//! ## Logging
//!
//! Everything is logged through [tracing](https://docs.rs/tracing); install a
//! subscriber in the host to see it. Session lifecycle is at `debug`, dropped
//! stale events and screen updates at `trace`, bridge I/O failures at `warn`.

pub mod bridge;
pub mod colors;
pub mod config;
pub mod error;
pub mod event;
pub mod highlight;
pub mod input;
pub mod launch;
pub mod registry;
pub mod screen;
pub mod session;
pub mod terminal;
pub mod update;

pub use bridge::{ProcessBridge, PtyBridge, WorkspaceContext};
pub use colors::{AnsiColor, TerminalTheme, TerminalThemeBuilder};
pub use config::{PlatformFamily, TerminalSettings};
pub use error::ConfigError;
pub use highlight::{HighlightRun, Projection, project, project_session};
pub use launch::{EnvironmentPolicy, LaunchConfig, LaunchContext};
pub use registry::{ExitNotification, Registry, SessionCreated, SpawnRequest};
pub use screen::{Cell, Cursor, RawColor, Screen, ScreenSource};
pub use session::{Session, SessionId};
pub use terminal::TerminalState;
pub use update::{Command, Effect, InputPayload, Msg, ServiceMsg, SplitDirection, update};
