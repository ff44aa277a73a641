//! Process lifecycle bridge.
//!
//! The registry only records what the processes report; a [`ProcessBridge`]
//! owns the processes. [`PtyBridge`] runs every session in its own
//! pseudo-terminal with an alacritty emulator attached.
//!
//! # Threads
//!
//! Each session gets two threads:
//!
//! ```text
//! PTY master ─read 4 KiB─▶ reader thread ─flume─▶ pump thread ─▶ TerminalState
//!                                                     │
//!                                                     └─▶ Msg::Service(..) ─flume─▶ host
//! ```
//!
//! The reader only moves bytes. The pump parses everything that has queued up
//! before taking one snapshot, so a burst of output costs one `ScreenUpdated`
//! instead of one per chunk. Both threads run before the process is spawned;
//! the pump is handed the child afterwards and owns it from then on. When the
//! reader hits end of file the pump reaps the child and reports `ProcessExit`.
//!
//! # Example
//!
//! ```no_run
//! use oni_terminal::bridge::{ProcessBridge, PtyBridge, WorkspaceContext};
//! use oni_terminal::config::TerminalSettings;
//! use oni_terminal::launch::{BridgeEnvironment, LaunchContext};
//! use oni_terminal::registry::Registry;
//! use oni_terminal::update::{update, Command, Msg, SplitDirection};
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = LaunchContext::for_current_process(
//!     TerminalSettings::default(),
//!     BridgeEnvironment::default(),
//! );
//! let mut bridge = PtyBridge::new();
//! let events = bridge.events();
//!
//! let (mut registry, _) = update(
//!     Registry::new(),
//!     &ctx,
//!     Msg::Command(Command::NewTerminal {
//!         cmd: None,
//!         split_direction: SplitDirection::Current,
//!         close_on_exit: true,
//!     }),
//! );
//! bridge.sync(&registry.spawn_requests(), &WorkspaceContext::default());
//!
//! while let Ok(msg) = events.recv() {
//!     let (next, _effect) = update(registry, &ctx, msg);
//!     registry = next;
//! }
//! # Ok(())
//! # }
//! ```

use crate::event::{SessionEventProxy, SharedWriter};
use crate::input::{encode_key, paste_bytes};
use crate::launch::{EnvironmentPolicy, LaunchConfig};
use crate::registry::SpawnRequest;
use crate::screen::{Screen, ScreenSource};
use crate::session::SessionId;
use crate::terminal::{DEFAULT_SCROLLBACK, TerminalState};
use crate::update::{InputPayload, Msg, ServiceMsg};
use anyhow::{Context, Result, bail};
use flume::{Receiver, Sender};
use parking_lot::Mutex;
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace, warn};

type BoxedChild = Box<dyn Child + Send + Sync>;

/// Where new processes start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceContext {
    /// Working directory; `None` leaves the choice to the PTY backend (the
    /// user's home directory).
    pub cwd: Option<PathBuf>,
}

/// Starts and drives the processes behind terminal sessions.
///
/// Implementations report everything that happens to a process, spawn
/// failures included, as [`Msg::Service`] messages tagged with the session id.
pub trait ProcessBridge: ScreenSource {
    /// Starts the process for `request`.
    fn spawn(&mut self, request: &SpawnRequest, workspace: &WorkspaceContext) -> Result<()>;

    /// Writes a key or a paste to the session's process.
    fn send_input(&self, id: SessionId, input: &InputPayload) -> Result<()>;

    fn resize(&self, id: SessionId, rows: usize, columns: usize) -> Result<()>;

    /// Stops tracking `id`, killing its process if it is still running.
    fn close(&mut self, id: SessionId) -> bool;

    /// Every session the bridge tracks with its `(rows, columns)`, in id order.
    fn tracked(&self) -> Vec<(SessionId, (usize, usize))>;

    /// Reconciles the bridge with the sessions the host wants.
    ///
    /// Closes sessions that are no longer requested, spawns new ones and
    /// resizes the ones whose size changed. A failure only affects its own
    /// session: it is logged and the remaining requests are still handled.
    /// Spawn failures have already been reported as `ProcessExit`.
    fn sync(&mut self, requests: &[SpawnRequest], workspace: &WorkspaceContext) {
        let tracked = self.tracked();
        for (id, _) in &tracked {
            if !requests.iter().any(|request| request.id == *id) {
                self.close(*id);
            }
        }

        for request in requests {
            let size = tracked
                .iter()
                .find(|(id, _)| *id == request.id)
                .map(|(_, size)| *size);
            match size {
                None => {
                    if let Err(err) = self.spawn(request, workspace) {
                        warn!(id = %request.id, "skipping terminal session: {err:#}");
                    }
                }
                Some(size) if size != (request.rows, request.columns) => {
                    if let Err(err) = self.resize(request.id, request.rows, request.columns) {
                        warn!(id = %request.id, "skipping terminal resize: {err:#}");
                    }
                }
                Some(_) => {}
            }
        }
    }
}

/// [`ProcessBridge`] backed by `portable-pty` and `alacritty_terminal`.
pub struct PtyBridge {
    sessions: BTreeMap<SessionId, PtySession>,
    /// Sessions whose spawn failed, kept so they are not retried.
    failed: BTreeMap<SessionId, (usize, usize)>,
    tx: Sender<Msg>,
    rx: Receiver<Msg>,
    scrollback: usize,
}

impl Default for PtyBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PtyBridge {
    pub fn new() -> Self {
        Self::with_scrollback(DEFAULT_SCROLLBACK)
    }

    /// A bridge whose emulators keep `scrollback` lines of history.
    pub fn with_scrollback(scrollback: usize) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            sessions: BTreeMap::new(),
            failed: BTreeMap::new(),
            tx,
            rx,
            scrollback,
        }
    }

    /// Messages from every session, in the order each session produced them.
    pub fn events(&self) -> Receiver<Msg> {
        self.rx.clone()
    }

    fn session(&self, id: SessionId) -> Result<&PtySession> {
        match self.sessions.get(&id) {
            Some(session) => Ok(session),
            None => bail!("no running process for terminal session {id}"),
        }
    }
}

impl ScreenSource for PtyBridge {
    fn current_screen(&self, id: SessionId) -> Option<Arc<Screen>> {
        let session = self.sessions.get(&id)?;
        let (screen, _) = session.state.lock().snapshot();
        Some(Arc::new(screen))
    }
}

impl ProcessBridge for PtyBridge {
    fn spawn(&mut self, request: &SpawnRequest, workspace: &WorkspaceContext) -> Result<()> {
        if self.sessions.contains_key(&request.id) || self.failed.contains_key(&request.id) {
            bail!("terminal session {} was already spawned", request.id);
        }

        match PtySession::start(request, workspace, self.scrollback, self.tx.clone()) {
            Ok(session) => {
                self.sessions.insert(request.id, session);
                Ok(())
            }
            Err(err) => {
                warn!(id = %request.id, "failed to start terminal process: {err:#}");
                self.failed
                    .insert(request.id, (request.rows, request.columns));
                let _ = self.tx.send(Msg::Service(ServiceMsg::ProcessExit {
                    id: request.id,
                    exit_code: -1,
                }));
                Err(err)
            }
        }
    }

    fn send_input(&self, id: SessionId, input: &InputPayload) -> Result<()> {
        let session = self.session(id)?;
        let mode = session.state.lock().mode();
        let bytes = match input {
            InputPayload::Key(key) => encode_key(key, mode),
            InputPayload::Paste(text) => paste_bytes(text, mode),
        };

        let mut writer = session.writer.lock();
        writer
            .write_all(&bytes)
            .with_context(|| format!("failed to write input to terminal session {id}"))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush input to terminal session {id}"))?;
        Ok(())
    }

    fn resize(&self, id: SessionId, rows: usize, columns: usize) -> Result<()> {
        if self.failed.contains_key(&id) {
            return Ok(());
        }
        let session = self.session(id)?;
        session
            .master
            .lock()
            .resize(pty_size(rows, columns))
            .with_context(|| format!("failed to resize PTY of terminal session {id}"))?;
        session.state.lock().resize(columns, rows);
        trace!(%id, rows, columns, "resized terminal session");
        Ok(())
    }

    fn close(&mut self, id: SessionId) -> bool {
        let closed =
            self.sessions.remove(&id).is_some() || self.failed.remove(&id).is_some();
        if closed {
            debug!(%id, "closed terminal session");
        }
        closed
    }

    fn tracked(&self) -> Vec<(SessionId, (usize, usize))> {
        let mut tracked: Vec<_> = self
            .sessions
            .iter()
            .map(|(id, session)| {
                let state = session.state.lock();
                (*id, (state.rows(), state.cols()))
            })
            .chain(self.failed.iter().map(|(id, size)| (*id, *size)))
            .collect();
        tracked.sort_by_key(|(id, _)| *id);
        tracked
    }
}

/// One running process and its emulator. Dropping it kills the process.
struct PtySession {
    state: Arc<Mutex<TerminalState>>,
    writer: SharedWriter,
    master: Mutex<Box<dyn MasterPty + Send>>,
    killer: Box<dyn ChildKiller + Send + Sync>,
}

impl PtySession {
    fn start(
        request: &SpawnRequest,
        workspace: &WorkspaceContext,
        scrollback: usize,
        tx: Sender<Msg>,
    ) -> Result<Self> {
        let id = request.id;
        let config = &request.launch_config;

        let pair = native_pty_system()
            .openpty(pty_size(request.rows, request.columns))
            .context("failed to open PTY")?;
        let reader = pair
            .master
            .try_clone_reader()
            .context("failed to get PTY reader")?;
        let writer: SharedWriter = Arc::new(Mutex::new(
            pair.master.take_writer().context("failed to get PTY writer")?,
        ));

        let proxy = SessionEventProxy::new(id, tx.clone(), default_title(&config.executable))
            .with_writer(Arc::clone(&writer));
        let state = Arc::new(Mutex::new(TerminalState::with_scrollback(
            request.columns,
            request.rows,
            scrollback,
            proxy,
        )));

        let (bytes_tx, bytes_rx) = flume::unbounded::<Vec<u8>>();
        let (child_tx, child_rx) = flume::bounded::<BoxedChild>(1);
        thread::Builder::new()
            .name(format!("terminal-{id}-reader"))
            .spawn(move || read_blocking(reader, bytes_tx))
            .context("failed to start PTY reader thread")?;
        let pump_state = Arc::clone(&state);
        let pump_tx = tx.clone();
        thread::Builder::new()
            .name(format!("terminal-{id}-pump"))
            .spawn(move || pump(id, pump_state, bytes_rx, child_rx, pump_tx))
            .context("failed to start terminal pump thread")?;

        let child = pair
            .slave
            .spawn_command(command_builder(config, workspace))
            .with_context(|| format!("failed to spawn `{}`", config.executable))?;
        // The slave must go, or the master never sees end of file.
        drop(pair.slave);

        let killer = child.clone_killer();
        let pid = child.process_id();
        debug!(%id, executable = %config.executable, ?pid, "spawned terminal process");
        if let Some(pid) = pid {
            let _ = tx.send(Msg::Service(ServiceMsg::ProcessStarted { id, pid }));
        }
        hand_off(child, &child_tx)?;

        Ok(Self {
            state,
            writer,
            master: Mutex::new(pair.master),
            killer,
        })
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        // Fails when the process is already gone.
        if let Err(err) = self.killer.kill() {
            trace!("kill on close: {err}");
        }
    }
}

fn command_builder(config: &LaunchConfig, workspace: &WorkspaceContext) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(&config.executable);
    cmd.args(&config.arguments);
    if let Some(cwd) = &workspace.cwd {
        cmd.cwd(cwd);
    }

    if let EnvironmentPolicy::Replace(_) = config.env {
        cmd.env_clear();
    }
    for (key, value) in config.env.variables() {
        cmd.env(key, value);
    }
    cmd.env("TERM", "xterm-256color");
    cmd.env("COLORTERM", "truecolor");
    cmd
}

/// Title reported when a program resets its title: the executable's file name.
fn default_title(executable: &str) -> String {
    Path::new(executable)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| executable.to_string())
}

fn pty_size(rows: usize, columns: usize) -> PtySize {
    PtySize {
        rows: u16::try_from(rows).unwrap_or(u16::MAX),
        cols: u16::try_from(columns).unwrap_or(u16::MAX),
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// Copies PTY output into `bytes_tx` until end of file. Linux reports the
/// end of a PTY as `EIO`, so read errors end the stream too.
fn read_blocking(mut reader: Box<dyn Read + Send>, bytes_tx: Sender<Vec<u8>>) {
    let mut buffer = [0u8; 4096];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                if bytes_tx.send(buffer[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(err) => {
                trace!("PTY read ended: {err}");
                break;
            }
        }
    }
}

/// Gives `child` to its pump thread. If the pump is gone, the child is
/// killed and reaped here.
fn hand_off(child: BoxedChild, child_tx: &Sender<BoxedChild>) -> Result<()> {
    if let Err(flume::SendError(mut child)) = child_tx.send(child) {
        if let Err(err) = child.kill() {
            trace!("kill without pump: {err}");
        }
        child
            .wait()
            .context("failed to reap terminal process without a pump thread")?;
        bail!("terminal pump thread exited before the process started");
    }
    Ok(())
}

/// Parses output for one session until end of file, then reaps the child.
/// Returns without a word if the child never arrives.
fn pump(
    id: SessionId,
    state: Arc<Mutex<TerminalState>>,
    bytes_rx: Receiver<Vec<u8>>,
    child_rx: Receiver<BoxedChild>,
    tx: Sender<Msg>,
) {
    let Ok(mut child) = child_rx.recv() else {
        trace!(%id, "terminal process was never started");
        return;
    };

    while let Ok(bytes) = bytes_rx.recv() {
        let (screen, cursor) = {
            let mut state = state.lock();
            state.process_bytes(&bytes);
            for bytes in bytes_rx.try_iter() {
                state.process_bytes(&bytes);
            }
            state.snapshot()
        };
        trace!(%id, rows = screen.total_rows(), "screen updated");
        let _ = tx.send(Msg::Service(ServiceMsg::ScreenUpdated {
            id,
            screen: Arc::new(screen),
            cursor,
        }));
    }

    let exit_code = match child.wait() {
        Ok(status) => status.exit_code() as i32,
        Err(err) => {
            warn!(%id, "failed to wait for terminal process: {err}");
            -1
        }
    };
    debug!(%id, exit_code, "terminal process finished");
    let _ = tx.send(Msg::Service(ServiceMsg::ProcessExit { id, exit_code }));
}
