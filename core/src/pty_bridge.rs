// SPDX-License-Identifier: Apache-2.0

//! Spawns a child process under a PTY and bridges its I/O to async channels.
//!
//! Grounded on the three-task split documented in the teacher's
//! `core/pty/common_impl.rs`: a blocking reader task streams PTY output back
//! to the supervisor, a blocking input-handler task owns the master PTY and
//! serializes writes/resizes/close against it, and a small async→sync bridge
//! task forwards commands from the supervisor's `UnboundedSender` into the
//! input handler's `std::sync::mpsc::Sender`. Splitting reads and writes
//! across two OS threads avoids a single blocking read starving queued
//! writes (and vice versa) the way a single combined thread would.

use std::io::{Read, Write};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use portable_pty::{Child, CommandBuilder, ExitStatus, PtySize, native_pty_system};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{ProxyError, ProxyResult};

/// Bytes read from the PTY master in one `read(2)` call. Matches the
/// teacher's `READ_BUFFER_SIZE`.
const READ_BUFFER_SIZE: usize = 4096;

/// How long the input-handler thread blocks on its channel between checks of
/// whether it should keep running. Short enough that `Close` is noticed
/// promptly, long enough to not busy-loop.
const INPUT_HANDLER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Events produced by the PTY reader task.
#[derive(Debug)]
pub enum PtyEvent {
    /// A chunk of raw bytes read from the child's stdout/stderr (merged, as
    /// PTYs do).
    Output(Vec<u8>),
    /// The child process has exited.
    Exit(ExitStatus),
}

/// Commands accepted by the PTY input-handler task.
#[derive(Debug)]
enum PtyInput {
    Write(Vec<u8>),
    Resize(PtySize),
    Close,
}

/// Shared handle to the spawned child, so both the bridge (for `kill`) and
/// the reader task (for the final `wait` once output EOFs) can reach it
/// without either side owning it outright.
type SharedChild = Arc<Mutex<Box<dyn Child + Send + Sync>>>;

/// Owns the spawned child and the channels needed to drive it.
///
/// `write` and `resize` are cheap, non-blocking sends onto an unbounded
/// channel; the actual blocking I/O happens on the dedicated OS threads
/// spawned by [`PtyBridge::spawn`]. `kill` reaches the child directly through
/// the shared handle instead of going through that channel, since it must
/// take effect even if the input-handler thread is wedged in a blocking
/// write.
pub struct PtyBridge {
    input_tx: mpsc::UnboundedSender<PtyInputCommand>,
    child: SharedChild,
    reader_task: JoinHandle<()>,
    bridge_task: JoinHandle<()>,
}

/// Internal alias kept distinct from the blocking-thread-local [`PtyInput`]
/// so the async side can evolve (e.g. add commands) without touching the
/// `std::sync::mpsc` boundary type.
type PtyInputCommand = PtyInput;

impl PtyBridge {
    /// Spawns `command` under a fresh PTY sized `size`, wiring up the reader,
    /// input-handler, and bridge tasks. Returns the bridge handle plus the
    /// unbounded receiver the supervisor should poll in its `select!` loop
    /// for [`PtyEvent`]s.
    pub fn spawn(
        command: &str,
        args: &[String],
        size: PtySize,
        cwd: Option<&str>,
    ) -> ProxyResult<(Self, mpsc::UnboundedReceiver<PtyEvent>)> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(size)
            .map_err(|e| ProxyError::SpawnFailed {
                command: command.to_string(),
                source: std::io::Error::other(e),
            })?;

        let mut cmd = CommandBuilder::new(command);
        cmd.args(args);
        cmd.env("TERM", "xterm-256color");
        match cwd {
            Some(dir) => cmd.cwd(dir),
            None => {
                if let Ok(dir) = std::env::current_dir() {
                    cmd.cwd(dir);
                }
            }
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| ProxyError::SpawnFailed {
                command: command.to_string(),
                source: std::io::Error::other(e),
            })?;
        // The slave end is only needed to spawn the child; drop it so EOF is
        // observable on the master once the child exits.
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| ProxyError::SpawnFailed {
                command: command.to_string(),
                source: std::io::Error::other(e),
            })?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| ProxyError::SpawnFailed {
                command: command.to_string(),
                source: std::io::Error::other(e),
            })?;

        let (event_tx, event_rx) = mpsc::unbounded_channel::<PtyEvent>();
        let (std_tx, std_rx) = std_mpsc::channel::<PtyInput>();
        let (async_tx, mut async_rx) = mpsc::unbounded_channel::<PtyInputCommand>();

        let shared_child: SharedChild = Arc::new(Mutex::new(child));

        let reader_event_tx = event_tx.clone();
        let reader_child = shared_child.clone();
        let reader_task = tokio::task::spawn_blocking(move || {
            let mut buf = [0_u8; READ_BUFFER_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if reader_event_tx
                            .send(PtyEvent::Output(buf[..n].to_vec()))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "pty reader thread: read error, stopping");
                        break;
                    }
                }
            }
            let status = reader_child
                .lock()
                .unwrap()
                .wait()
                .unwrap_or_else(|_| ExitStatus::with_exit_code(1));
            let _ = reader_event_tx.send(PtyEvent::Exit(status));
            debug!("pty reader task finished");
        });

        let input_handler_task = std::thread::spawn(move || {
            let mut master = pair.master;
            let mut writer = writer;
            loop {
                match std_rx.recv_timeout(INPUT_HANDLER_POLL_INTERVAL) {
                    Ok(PtyInput::Write(bytes)) => {
                        if let Err(e) = writer.write_all(&bytes) {
                            warn!(error = %e, "pty input handler: write failed");
                        }
                    }
                    Ok(PtyInput::Resize(size)) => {
                        if let Err(e) = master.resize(size) {
                            warn!(error = %e, "pty input handler: resize failed");
                        }
                    }
                    Ok(PtyInput::Close) => break,
                    Err(std_mpsc::RecvTimeoutError::Timeout) => continue,
                    Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("pty input handler task finished");
        });

        // Bridge: forwards commands from the async world into the blocking
        // handler thread's std channel, so the public API stays async
        // without the handler thread needing a tokio runtime.
        let bridge_task = tokio::spawn(async move {
            while let Some(cmd) = async_rx.recv().await {
                if std_tx.send(cmd).is_err() {
                    break;
                }
            }
            debug!("pty bridge task finished");
        });

        // input_handler_task is detached on purpose: it is joined implicitly
        // by process exit, and its lifetime is bounded by the Close command
        // sent from Drop/kill.
        std::mem::forget(input_handler_task);

        Ok((
            Self {
                input_tx: async_tx,
                child: shared_child,
                reader_task,
                bridge_task,
            },
            event_rx,
        ))
    }

    /// Writes raw bytes to the child's PTY master.
    pub fn write(&self, bytes: Vec<u8>) -> ProxyResult<()> {
        self.writer().write(bytes)
    }

    /// Propagates a terminal resize to the child's PTY.
    pub fn resize(&self, size: PtySize) -> ProxyResult<()> {
        self.writer().resize(size)
    }

    /// Returns a cheaply cloneable write handle, for composition buffer
    /// sinks or other callbacks that must write to the child without owning
    /// the whole bridge.
    #[must_use]
    pub fn writer(&self) -> PtyWriter {
        PtyWriter {
            tx: self.input_tx.clone(),
        }
    }

    /// Sends termination to the child and releases the PTY (spec.md §4.4).
    /// Mirrors the teacher's "kill child then send Close" shutdown ordering:
    /// the child is signaled first so the reader thread's blocking `read`
    /// unblocks with EOF, then the input-handler thread is told to stop.
    pub fn kill(&self) {
        if let Ok(mut child) = self.child.lock() {
            if let Err(e) = child.kill() {
                warn!(error = %e, "pty bridge: failed to kill child");
            }
        }
        self.close();
    }

    /// Requests that the input-handler thread stop, without killing the
    /// child. Called by [`PtyBridge::kill`] after the child has already been
    /// signaled; exposed separately for callers that only need to tear down
    /// the handler thread (e.g. after the child has already exited on its
    /// own).
    pub fn close(&self) {
        let _ = self.input_tx.send(PtyInput::Close);
    }

    /// Kills the child (if still alive), releases the PTY, and aborts the
    /// reader and bridge tasks. Called during supervisor cleanup on every
    /// exit path per spec.md §4.5.
    pub async fn shutdown(self) {
        self.kill();
        self.reader_task.abort();
        self.bridge_task.abort();
    }
}

/// A cheaply cloneable handle for writing to / resizing a [`PtyBridge`]
/// without holding on to the bridge itself.
#[derive(Clone)]
pub struct PtyWriter {
    tx: mpsc::UnboundedSender<PtyInputCommand>,
}

impl PtyWriter {
    pub fn write(&self, bytes: Vec<u8>) -> ProxyResult<()> {
        self.tx
            .send(PtyInput::Write(bytes))
            .map_err(|_| ProxyError::PtyWriteFailed(std::io::Error::other("pty input channel closed")))
    }

    pub fn resize(&self, size: PtySize) -> ProxyResult<()> {
        self.tx
            .send(PtyInput::Resize(size))
            .map_err(|_| ProxyError::PtyWriteFailed(std::io::Error::other("pty input channel closed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_size() -> PtySize {
        PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    #[tokio::test]
    async fn cat_echoes_written_bytes_back() {
        let (bridge, mut events) = PtyBridge::spawn("cat", &[], small_size(), None).unwrap();
        bridge.write(b"hello\n".to_vec()).unwrap();

        let mut collected = Vec::new();
        while let Some(event) = events.recv().await {
            match event {
                PtyEvent::Output(bytes) => {
                    collected.extend(bytes);
                    if collected.windows(6).any(|w| w == b"hello\n") {
                        break;
                    }
                }
                PtyEvent::Exit(_) => break,
            }
        }
        assert!(collected.windows(6).any(|w| w == b"hello\n"));

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn kill_terminates_a_long_running_child() {
        let (bridge, mut events) =
            PtyBridge::spawn("sleep", &["300".into()], small_size(), None).unwrap();

        bridge.kill();

        let mut exited = false;
        while let Some(event) = events.recv().await {
            if matches!(event, PtyEvent::Exit(_)) {
                exited = true;
                break;
            }
        }
        assert!(exited, "killed child should report an exit event");
    }

    #[tokio::test]
    async fn shell_exit_status_is_reported() {
        let (bridge, mut events) = PtyBridge::spawn("sh", &["-c".into(), "exit 7".into()], small_size(), None)
            .unwrap();

        let mut exit_code = None;
        while let Some(event) = events.recv().await {
            if let PtyEvent::Exit(status) = event {
                exit_code = Some(status.exit_code());
                break;
            }
        }
        assert_eq!(exit_code, Some(7));
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn missing_binary_reports_spawn_failed() {
        let result = PtyBridge::spawn("definitely-not-a-real-binary-xyz", &[], small_size(), None);
        assert!(matches!(result, Err(ProxyError::SpawnFailed { .. })));
    }
}
