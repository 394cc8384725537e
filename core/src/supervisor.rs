// SPDX-License-Identifier: Apache-2.0

//! Orchestrates the full interactive proxy lifecycle.
//!
//! Grounded on the teacher's `PTYMux::run` / `run_event_loop` / `cleanup_terminal`
//! shape in `core/pty_mux/mux.rs`: a builder validates configuration and
//! probes the controlling terminal, `run()` enables raw mode, spawns the
//! child, drives a single `tokio::select!` loop, and *always* tears down
//! raw mode and the PTY bridge regardless of how the loop exited.

use std::io::{Read, Write};

use portable_pty::PtySize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::classifier::{self, Classification};
use crate::composition_buffer::CompositionBuffer;
use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::pty_bridge::{PtyBridge, PtyEvent};
use crate::router::{self, SpecialKey};

/// RAII guard that restores cooked terminal mode on drop, so a panic or an
/// early return never leaves the user's shell in raw mode.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> ProxyResult<Self> {
        crossterm::terminal::enable_raw_mode().map_err(|e| {
            ProxyError::TerminalModeFailure(std::io::Error::other(e))
        })?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            warn!(error = %e, "failed to restore cooked terminal mode");
        }
    }
}

/// Reads raw bytes from the controlling terminal's stdin on a dedicated
/// blocking thread and forwards them over an unbounded channel, mirroring
/// the teacher's PTY reader task but sourced from stdin instead of a PTY
/// master.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<Vec<u8>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut buf = [0_u8; 4096];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "stdin reader thread: read error, stopping");
                    break;
                }
            }
        }
    });
    rx
}

fn current_pty_size() -> ProxyResult<PtySize> {
    let (cols, rows) =
        crossterm::terminal::size().map_err(|e| ProxyError::TerminalModeFailure(std::io::Error::other(e)))?;
    Ok(PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    })
}

/// Validates a [`ProxyConfig`] and probes the controlling terminal before
/// the interactive loop starts.
pub struct ProxySupervisorBuilder {
    config: ProxyConfig,
}

impl ProxySupervisorBuilder {
    #[must_use]
    pub fn new(config: ProxyConfig) -> Self {
        Self { config }
    }

    /// Probes terminal size and constructs the supervisor, without yet
    /// entering raw mode or spawning the child (both happen in `run`).
    pub fn build(self) -> ProxyResult<ProxySupervisor> {
        // Probing here (rather than only at PTY-spawn time) fails fast with
        // a clear TerminalModeFailure if stdin/stdout isn't a real TTY,
        // before the child is ever launched.
        let _ = current_pty_size()?;
        Ok(ProxySupervisor {
            config: self.config,
        })
    }
}

/// Outcome of a completed proxy run.
pub struct ProxyOutcome {
    /// The child's exit code, or the `128 + signal` convention if the
    /// supervisor tore down the session due to a fatal signal before the
    /// child reported its own status.
    pub exit_code: i32,
}

pub struct ProxySupervisor {
    config: ProxyConfig,
}

impl ProxySupervisor {
    /// Runs the full proxy session to completion: enters raw mode, spawns
    /// the child under a PTY, drives the event loop, and always cleans up
    /// (raw mode restoration, PTY teardown) before returning — on both the
    /// success and the error path.
    pub async fn run(self) -> ProxyResult<ProxyOutcome> {
        let raw_mode = RawModeGuard::enable()?;
        let size = current_pty_size()?;

        let spawn_result = PtyBridge::spawn(&self.config.command, &self.config.args, size, self.config.cwd.as_deref());
        let (bridge, pty_events) = match spawn_result {
            Ok(pair) => pair,
            Err(e) => {
                drop(raw_mode);
                return Err(e);
            }
        };

        let result = self.run_event_loop(&bridge, pty_events).await;

        // Always cleanup regardless of error, mirroring PTYMux::run: kill the
        // child if it's still live, release the PTY, then restore the
        // terminal mode.
        bridge.shutdown().await;
        drop(raw_mode);

        result
    }

    async fn run_event_loop(
        &self,
        bridge: &PtyBridge,
        mut pty_events: mpsc::UnboundedReceiver<PtyEvent>,
    ) -> ProxyResult<ProxyOutcome> {
        let mut stdin_rx = spawn_stdin_reader();
        let writer = bridge.writer();

        let flush_writer = writer.clone();
        let regular_writer = writer.clone();
        let mut buffer = CompositionBuffer::new(
            self.config.composition_timeout,
            move |text: &str| flush_writer.write(text.as_bytes().to_vec()),
            move |text: &str| regular_writer.write(text.as_bytes().to_vec()),
        );

        #[cfg(unix)]
        let mut resize_signal =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::window_change())
                .map_err(|e| ProxyError::Fatal(format!("failed to install SIGWINCH handler: {e}")))?;
        #[cfg(unix)]
        let mut term_signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(|e| ProxyError::Fatal(format!("failed to install SIGTERM handler: {e}")))?;

        let mut stdout = std::io::stdout();

        loop {
            let sleep_until_deadline = async {
                match buffer.deadline() {
                    Some(deadline) => {
                        tokio::time::sleep_until(deadline).await;
                        true
                    }
                    None => std::future::pending().await,
                }
            };

            #[cfg(unix)]
            tokio::select! {
                maybe_chunk = stdin_rx.recv() => {
                    let Some(chunk) = maybe_chunk else {
                        debug!("stdin closed, flushing and exiting");
                        buffer.flush()?;
                        break;
                    };
                    self.handle_stdin_chunk(&chunk, &mut buffer, bridge)?;
                }
                maybe_event = pty_events.recv() => {
                    match maybe_event {
                        Some(PtyEvent::Output(bytes)) => {
                            stdout
                                .write_all(&bytes)
                                .and_then(|()| stdout.flush())
                                .map_err(ProxyError::PtyWriteFailed)?;
                        }
                        Some(PtyEvent::Exit(status)) => {
                            info!(code = status.exit_code(), "child exited");
                            return Ok(ProxyOutcome {
                                exit_code: status.exit_code() as i32,
                            });
                        }
                        None => break,
                    }
                }
                _ = resize_signal.recv() => {
                    if let Ok(size) = current_pty_size() {
                        let _ = bridge.resize(size);
                    }
                }
                _ = term_signal.recv() => {
                    warn!("received SIGTERM, tearing down");
                    return Ok(ProxyOutcome { exit_code: 128 + 15 });
                }
                _ = tokio::signal::ctrl_c() => {
                    warn!("received interrupt, tearing down");
                    return Ok(ProxyOutcome { exit_code: 128 + 2 });
                }
                fired = sleep_until_deadline => {
                    if fired {
                        let generation = buffer.generation();
                        buffer.on_timeout(generation)?;
                    }
                }
            }

            #[cfg(not(unix))]
            tokio::select! {
                maybe_chunk = stdin_rx.recv() => {
                    let Some(chunk) = maybe_chunk else {
                        buffer.flush()?;
                        break;
                    };
                    self.handle_stdin_chunk(&chunk, &mut buffer, bridge)?;
                }
                maybe_event = pty_events.recv() => {
                    match maybe_event {
                        Some(PtyEvent::Output(bytes)) => {
                            stdout
                                .write_all(&bytes)
                                .and_then(|()| stdout.flush())
                                .map_err(ProxyError::PtyWriteFailed)?;
                        }
                        Some(PtyEvent::Exit(status)) => {
                            return Ok(ProxyOutcome {
                                exit_code: status.exit_code() as i32,
                            });
                        }
                        None => break,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    return Ok(ProxyOutcome { exit_code: 128 + 2 });
                }
                fired = sleep_until_deadline => {
                    if fired {
                        let generation = buffer.generation();
                        buffer.on_timeout(generation)?;
                    }
                }
            }
        }

        Ok(ProxyOutcome { exit_code: 0 })
    }

    fn handle_stdin_chunk(
        &self,
        chunk: &[u8],
        buffer: &mut CompositionBuffer,
        bridge: &PtyBridge,
    ) -> ProxyResult<()> {
        let special = router::route(chunk);
        debug!(?special, len = chunk.len(), "router: special-key decision");
        match special {
            SpecialKey::Interrupt | SpecialKey::EndOfFile | SpecialKey::Enter | SpecialKey::EscapeIntroduced => {
                buffer.flush()?;
                bridge.write(chunk.to_vec())
            }
            SpecialKey::Backspace => {
                if buffer.backspace()? {
                    Ok(())
                } else {
                    bridge.write(chunk.to_vec())
                }
            }
            SpecialKey::None => match std::str::from_utf8(chunk) {
                Ok(text) => {
                    let is_ime = matches!(classifier::classify(text), Classification::Ime(_));
                    buffer.process(text, is_ime)
                }
                Err(e) => {
                    warn!(valid_up_to = e.valid_up_to(), "malformed utf-8 chunk, forwarding raw");
                    bridge.write(chunk.to_vec())
                }
            },
        }
    }
}
