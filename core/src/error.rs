// SPDX-License-Identifier: Apache-2.0

//! Error kinds for the terminal IME proxy.
//!
//! One variant per failure kind named in the design: spawn failure, terminal
//! mode transitions, PTY writes, malformed UTF-8, and timer scheduling. Most
//! variants stay local to the component that produced them (see each
//! constructor site); only [`ProxyError::SpawnFailed`] and
//! [`ProxyError::Fatal`] are expected to surface all the way to `main`.

use std::io;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ProxyError {
    /// The child process could not be spawned under the PTY at all. Fatal:
    /// the proxy refuses to enter its interactive loop.
    #[error("failed to launch '{command}': {source}")]
    #[diagnostic(
        code(ime_proxy::spawn_failed),
        help("Check that the command exists and is executable, and is on PATH.")
    )]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Raw mode could not be entered. Fatal: the proxy refuses to start.
    #[error("failed to enable terminal raw mode: {0}")]
    #[diagnostic(
        code(ime_proxy::terminal_mode_failure),
        help("The proxy must own a real controlling terminal (a TTY), not a pipe or file.")
    )]
    TerminalModeFailure(#[source] io::Error),

    /// A write to the child's PTY master failed. Recoverable if the child is
    /// still alive (logged, retried next tick); otherwise teardown proceeds.
    #[error("write to child PTY failed: {0}")]
    #[diagnostic(code(ime_proxy::pty_write_failed))]
    PtyWriteFailed(#[source] io::Error),

    /// A chunk of terminal input was not valid UTF-8. Per design, this is a
    /// fail-open condition: the raw bytes are forwarded unclassified. This
    /// variant exists for diagnostics (`--debug` logging), not for control
    /// flow — nothing propagates it as an `Err`.
    #[error("chunk was not valid UTF-8 at byte {valid_up_to}")]
    #[diagnostic(code(ime_proxy::malformed_utf8))]
    MalformedUtf8 { valid_up_to: usize },

    /// The composition timer could not be (re)armed. Treated as an immediate
    /// flush rather than a dropped composition.
    #[error("failed to schedule composition timer: {0}")]
    #[diagnostic(code(ime_proxy::timer_scheduling_failed))]
    TimerSchedulingFailed(String),

    /// The supervisor received a fatal signal or an unrecoverable I/O error
    /// after the interactive loop had already started.
    #[error("fatal error during proxy lifecycle: {0}")]
    #[diagnostic(code(ime_proxy::fatal))]
    Fatal(String),
}

pub type ProxyResult<T> = Result<T, ProxyError>;
