// SPDX-License-Identifier: Apache-2.0

//! Proxy configuration.
//!
//! A small value object analogous to the teacher's `PtyConfig`: built once by
//! the CLI crate from parsed arguments and passed into the supervisor
//! builder. Kept deliberately flat — there is no option-list/accumulator
//! builder here because every field is required or has one obvious default,
//! unlike `PtyConfig`'s open-ended `PtyConfigOption` set.

use std::time::Duration;

/// Default idle window before an in-progress IME composition is flushed
/// without further input.
pub const DEFAULT_COMPOSITION_TIMEOUT: Duration = Duration::from_millis(50);

/// Everything the supervisor needs to launch and run the proxied child.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// The child command to execute.
    pub command: String,
    /// Arguments passed to the child command.
    pub args: Vec<String>,
    /// Working directory for the child; `None` inherits the proxy's cwd.
    pub cwd: Option<String>,
    /// How long the composition buffer waits for further IME input before
    /// flushing on its own.
    pub composition_timeout: Duration,
    /// Whether verbose diagnostic logging is enabled (wired to `--debug`).
    pub debug: bool,
}

impl ProxyConfig {
    #[must_use]
    pub fn new(command: String, args: Vec<String>) -> Self {
        Self {
            command,
            args,
            cwd: None,
            composition_timeout: DEFAULT_COMPOSITION_TIMEOUT,
            debug: false,
        }
    }

    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn with_composition_timeout(mut self, timeout: Duration) -> Self {
        self.composition_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
