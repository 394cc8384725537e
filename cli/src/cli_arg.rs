// SPDX-License-Identifier: Apache-2.0

//! Command-line argument definitions.
//!
//! `clap`'s derive API, in the style of the teacher's `cmdr` subcommand
//! config modules: a flat struct of `#[arg(...)]` fields, with the child
//! command and its own arguments captured verbatim via `trailing_var_arg` so
//! this proxy never has to understand the child's own flags.

use clap::Parser;

/// Default composition idle timeout, in milliseconds. Mirrors
/// [`ime_proxy_core::config::DEFAULT_COMPOSITION_TIMEOUT`].
const DEFAULT_TIMEOUT_MS: u64 = 50;

/// Parses `--timeout`, falling back to the default on anything that doesn't
/// parse as a non-negative integer rather than rejecting the invocation —
/// per spec, an invalid `--timeout` value is not a launch error.
fn parse_timeout(raw: &str) -> Result<u64, std::convert::Infallible> {
    Ok(raw.parse().unwrap_or(DEFAULT_TIMEOUT_MS))
}

#[derive(Parser, Debug)]
#[command(
    name = "terminal-ime-proxy",
    about = "Repairs IME/Unicode composition input for a child command run under a PTY",
    version
)]
pub struct CliArgs {
    /// Enable verbose diagnostic logging to a rolling log file.
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Idle timeout in milliseconds before an in-progress composition is
    /// flushed without further input. Invalid values fall back to the default.
    #[arg(long, short = 't', default_value_t = DEFAULT_TIMEOUT_MS, value_parser = parse_timeout)]
    pub timeout: u64,

    /// The child command to run, followed by its own arguments.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}
