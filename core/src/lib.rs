// SPDX-License-Identifier: Apache-2.0

//! Core engine for `terminal-ime-proxy`.
//!
//! Classifies raw terminal input, coalesces IME composition fragments into
//! atomic writes, routes special keys around the composition buffer, and
//! bridges a spawned child process through a PTY. The CLI crate wires these
//! pieces together behind argument parsing and a `main` entry point; this
//! crate has no knowledge of `clap` or `std::env::args`.

pub mod classifier;
pub mod composition_buffer;
pub mod config;
pub mod error;
pub mod log;
pub mod pty_bridge;
pub mod router;
pub mod supervisor;

pub use classifier::{Classification, Script, classify, detect_script};
pub use composition_buffer::CompositionBuffer;
pub use config::ProxyConfig;
pub use error::{ProxyError, ProxyResult};
pub use pty_bridge::{PtyBridge, PtyEvent, PtyWriter};
pub use router::{SpecialKey, route};
pub use supervisor::{ProxyOutcome, ProxySupervisor, ProxySupervisorBuilder};
