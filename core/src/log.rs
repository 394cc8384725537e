// SPDX-License-Identifier: Apache-2.0

//! Logging setup.
//!
//! A simplified descendant of the teacher's layered `tracing_init.rs`: this
//! proxy only ever needs two writer targets (stderr, and an optional rolling
//! debug log file), so the layer-builder machinery collapses to one function.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;

/// Installs the global tracing subscriber.
///
/// When `debug` is `false`, only `WARN`-and-above goes to stderr, in a
/// compact, timestamp-free form so it does not clobber the child's own
/// screen output. When `debug` is `true`, `DEBUG`-and-above is additionally
/// written to a rolling daily log file under `log_dir` (defaulting to the
/// current directory when `None`), so the terminal itself stays clean while
/// still collecting a durable diagnostic trail.
///
/// Returns the [`tracing_appender::non_blocking::WorkerGuard`] for the file
/// writer, if one was created; the caller must keep it alive for the
/// lifetime of the process or log lines will be dropped on exit.
pub fn init(debug: bool, log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let stderr_filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE))
        .with_target(false)
        .without_time()
        .with_filter(stderr_filter);

    if !debug {
        tracing_subscriber::registry().with(stderr_layer).init();
        return None;
    }

    let dir = log_dir.unwrap_or_else(|| Path::new("."));
    let file_appender = tracing_appender::rolling::daily(dir, "terminal-ime-proxy.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Some(guard)
}
