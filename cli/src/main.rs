// SPDX-License-Identifier: Apache-2.0

//! `terminal-ime-proxy` — repairs IME composition input for a child CLI
//! program run under a PTY.

mod cli_arg;

use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use cli_arg::CliArgs;
use ime_proxy_core::{ProxyConfig, ProxySupervisorBuilder};

#[tokio::main]
async fn main() {
    // `try_parse` instead of `parse` so a bad invocation exits with the
    // spec's `1` rather than clap's own default usage-error code of `2`;
    // `--help`/`--version` keep clap's own 0-exit display behavior.
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            eprint!("{e}");
            std::process::exit(1);
        }
    };

    let _log_guard = ime_proxy_core::log::init(args.debug, None);

    let Some((command, rest)) = args.command.split_first() else {
        eprintln!("terminal-ime-proxy: no command given");
        std::process::exit(1);
    };

    let config = ProxyConfig::new(command.clone(), rest.to_vec())
        .with_composition_timeout(Duration::from_millis(args.timeout))
        .with_debug(args.debug);

    let supervisor = match ProxySupervisorBuilder::new(config).build() {
        Ok(supervisor) => supervisor,
        Err(e) => {
            eprintln!("terminal-ime-proxy: {e}");
            std::process::exit(1);
        }
    };

    match supervisor.run().await {
        Ok(outcome) => std::process::exit(outcome.exit_code),
        Err(e) => {
            eprintln!("terminal-ime-proxy: {e}");
            std::process::exit(1);
        }
    }
}
