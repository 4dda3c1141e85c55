// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Module
//!
//! The bootstrap layer sits **outside** the three enterprise layers (domain,
//! application, infrastructure) and is the only thing a component's `main`
//! links against directly. It provides:
//!
//! - **CLI** - secure argument parsing for the per-component binaries
//! - **Signal handling** - SIGTERM / SIGINT / SIGHUP
//! - **Shutdown coordination** - cancellation token + bounded grace period
//! - **Platform abstraction** - POSIX system info and file sync
//! - **Exit codes** - `sysexits.h`-style process exit status
//! - **Bootstrap logging** - minimal logging before the full subscriber is up
//!
//! Enterprise layers never depend on this crate; this crate may depend on
//! them (see `exit_code`'s `From<cti_pipeline_domain::ErrorClass>`).
//!
//! ## Usage
//!
//! ```no_run
//! use cti_pipeline_bootstrap::{bootstrap_cli, ExitCode};
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let cli = match bootstrap_cli() {
//!         Ok(cli) => cli,
//!         Err(e) => {
//!             eprintln!("{e}");
//!             return std::process::ExitCode::from(ExitCode::UsageError.as_i32() as u8);
//!         }
//!     };
//!
//!     // run_component(cli).await ...
//!     std::process::ExitCode::SUCCESS
//! }
//! ```

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, Cli, ValidatedCli};
pub use exit_code::ExitCode;
pub use shutdown::{CancellationToken, ShutdownCoordinator};
pub use signals::{create_signal_handler, SystemSignals};

/// Parses and validates CLI arguments for a component binary.
///
/// Clap handles `--help`/`--version` itself and exits the process before
/// this function returns in those cases.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
