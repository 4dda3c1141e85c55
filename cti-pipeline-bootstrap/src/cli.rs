// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Every component binary (`parser`, `aggregator`, `comparator`, `filter`,
//! `anonymizer`, `recorder`, `counter`) shares the same small surface: a
//! config file path, an optional prefetch-count override, and a verbosity
//! flag. There is no per-command subtree the way a multi-purpose CLI would
//! have one — each binary *is* its own command.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. Cli::parse()                    │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validate_cli()                  │  Path / value validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Raw CLI arguments, shared by every component binary.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the component's INI configuration file.
    #[arg(long, short = 'c')]
    pub config: PathBuf,

    /// Overrides the `prefetch_count` set in the configuration file.
    #[arg(long)]
    pub prefetch_count: Option<u16>,

    /// Enables debug-level logging regardless of configuration.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// CLI validation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),
}

/// Validated CLI configuration handed to a component's `main`.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub config: PathBuf,
    pub prefetch_count: Option<u16>,
    pub verbose: bool,
}

/// Parses `std::env::args()` and validates the result.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate_cli(Cli::parse())
}

/// Validates an already-parsed [`Cli`]. Exposed separately so tests can
/// exercise validation without going through `std::env::args()`.
pub fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    if !cli.config.exists() {
        return Err(ParseError::ConfigNotFound(cli.config));
    }

    if let Some(count) = cli.prefetch_count {
        if count == 0 {
            return Err(ParseError::InvalidValue {
                arg: "prefetch-count".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
    }

    Ok(ValidatedCli {
        config: cli.config,
        prefetch_count: cli.prefetch_count,
        verbose: cli.verbose,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_config_file() {
        let cli = Cli {
            config: PathBuf::from("/nonexistent/path/to/config.ini"),
            prefetch_count: None,
            verbose: false,
        };
        assert!(matches!(validate_cli(cli), Err(ParseError::ConfigNotFound(_))));
    }

    #[test]
    fn rejects_zero_prefetch_count() {
        let tmp = std::env::temp_dir().join("cti-pipeline-cli-test-config.ini");
        std::fs::write(&tmp, "[broker]\n").unwrap();

        let cli = Cli {
            config: tmp.clone(),
            prefetch_count: Some(0),
            verbose: false,
        };
        assert!(matches!(validate_cli(cli), Err(ParseError::InvalidValue { .. })));

        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn accepts_valid_arguments() {
        let tmp = std::env::temp_dir().join("cti-pipeline-cli-test-config-2.ini");
        std::fs::write(&tmp, "[broker]\n").unwrap();

        let cli = Cli {
            config: tmp.clone(),
            prefetch_count: Some(50),
            verbose: true,
        };
        let validated = validate_cli(cli).unwrap();
        assert_eq!(validated.prefetch_count, Some(50));
        assert!(validated.verbose);

        std::fs::remove_file(&tmp).ok();
    }
}
