// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction Module
//!
//! Platform-specific operating system functionality, behind a trait so the
//! rest of the bootstrap layer never needs `#[cfg]`.
//!
//! ## Architecture Pattern
//!
//! Following hexagonal architecture principles:
//! - **Interface**: `Platform` trait defines the contract
//! - **Implementation**: `UnixPlatform` (POSIX, the only supported target)
//! - **Selection**: Compile-time via `create_platform`
//!
//! Components in this pipeline run as long-lived daemons on Linux hosts; a
//! Windows implementation was dropped rather than carried as dead stub code
//! (see DESIGN.md).
//!
//! ## Usage
//!
//! ```rust
//! use cti_pipeline_bootstrap::platform::create_platform;
//!
//! let platform = create_platform();
//! println!("Running on: {}", platform.platform_name());
//! println!("CPU cores: {}", platform.cpu_count());
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod unix;

pub use unix::UnixPlatform;

/// Platform-specific errors
#[derive(Debug, Error)]
pub enum PlatformError {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Feature not supported on this platform
    #[error("Not supported on this platform: {0}")]
    NotSupported(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Generic platform error
    #[error("Platform error: {0}")]
    Other(String),
}

/// Platform abstraction trait for OS-specific operations
///
/// ## Design Principles
///
/// - **Stateless**: all methods are stateless and thread-safe
/// - **Async-aware**: file operations are async-compatible
/// - **Error-handling**: all fallible operations return `Result`
#[async_trait]
pub trait Platform: Send + Sync {
    /// Page size in bytes, used for state-store write buffer alignment.
    fn page_size(&self) -> usize;

    /// Number of logical CPUs available to the process.
    fn cpu_count(&self) -> usize;

    /// Total physical memory in bytes.
    fn total_memory(&self) -> Result<u64, PlatformError>;

    /// Available (free) memory in bytes.
    fn available_memory(&self) -> Result<u64, PlatformError>;

    /// Platform-specific line separator.
    fn line_separator(&self) -> &'static str;

    /// Path separator used in PATH-like environment variables.
    fn path_separator(&self) -> char;

    /// Platform identifier, e.g. `"linux"`.
    fn platform_name(&self) -> &'static str;

    /// System temporary directory, used as the state store's staging area
    /// for write-then-rename.
    fn temp_dir(&self) -> PathBuf;

    /// Whether the process is running with elevated privileges.
    fn is_elevated(&self) -> bool;

    /// Set Unix permission bits on a path.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError>;

    /// Whether `path` points to an executable file.
    fn is_executable(&self, path: &Path) -> bool;

    /// Flush a file's buffers to disk. Used by the state stores after the
    /// rename step of write-then-rename to make the new snapshot durable.
    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError>;
}

type PlatformImpl = UnixPlatform;

/// Create the platform-specific implementation for the current OS.
pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_platform() {
        let platform = create_platform();
        assert!(platform.cpu_count() >= 1);
        let page_size = platform.page_size();
        assert!(page_size >= 512);
        assert!(page_size <= 65536);
        assert!(!platform.platform_name().is_empty());
    }

    #[test]
    fn test_line_separator() {
        let platform = create_platform();
        assert_eq!(platform.line_separator(), "\n");
    }

    #[test]
    fn test_path_separator() {
        let platform = create_platform();
        assert_eq!(platform.path_separator(), ':');
    }
}
