// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The Auth DB read port behind the snapshot prefetcher (§4.7).

use crate::entities::AuthSnapshot;
use crate::error::PipelineError;
use async_trait::async_trait;

/// Fetches a fresh [`AuthSnapshot`] from the Auth DB. Implementations
/// read-only; the core never writes through this port.
#[async_trait]
pub trait AuthDataSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<AuthSnapshot, PipelineError>;
}
