// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Durable per-source state for the comparator (§4.4, §5).

use crate::entities::ComparatorState;
use crate::error::PipelineError;
use async_trait::async_trait;

#[async_trait]
pub trait ComparatorStateStore: Send + Sync {
    /// Loads the persisted snapshot for `source`, or an empty snapshot if
    /// none exists yet.
    async fn load(&self, source: &str) -> Result<ComparatorState, PipelineError>;

    /// Atomically replaces the persisted snapshot for `source`.
    async fn save(&self, source: &str, state: &ComparatorState) -> Result<(), PipelineError>;
}
