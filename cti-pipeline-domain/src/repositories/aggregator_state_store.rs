// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Durable on-disk state for the aggregator (§4.3, §5): loaded once at
//! startup, persisted after every mutation-flush. `load(save(s)) == s`
//! for any reachable state (§8).

use crate::entities::AggregatorGroup;
use crate::error::PipelineError;
use crate::value_objects::GroupKey;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait AggregatorStateStore: Send + Sync {
    /// Loads the persisted state, or an empty map if none exists yet.
    async fn load(&self) -> Result<HashMap<GroupKey, AggregatorGroup>, PipelineError>;

    /// Atomically persists the full state (write-to-temp + rename, per
    /// §5's "written atomically").
    async fn save(&self, state: &HashMap<GroupKey, AggregatorGroup>) -> Result<(), PipelineError>;
}
