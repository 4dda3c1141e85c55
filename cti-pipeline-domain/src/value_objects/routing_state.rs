// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The first segment of a routing key: which stage produced the message.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingState {
    Parsed,
    Aggregated,
    Enriched,
    Compared,
    Filtered,
    Recorded,
}

impl RoutingState {
    pub const ALL: [RoutingState; 6] = [
        RoutingState::Parsed,
        RoutingState::Aggregated,
        RoutingState::Enriched,
        RoutingState::Compared,
        RoutingState::Filtered,
        RoutingState::Recorded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingState::Parsed => "parsed",
            RoutingState::Aggregated => "aggregated",
            RoutingState::Enriched => "enriched",
            RoutingState::Compared => "compared",
            RoutingState::Filtered => "filtered",
            RoutingState::Recorded => "recorded",
        }
    }
}

impl fmt::Display for RoutingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoutingState {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| PipelineError::invalid_config(format!("unknown routing state {s:?}")))
    }
}
