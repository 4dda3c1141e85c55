// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An organization's view onto a source: `inside` (its own network),
/// `threats` (general threat intelligence) or `search` (ad-hoc lookups).
/// The filter evaluates zones in this declared order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessZone {
    Inside,
    Threats,
    Search,
}

impl AccessZone {
    /// Evaluation order required by the filter stage.
    pub const ORDER: [AccessZone; 3] = [AccessZone::Inside, AccessZone::Threats, AccessZone::Search];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessZone::Inside => "inside",
            AccessZone::Threats => "threats",
            AccessZone::Search => "search",
        }
    }
}

impl fmt::Display for AccessZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessZone {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inside" => Ok(AccessZone::Inside),
            "threats" => Ok(AccessZone::Threats),
            "search" => Ok(AccessZone::Search),
            other => Err(PipelineError::invalid_event(format!("unknown access zone {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_order_is_inside_threats_search() {
        assert_eq!(AccessZone::ORDER, [AccessZone::Inside, AccessZone::Threats, AccessZone::Search]);
    }
}
