// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distribution restriction declared by the producing source.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Restriction {
    Public,
    NeedToKnow,
    Internal,
}

impl Restriction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Restriction::Public => "public",
            Restriction::NeedToKnow => "need-to-know",
            Restriction::Internal => "internal",
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Restriction {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Restriction::Public),
            "need-to-know" => Ok(Restriction::NeedToKnow),
            "internal" => Ok(Restriction::Internal),
            other => Err(PipelineError::invalid_event(format!("unknown restriction {other:?}"))),
        }
    }
}
