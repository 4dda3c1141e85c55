// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `Source`: the `<provider>.<channel>` identifier of an external feed.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_PART_LEN: usize = 24;
const MAX_TOTAL_LEN: usize = 32;

/// A feed identifier: `<provider>.<channel>`, each part restricted to
/// `[a-z0-9-]`, the whole identifier at most 32 characters.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Source {
    provider: String,
    channel: String,
}

impl Source {
    pub fn new(provider: impl Into<String>, channel: impl Into<String>) -> Result<Self, PipelineError> {
        let provider = provider.into();
        let channel = channel.into();
        validate_part(&provider)?;
        validate_part(&channel)?;
        let total = provider.len() + 1 + channel.len();
        if total > MAX_TOTAL_LEN {
            return Err(PipelineError::invalid_event(format!(
                "source {provider}.{channel} exceeds {MAX_TOTAL_LEN} characters"
            )));
        }
        Ok(Self { provider, channel })
    }

    pub fn parse(s: &str) -> Result<Self, PipelineError> {
        let (provider, channel) = s
            .split_once('.')
            .ok_or_else(|| PipelineError::invalid_event(format!("source {s:?} must be <provider>.<channel>")))?;
        Self::new(provider, channel)
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

fn validate_part(part: &str) -> Result<(), PipelineError> {
    if part.is_empty() || part.len() > MAX_PART_LEN {
        return Err(PipelineError::invalid_event(format!(
            "source part {part:?} must be 1..={MAX_PART_LEN} characters"
        )));
    }
    if !part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-') {
        return Err(PipelineError::invalid_event(format!(
            "source part {part:?} must match [a-z0-9-]"
        )));
    }
    Ok(())
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.provider, self.channel)
    }
}

impl std::str::FromStr for Source {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Source {
    type Error = PipelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Source> for String {
    fn from(s: Source) -> Self {
        s.to_string()
    }
}
