// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Event identifier: a 128-bit value printed as 32 lowercase hex digits.
//!
//! Unlike the teacher's `StageId`/`PipelineId` (ULID-based, time-ordered),
//! an `EventId` has no temporal meaning; it is whatever the producing
//! parser chose (often a content hash), so it is a plain fixed-size byte
//! array, not a `GenericId<Marker>`.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit event identifier, unique per event for the lifetime of the
/// Event DB.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId([u8; 16]);

impl EventId {
    /// Parses a 32-character lowercase hex string into an `EventId`.
    pub fn parse(s: &str) -> Result<Self, PipelineError> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PipelineError::invalid_event(format!(
                "event id must be 32 hex characters, got {s:?}"
            )));
        }
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(PipelineError::invalid_event("event id must be lowercase hex"));
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| PipelineError::invalid_event(format!("invalid event id hex: {e}")))?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for EventId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EventId {
    type Error = PipelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.to_hex()
    }
}
