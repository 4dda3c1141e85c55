// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Blacklist records: an [`Event`] with a required `expires` and the
//! lifecycle tag the comparator attaches to it.

use crate::entities::Event;
use crate::error::PipelineError;
use crate::value_objects::LifecycleTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlRecord {
    pub event: Event,
    pub expires: DateTime<Utc>,
    pub lifecycle: LifecycleTag,
}

impl BlRecord {
    /// Wraps an event as a blacklist record, requiring `event.expires` to
    /// be set and using it as the record's `expires`.
    pub fn new(event: Event, lifecycle: LifecycleTag) -> Result<Self, PipelineError> {
        let expires = event
            .expires
            .ok_or_else(|| PipelineError::invalid_event(format!("blacklist event {} is missing expires", event.id)))?;
        Ok(Self { event, expires, lifecycle })
    }
}
