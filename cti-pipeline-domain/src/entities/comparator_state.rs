// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Comparator snapshot state (§3 `ComparatorState`). The delta derivation
//! itself is [`crate::services::comparator::diff`]; this module owns the
//! persisted mapping and the result type that diffing produces.

use crate::entities::Event;
use crate::value_objects::{LifecycleTag, SeriesId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A stable per-entry key: `id` or a parser-declared tuple of identifying
/// fields, already flattened to a string by the caller.
pub type BlKey = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparatorEntry {
    pub last_seen_series: SeriesId,
    pub event_snapshot: Event,
    pub expires: DateTime<Utc>,
}

/// The latest full snapshot for one `source`, keyed by [`BlKey`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparatorState {
    pub entries: HashMap<BlKey, ComparatorEntry>,
}

impl ComparatorState {
    pub fn empty() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Replaces the snapshot wholesale, as the comparator does after every
    /// series resolves (§4.4 "atomically replace the snapshot with the new
    /// one").
    pub fn replace(&mut self, entries: HashMap<BlKey, ComparatorEntry>) {
        self.entries = entries;
    }
}

/// One delta entry produced by comparing two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    pub key: BlKey,
    pub tag: LifecycleTag,
    pub entry: ComparatorEntry,
}
