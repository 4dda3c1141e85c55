// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use crate::value_objects::Source;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The aggregator's `(source, tuple-of-fields)` grouping key. The tuple
/// comes verbatim from the parser's `_group` header (already the
/// concatenation of the fields named by `group_id_components`), so this
/// type only needs to own that string, not interpret it.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    source: Source,
    group: String,
}

impl GroupKey {
    pub fn new(source: Source, group: impl Into<String>) -> Self {
        Self { source, group: group.into() }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.group)
    }
}
