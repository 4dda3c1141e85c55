// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};
use std::fmt;

/// The comparator's verdict for one blacklist-entry key in a delta.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleTag {
    BlNew,
    BlUpdate,
    BlChange,
    BlDelist,
}

impl LifecycleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleTag::BlNew => "bl-new",
            LifecycleTag::BlUpdate => "bl-update",
            LifecycleTag::BlChange => "bl-change",
            LifecycleTag::BlDelist => "bl-delist",
        }
    }
}

impl fmt::Display for LifecycleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
