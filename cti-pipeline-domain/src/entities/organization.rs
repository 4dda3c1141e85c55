// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Organizations and the inside-criteria that decide whether an event
//! belongs to an organization's own network (§3, §4.5).

use crate::value_objects::{IpCidr, OrgId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An organization's declaration of what constitutes "its own network".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsideCriteria {
    pub asns: HashSet<u32>,
    pub ccs: HashSet<String>,
    pub fqdns: Vec<String>,
    pub url_substrings: Vec<String>,
    pub ip_networks: Vec<IpCidr>,
}

impl InsideCriteria {
    pub fn is_empty(&self) -> bool {
        self.asns.is_empty() && self.ccs.is_empty() && self.fqdns.is_empty() && self.url_substrings.is_empty() && self.ip_networks.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub enabled: bool,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub org_id: OrgId,
    pub actual_name: String,
    pub full_access: bool,
    pub inside_criteria: InsideCriteria,
    pub notification_preferences: NotificationPreferences,
    pub agreements: HashSet<String>,
}

impl Organization {
    pub fn new(org_id: OrgId, actual_name: impl Into<String>) -> Self {
        Self {
            org_id,
            actual_name: actual_name.into(),
            full_access: false,
            inside_criteria: InsideCriteria::default(),
            notification_preferences: NotificationPreferences::default(),
            agreements: HashSet::new(),
        }
    }
}
