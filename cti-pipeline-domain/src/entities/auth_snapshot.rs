// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The Auth-data snapshot (§4.7, dependency-order item 6): an immutable,
//! in-memory view of the authorization graph, swapped atomically by
//! pointer under a single writer. Filter and anonymizer query only this;
//! they never open the Auth DB themselves.

use crate::entities::{Organization, Subsource};
use crate::value_objects::{AccessZone, OrgId, Source};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `HashMap` keys must serialize to JSON object keys, so `(Source,
/// AccessZone)` is flattened to `"<source>|<zone>"` rather than kept as a
/// tuple.
fn subsource_key(source: &Source, zone: AccessZone) -> String {
    format!("{source}|{zone}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub organizations: HashMap<OrgId, Organization>,
    subsources: HashMap<String, Vec<Subsource>>,
}

impl AuthSnapshot {
    pub fn new(fetched_at: DateTime<Utc>, organizations: HashMap<OrgId, Organization>, subsources_by_key: HashMap<String, Vec<Subsource>>) -> Self {
        Self { fetched_at, organizations, subsources: subsources_by_key }
    }

    pub fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self::new(fetched_at, HashMap::new(), HashMap::new())
    }

    /// Builds a snapshot from the subsource list the Auth DB returns,
    /// grouping by `(source, zone)`.
    pub fn from_subsources(fetched_at: DateTime<Utc>, organizations: HashMap<OrgId, Organization>, subsources: Vec<Subsource>) -> Self {
        let mut by_key: HashMap<String, Vec<Subsource>> = HashMap::new();
        for subsource in subsources {
            by_key.entry(subsource_key(&subsource.source, subsource.zone)).or_default().push(subsource);
        }
        Self::new(fetched_at, organizations, by_key)
    }

    pub fn subsources_for(&self, source: &Source, zone: AccessZone) -> &[Subsource] {
        self.subsources.get(&subsource_key(source, zone)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn organization(&self, org_id: &OrgId) -> Option<&Organization> {
        self.organizations.get(org_id)
    }

    /// §4.7's soft alarm threshold: the snapshot is older than
    /// `tolerance_for_outdated` but still usable.
    pub fn is_stale(&self, now: DateTime<Utc>, tolerance: Duration) -> bool {
        now - self.fetched_at > tolerance
    }

    /// §4.7's hard stop-serving threshold.
    pub fn is_unusable(&self, now: DateTime<Utc>, tolerance_on_error: Duration) -> bool {
        now - self.fetched_at > tolerance_on_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::subsource::OrgPredicate;

    #[test]
    fn groups_subsources_by_source_and_zone() {
        let source = Source::parse("abuse-ch.feodo").unwrap();
        let subsource = Subsource {
            source: source.clone(),
            zone: AccessZone::Inside,
            org_id: OrgId::parse("example.com").unwrap(),
            predicate: OrgPredicate::default(),
        };
        let snapshot = AuthSnapshot::from_subsources(Utc::now(), HashMap::new(), vec![subsource]);
        assert_eq!(snapshot.subsources_for(&source, AccessZone::Inside).len(), 1);
        assert_eq!(snapshot.subsources_for(&source, AccessZone::Threats).len(), 0);
    }

    #[test]
    fn staleness_respects_tolerance() {
        let snapshot = AuthSnapshot::empty(Utc::now() - Duration::seconds(120));
        assert!(snapshot.is_stale(Utc::now(), Duration::seconds(60)));
        assert!(!snapshot.is_stale(Utc::now(), Duration::seconds(300)));
    }
}
