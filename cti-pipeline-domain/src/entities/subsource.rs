// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Subsources: a `(source, access-zone, organization)` binding with the
//! per-organization inclusion/exclusion predicates the filter stage
//! applies (§4.5).

use crate::entities::Event;
use crate::value_objects::{AccessZone, Category, Confidence, OrgId, Source};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Category allow/deny, confidence floor, and anonymization requirement
/// attached to one organization's subscription to a source/zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgPredicate {
    pub include_categories: Option<HashSet<Category>>,
    pub exclude_categories: Option<HashSet<Category>>,
    pub confidence_floor: Option<Confidence>,
    pub anonymization_required: bool,
}

impl OrgPredicate {
    /// Evaluates the category allow/deny and confidence-floor predicates
    /// against an event. Inside-criteria and FQDN-only matching are
    /// evaluated separately by the filter service, since they depend on
    /// the organization's `inside_criteria`, not this subsource.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(allow) = &self.include_categories {
            if !allow.contains(&event.category) {
                return false;
            }
        }
        if let Some(deny) = &self.exclude_categories {
            if deny.contains(&event.category) {
                return false;
            }
        }
        if let Some(floor) = self.confidence_floor {
            if event.confidence < floor {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsource {
    pub source: Source,
    pub zone: AccessZone,
    pub org_id: OrgId,
    pub predicate: OrgPredicate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{EventId, Restriction};
    use chrono::Utc;

    fn sample_event(category: Category, confidence: Confidence) -> Event {
        Event::builder(
            EventId::parse("a3a3384e2707a865c24a3ab3803f9f97").unwrap(),
            Source::parse("abuse-ch.feodo").unwrap(),
            Restriction::Public,
            confidence,
            category,
            Utc::now(),
        )
        .build()
        .unwrap()
    }

    #[test]
    fn excludes_denied_category() {
        let mut deny = HashSet::new();
        deny.insert(Category::Spam);
        let predicate = OrgPredicate { exclude_categories: Some(deny), ..Default::default() };
        assert!(!predicate.matches(&sample_event(Category::Spam, Confidence::High)));
        assert!(predicate.matches(&sample_event(Category::Bots, Confidence::High)));
    }

    #[test]
    fn enforces_confidence_floor() {
        let predicate = OrgPredicate { confidence_floor: Some(Confidence::High), ..Default::default() };
        assert!(!predicate.matches(&sample_event(Category::Bots, Confidence::Low)));
        assert!(predicate.matches(&sample_event(Category::Bots, Confidence::High)));
    }
}
