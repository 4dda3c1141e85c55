// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The filter visibility predicate (§4.5): expands one internal event
//! into the set of `(organization, zone)` pairs that should receive it.
//! A pure function of `(event, auth_snapshot)`, per §8's "running twice
//! yields identical sets".

use crate::entities::{AuthSnapshot, Event, InsideCriteria};
use crate::value_objects::{AccessZone, Category, OrgId};
use std::collections::HashSet;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Visibility {
    pub org_id: OrgId,
    pub zone: AccessZone,
}

/// Computes every `(org, zone)` pair that should see `event`, evaluating
/// zones in the declared order `inside, threats, search`.
pub fn compute_visibility(event: &Event, snapshot: &AuthSnapshot, categories_filtered_through_fqdn_only: &HashSet<Category>) -> Vec<Visibility> {
    let mut results = Vec::new();
    for zone in AccessZone::ORDER {
        for subsource in snapshot.subsources_for(&event.source, zone) {
            if !subsource.predicate.matches(event) {
                continue;
            }
            let Some(org) = snapshot.organization(&subsource.org_id) else {
                continue;
            };
            if zone == AccessZone::Inside && !org.full_access {
                let fqdn_only = categories_filtered_through_fqdn_only.contains(&event.category);
                let matched = if fqdn_only {
                    matches_fqdn(&org.inside_criteria, event)
                } else {
                    matches_inside_criteria(&org.inside_criteria, event)
                };
                if !matched {
                    continue;
                }
            }
            results.push(Visibility { org_id: subsource.org_id.clone(), zone });
        }
    }
    results
}

fn matches_inside_criteria(criteria: &InsideCriteria, event: &Event) -> bool {
    let ip_match = event.address.iter().any(|addr| criteria.ip_networks.iter().any(|net| net.contains(addr.ip)));
    let asn_match = event.address.iter().any(|addr| addr.asn.is_some_and(|asn| criteria.asns.contains(&asn)));
    let cc_match = event.address.iter().any(|addr| addr.cc.as_deref().is_some_and(|cc| criteria.ccs.contains(cc)));
    ip_match || asn_match || cc_match || matches_fqdn(criteria, event) || matches_url(criteria, event)
}

fn matches_fqdn(criteria: &InsideCriteria, event: &Event) -> bool {
    let Some(fqdn) = &event.fqdn else { return false };
    criteria.fqdns.iter().any(|suffix| fqdn == suffix || fqdn.ends_with(&format!(".{suffix}")))
}

fn matches_url(criteria: &InsideCriteria, event: &Event) -> bool {
    let Some(url) = &event.url else { return false };
    criteria.url_substrings.iter().any(|substring| url.contains(substring.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Address, OrgPredicate, Organization, Subsource};
    use crate::value_objects::{Confidence, EventId, IpCidr, Restriction, Source};
    use chrono::Utc;
    use std::collections::HashMap;

    fn event_with_address(ip: &str, asn: u32, cc: &str) -> Event {
        Event::builder(
            EventId::parse("a3a3384e2707a865c24a3ab3803f9f97").unwrap(),
            Source::parse("abuse-ch.feodo").unwrap(),
            Restriction::Public,
            Confidence::Medium,
            Category::Bots,
            Utc::now(),
        )
        .address(vec![Address { ip: ip.parse().unwrap(), asn: Some(asn), cc: Some(cc.to_string()) }])
        .build()
        .unwrap()
    }

    #[test]
    fn only_matching_org_receives_inside_zone_event() {
        let event = event_with_address("10.20.30.41", 12345, "PL");
        let source = Source::parse("abuse-ch.feodo").unwrap();

        let mut org_a = Organization::new(OrgId::parse("org-a").unwrap(), "Org A");
        org_a.inside_criteria.ip_networks.push(IpCidr::parse("10.20.30.0/24").unwrap());
        let mut org_b = Organization::new(OrgId::parse("org-b").unwrap(), "Org B");
        org_b.inside_criteria.asns.insert(99999);

        let mut organizations = HashMap::new();
        organizations.insert(org_a.org_id.clone(), org_a.clone());
        organizations.insert(org_b.org_id.clone(), org_b.clone());

        let subsources = vec![
            Subsource { source: source.clone(), zone: AccessZone::Inside, org_id: org_a.org_id.clone(), predicate: OrgPredicate::default() },
            Subsource { source: source.clone(), zone: AccessZone::Inside, org_id: org_b.org_id.clone(), predicate: OrgPredicate::default() },
        ];
        let snapshot = AuthSnapshot::from_subsources(Utc::now(), organizations, subsources);

        let visible = compute_visibility(&event, &snapshot, &HashSet::new());
        assert_eq!(visible, vec![Visibility { org_id: org_a.org_id.clone(), zone: AccessZone::Inside }]);
    }

    #[test]
    fn full_access_org_bypasses_inside_criteria() {
        let event = event_with_address("1.2.3.4", 1, "XX");
        let source = Source::parse("abuse-ch.feodo").unwrap();
        let mut org = Organization::new(OrgId::parse("org-a").unwrap(), "Org A");
        org.full_access = true;

        let mut organizations = HashMap::new();
        organizations.insert(org.org_id.clone(), org.clone());
        let subsources = vec![Subsource {
            source,
            zone: AccessZone::Inside,
            org_id: org.org_id.clone(),
            predicate: OrgPredicate::default(),
        }];
        let snapshot = AuthSnapshot::from_subsources(Utc::now(), organizations, subsources);

        let visible = compute_visibility(&event, &snapshot, &HashSet::new());
        assert_eq!(visible.len(), 1);
    }

    #[test]
    fn is_a_pure_function_of_event_and_snapshot() {
        let event = event_with_address("10.20.30.41", 1, "PL");
        let source = Source::parse("abuse-ch.feodo").unwrap();
        let mut org = Organization::new(OrgId::parse("org-a").unwrap(), "Org A");
        org.inside_criteria.ip_networks.push(IpCidr::parse("10.20.30.0/24").unwrap());
        let mut organizations = HashMap::new();
        organizations.insert(org.org_id.clone(), org.clone());
        let subsources = vec![Subsource {
            source,
            zone: AccessZone::Inside,
            org_id: org.org_id.clone(),
            predicate: OrgPredicate::default(),
        }];
        let snapshot = AuthSnapshot::from_subsources(Utc::now(), organizations, subsources);

        let first = compute_visibility(&event, &snapshot, &HashSet::new());
        let second = compute_visibility(&event, &snapshot, &HashSet::new());
        assert_eq!(first, second);
    }
}
