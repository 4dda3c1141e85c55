// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The internal event record (§3): a closed struct of required fields plus
//! a small set of validated optional fields, built only through
//! [`EventBuilder`] so that an invalid `Event` can never exist.

use crate::error::PipelineError;
use crate::value_objects::{Category, Confidence, EventId, Restriction, Source};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;

/// Tolerance for clock skew between a producing collector and this
/// process, per §3's "`time ≤ now + small-skew`".
const MAX_CLOCK_SKEW: Duration = Duration::seconds(90);

/// One entry of an event's `address` sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub ip: IpAddr,
    pub asn: Option<u32>,
    pub cc: Option<String>,
}

/// An internal, normalized security event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub source: Source,
    pub restriction: Restriction,
    pub confidence: Confidence,
    pub category: Category,
    pub time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
    pub fqdn: Option<String>,
    pub url: Option<String>,
    pub proto: Option<String>,
    pub sport: Option<u16>,
    pub dport: Option<u16>,
    pub dip: Option<String>,
    pub name: Option<String>,
    pub target: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub count: Option<u32>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub replaces: Option<EventId>,
}

impl Event {
    pub fn builder(id: EventId, source: Source, restriction: Restriction, confidence: Confidence, category: Category, time: DateTime<Utc>) -> EventBuilder {
        EventBuilder::new(id, source, restriction, confidence, category, time)
    }
}

/// Constructs an [`Event`], validating §3's invariants on [`EventBuilder::build`].
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn new(id: EventId, source: Source, restriction: Restriction, confidence: Confidence, category: Category, time: DateTime<Utc>) -> Self {
        Self {
            event: Event {
                id,
                source,
                restriction,
                confidence,
                category,
                time,
                address: Vec::new(),
                fqdn: None,
                url: None,
                proto: None,
                sport: None,
                dport: None,
                dip: None,
                name: None,
                target: None,
                md5: None,
                sha1: None,
                count: None,
                until: None,
                status: None,
                expires: None,
                replaces: None,
            },
        }
    }

    pub fn address(mut self, address: Vec<Address>) -> Self {
        self.event.address = address;
        self
    }

    pub fn fqdn(mut self, fqdn: impl Into<String>) -> Self {
        self.event.fqdn = Some(fqdn.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.event.url = Some(url.into());
        self
    }

    pub fn proto(mut self, proto: impl Into<String>) -> Self {
        self.event.proto = Some(proto.into());
        self
    }

    pub fn sport(mut self, sport: u16) -> Self {
        self.event.sport = Some(sport);
        self
    }

    pub fn dport(mut self, dport: u16) -> Self {
        self.event.dport = Some(dport);
        self
    }

    pub fn dip(mut self, dip: impl Into<String>) -> Self {
        self.event.dip = Some(dip.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.event.name = Some(name.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.event.target = Some(target.into());
        self
    }

    pub fn md5(mut self, md5: impl Into<String>) -> Self {
        self.event.md5 = Some(md5.into());
        self
    }

    pub fn sha1(mut self, sha1: impl Into<String>) -> Self {
        self.event.sha1 = Some(sha1.into());
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.event.count = Some(count);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.event.until = Some(until);
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.event.status = Some(status.into());
        self
    }

    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.event.expires = Some(expires);
        self
    }

    pub fn replaces(mut self, replaces: EventId) -> Self {
        self.event.replaces = Some(replaces);
        self
    }

    pub fn build(self) -> Result<Event, PipelineError> {
        let event = self.event;
        if event.time > Utc::now() + MAX_CLOCK_SKEW {
            return Err(PipelineError::invalid_event(format!(
                "event {} has time {} too far in the future",
                event.id, event.time
            )));
        }
        let mut seen_ips: HashSet<IpAddr> = HashSet::new();
        for addr in &event.address {
            if !seen_ips.insert(addr.ip) {
                return Err(PipelineError::invalid_event(format!(
                    "event {} has duplicate address entry for ip {}",
                    event.id, addr.ip
                )));
            }
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::EventId;

    fn sample_id() -> EventId {
        EventId::parse("a3a3384e2707a865c24a3ab3803f9f97").unwrap()
    }

    fn sample_source() -> Source {
        Source::parse("abuse-ch.feodo").unwrap()
    }

    #[test]
    fn builds_a_minimal_valid_event() {
        let event = Event::builder(sample_id(), sample_source(), Restriction::Public, Confidence::Medium, Category::Bots, Utc::now())
            .build()
            .unwrap();
        assert_eq!(event.category, Category::Bots);
    }

    #[test]
    fn rejects_time_too_far_in_the_future() {
        let far_future = Utc::now() + Duration::hours(1);
        let result = Event::builder(sample_id(), sample_source(), Restriction::Public, Confidence::Medium, Category::Bots, far_future).build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_duplicate_ip_addresses() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let addresses = vec![
            Address { ip, asn: None, cc: None },
            Address { ip, asn: Some(1), cc: None },
        ];
        let result = Event::builder(sample_id(), sample_source(), Restriction::Public, Confidence::Medium, Category::Bots, Utc::now())
            .address(addresses)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn accepts_distinct_ip_addresses() {
        let addresses = vec![
            Address { ip: "10.0.0.1".parse().unwrap(), asn: None, cc: None },
            Address { ip: "10.0.0.2".parse().unwrap(), asn: None, cc: None },
        ];
        let result = Event::builder(sample_id(), sample_source(), Restriction::Public, Confidence::Medium, Category::Bots, Utc::now())
            .address(addresses)
            .build();
        assert!(result.is_ok());
    }
}
