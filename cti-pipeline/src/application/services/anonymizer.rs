// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The anonymizer transform (§4.6): a transparent, in-place pass over
//! `filtered` messages that masks the destination address when the
//! matched subsource requires it, and strips fields the target org's
//! zone isn't granted. Everything else passes through unchanged.

use crate::domain_support::envelope::{FilteredPayload, Headers};
use crate::infrastructure::broker::{Handler, HandlerOutcome, OutgoingMessage, EVENT_EXCHANGE};
use async_trait::async_trait;
use cti_pipeline_domain::entities::Event;
use cti_pipeline_domain::value_objects::{AccessZone, RoutingKey, RoutingState};
use cti_pipeline_domain::PipelineError;
use lapin::message::Delivery;
use std::net::IpAddr;

pub struct AnonymizerService;

impl AnonymizerService {
    pub fn new() -> Self {
        Self
    }

    /// `pub` so cross-stage integration tests can chain this stage's
    /// output directly into the recorder's input; see `filter.rs`'s
    /// `process` for the same rationale.
    pub async fn process(&self, headers: &Headers, body: &[u8]) -> Result<HandlerOutcome, PipelineError> {
        let mut payload: FilteredPayload =
            serde_json::from_slice(body).map_err(|e| PipelineError::invalid_event(format!("undecodable filtered payload: {e}")))?;

        if payload.anonymization_required {
            if let Some(dip) = &payload.event.dip {
                payload.event.dip = Some(mask_destination_address(dip));
            }
        }
        strip_fields_not_granted_to_zone(&mut payload.event, payload.zone);

        let routing_key = RoutingKey::new(RoutingState::Filtered, payload.event.category, payload.event.source.clone()).to_string();
        let body = serde_json::to_vec(&payload).map_err(|e| PipelineError::SerializationError(e.to_string()))?;
        let properties = Headers::new(headers.message_type).to_properties();
        Ok(HandlerOutcome::Publish(vec![OutgoingMessage { exchange: EVENT_EXCHANGE.to_string(), routing_key, payload: body, properties }]))
    }
}

impl Default for AnonymizerService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for AnonymizerService {
    async fn handle(&self, delivery: &Delivery) -> Result<HandlerOutcome, PipelineError> {
        let headers = Headers::from_properties(&delivery.properties);
        self.process(&headers, &delivery.data).await
    }
}

/// Masks the host-identifying portion of a destination address: the last
/// octet for IPv4, the last 80 bits for IPv6. Unparsable input (a FQDN
/// recorded in the `dip` slot by some feeds) is passed through verbatim,
/// since there is no address structure to mask.
fn mask_destination_address(raw: &str) -> String {
    match raw.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            let octets = v4.octets();
            format!("{}.{}.{}.0", octets[0], octets[1], octets[2])
        }
        Ok(IpAddr::V6(v6)) => {
            let mut segments = v6.segments();
            for segment in &mut segments[3..] {
                *segment = 0;
            }
            IpAddr::V6(std::net::Ipv6Addr::new(
                segments[0], segments[1], segments[2], segments[3], segments[4], segments[5], segments[6], segments[7],
            ))
            .to_string()
        }
        Err(_) => raw.to_string(),
    }
}

/// §4.6's "strip fields whose access is not granted to the target
/// organization's zone": an `inside` subscriber owns the asset the event
/// was seen talking to and sees the full destination tuple; `threats` and
/// `search` subscribers receive the indicator itself but not which of an
/// org's own hosts it was observed contacting.
fn strip_fields_not_granted_to_zone(event: &mut Event, zone: AccessZone) {
    match zone {
        AccessZone::Inside => {}
        AccessZone::Threats | AccessZone::Search => {
            event.dip = None;
            event.dport = None;
            event.sport = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_support::envelope::MessageType;
    use chrono::Utc;
    use cti_pipeline_domain::entities::Event;
    use cti_pipeline_domain::value_objects::{Category, Confidence, EventId, OrgId, Restriction, Source};

    fn payload_for_zone(anonymization_required: bool, zone: cti_pipeline_domain::value_objects::AccessZone) -> FilteredPayload {
        let event = Event::builder(
            EventId::parse("a3a3384e2707a865c24a3ab3803f9f97").unwrap(),
            Source::parse("abuse-ch.feodo").unwrap(),
            Restriction::Public,
            Confidence::Medium,
            Category::Bots,
            Utc::now(),
        )
        .dip("198.51.100.77")
        .dport(443)
        .sport(51234)
        .build()
        .unwrap();

        FilteredPayload { event, client: OrgId::parse("org-a").unwrap(), zone, anonymization_required }
    }

    fn payload(anonymization_required: bool) -> FilteredPayload {
        payload_for_zone(anonymization_required, cti_pipeline_domain::value_objects::AccessZone::Inside)
    }

    #[tokio::test]
    async fn masks_destination_ip_when_required() {
        let service = AnonymizerService::new();
        let headers = Headers::new(MessageType::Event);
        let body = serde_json::to_vec(&payload(true)).unwrap();

        let outcome = service.process(&headers, &body).await.unwrap();
        match outcome {
            HandlerOutcome::Publish(messages) => {
                let result: FilteredPayload = serde_json::from_slice(&messages[0].payload).unwrap();
                assert_eq!(result.event.dip.as_deref(), Some("198.51.100.0"));
            }
            HandlerOutcome::Absorbed => panic!("anonymizer always re-publishes"),
        }
    }

    #[tokio::test]
    async fn passes_through_unchanged_when_not_required() {
        let service = AnonymizerService::new();
        let headers = Headers::new(MessageType::Event);
        let body = serde_json::to_vec(&payload(false)).unwrap();

        let outcome = service.process(&headers, &body).await.unwrap();
        match outcome {
            HandlerOutcome::Publish(messages) => {
                let result: FilteredPayload = serde_json::from_slice(&messages[0].payload).unwrap();
                assert_eq!(result.event.dip.as_deref(), Some("198.51.100.77"));
            }
            HandlerOutcome::Absorbed => panic!("anonymizer always re-publishes"),
        }
    }

    #[tokio::test]
    async fn inside_zone_keeps_the_destination_tuple() {
        let service = AnonymizerService::new();
        let headers = Headers::new(MessageType::Event);
        let body = serde_json::to_vec(&payload_for_zone(false, cti_pipeline_domain::value_objects::AccessZone::Inside)).unwrap();

        let outcome = service.process(&headers, &body).await.unwrap();
        match outcome {
            HandlerOutcome::Publish(messages) => {
                let result: FilteredPayload = serde_json::from_slice(&messages[0].payload).unwrap();
                assert_eq!(result.event.dip.as_deref(), Some("198.51.100.77"));
                assert_eq!(result.event.dport, Some(443));
                assert_eq!(result.event.sport, Some(51234));
            }
            HandlerOutcome::Absorbed => panic!("anonymizer always re-publishes"),
        }
    }

    #[tokio::test]
    async fn threats_and_search_zones_strip_the_destination_tuple() {
        let service = AnonymizerService::new();
        let headers = Headers::new(MessageType::Event);

        for zone in [cti_pipeline_domain::value_objects::AccessZone::Threats, cti_pipeline_domain::value_objects::AccessZone::Search] {
            let body = serde_json::to_vec(&payload_for_zone(false, zone)).unwrap();
            let outcome = service.process(&headers, &body).await.unwrap();
            match outcome {
                HandlerOutcome::Publish(messages) => {
                    let result: FilteredPayload = serde_json::from_slice(&messages[0].payload).unwrap();
                    assert_eq!(result.event.dip, None, "zone {zone:?} should strip dip");
                    assert_eq!(result.event.dport, None, "zone {zone:?} should strip dport");
                    assert_eq!(result.event.sport, None, "zone {zone:?} should strip sport");
                }
                HandlerOutcome::Absorbed => panic!("anonymizer always re-publishes"),
            }
        }
    }
}
