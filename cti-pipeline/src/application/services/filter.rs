// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The filter fan-out component (§4.5): expands one event into a separate
//! `filtered`-state message per `(organization, zone)` the auth snapshot
//! says should see it.

use crate::domain_support::envelope::{FilteredPayload, Headers};
use crate::infrastructure::auth::AuthSnapshotHandle;
use crate::infrastructure::broker::{Handler, HandlerOutcome, OutgoingMessage, EVENT_EXCHANGE};
use async_trait::async_trait;
use cti_pipeline_domain::entities::Event;
use cti_pipeline_domain::services::filter::compute_visibility;
use cti_pipeline_domain::value_objects::{AccessZone, Category, RoutingKey, RoutingState};
use cti_pipeline_domain::PipelineError;
use lapin::message::Delivery;
use std::collections::HashSet;

pub struct FilterService {
    auth: AuthSnapshotHandle,
    categories_filtered_through_fqdn_only: HashSet<Category>,
}

impl FilterService {
    pub fn new(auth: AuthSnapshotHandle, categories_filtered_through_fqdn_only: HashSet<Category>) -> Self {
        Self { auth, categories_filtered_through_fqdn_only }
    }

    /// `pub` (rather than private, like the other stages' `process`) so
    /// cross-stage integration tests can drive filter → anonymizer →
    /// recorder without constructing a raw `lapin::message::Delivery`.
    pub async fn process(&self, headers: &Headers, body: &[u8]) -> Result<HandlerOutcome, PipelineError> {
        let event: Event = serde_json::from_slice(body).map_err(|e| PipelineError::invalid_event(format!("undecodable event: {e}")))?;
        let snapshot = self.auth.current();

        let visible = compute_visibility(&event, &snapshot, &self.categories_filtered_through_fqdn_only);
        if visible.is_empty() {
            return Ok(HandlerOutcome::Absorbed);
        }

        let mut messages = Vec::with_capacity(visible.len());
        for visibility in visible {
            let anonymization_required = snapshot
                .subsources_for(&event.source, visibility.zone)
                .iter()
                .find(|subsource| subsource.org_id == visibility.org_id)
                .is_some_and(|subsource| subsource.predicate.anonymization_required);

            let payload = FilteredPayload {
                event: event.clone(),
                client: visibility.org_id,
                zone: visibility.zone,
                anonymization_required,
            };
            messages.push(filtered_message(&payload, headers)?);
        }

        Ok(HandlerOutcome::Publish(messages))
    }
}

#[async_trait]
impl Handler for FilterService {
    async fn handle(&self, delivery: &Delivery) -> Result<HandlerOutcome, PipelineError> {
        let headers = Headers::from_properties(&delivery.properties);
        self.process(&headers, &delivery.data).await
    }
}

fn filtered_message(payload: &FilteredPayload, source_headers: &Headers) -> Result<OutgoingMessage, PipelineError> {
    let routing_key = RoutingKey::new(RoutingState::Filtered, payload.event.category, payload.event.source.clone()).to_string();
    let body = serde_json::to_vec(payload).map_err(|e| PipelineError::SerializationError(e.to_string()))?;
    let properties = Headers::new(source_headers.message_type).to_properties();
    Ok(OutgoingMessage { exchange: EVENT_EXCHANGE.to_string(), routing_key, payload: body, properties })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_support::envelope::MessageType;
    use cti_pipeline_domain::entities::{Address, AuthSnapshot, OrgPredicate, Organization, Subsource};
    use cti_pipeline_domain::value_objects::{Confidence, EventId, IpCidr, OrgId, Restriction, Source};
    use std::collections::HashMap;

    fn snapshot_with_one_inside_org() -> AuthSnapshot {
        let source = Source::parse("abuse-ch.feodo").unwrap();
        let mut org = Organization::new(OrgId::parse("org-a").unwrap(), "Org A");
        org.inside_criteria.ip_networks.push(IpCidr::parse("10.20.30.0/24").unwrap());
        let mut predicate = OrgPredicate::default();
        predicate.anonymization_required = true;

        let mut organizations = HashMap::new();
        organizations.insert(org.org_id.clone(), org.clone());
        let subsources = vec![Subsource { source, zone: AccessZone::Inside, org_id: org.org_id.clone(), predicate }];
        AuthSnapshot::from_subsources(chrono::Utc::now(), organizations, subsources)
    }

    fn event_with_address(ip: &str) -> Event {
        Event::builder(
            EventId::parse("a3a3384e2707a865c24a3ab3803f9f97").unwrap(),
            Source::parse("abuse-ch.feodo").unwrap(),
            Restriction::Public,
            Confidence::Medium,
            Category::Bots,
            chrono::Utc::now(),
        )
        .address(vec![Address { ip: ip.parse().unwrap(), asn: None, cc: None }])
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn matching_org_receives_a_flagged_copy() {
        let handle = AuthSnapshotHandle::new(snapshot_with_one_inside_org());
        let service = FilterService::new(handle, HashSet::new());
        let event = event_with_address("10.20.30.41");
        let headers = Headers::new(MessageType::Event);

        let outcome = service.process(&headers, &serde_json::to_vec(&event).unwrap()).await.unwrap();
        match outcome {
            HandlerOutcome::Publish(messages) => {
                assert_eq!(messages.len(), 1);
                let payload: FilteredPayload = serde_json::from_slice(&messages[0].payload).unwrap();
                assert!(payload.anonymization_required);
            }
            HandlerOutcome::Absorbed => panic!("expected one visible copy"),
        }
    }

    #[tokio::test]
    async fn no_matching_org_is_absorbed() {
        let handle = AuthSnapshotHandle::new(snapshot_with_one_inside_org());
        let service = FilterService::new(handle, HashSet::new());
        let event = event_with_address("1.2.3.4");
        let headers = Headers::new(MessageType::Event);

        let outcome = service.process(&headers, &serde_json::to_vec(&event).unwrap()).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Absorbed));
    }
}
