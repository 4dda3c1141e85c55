// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The recorder component (§4.8): persists one `filtered` delivery to the
//! Event DB per message, then emits a `recorded`-tagged message so the
//! counter has something to consume.

use crate::domain_support::envelope::{FilteredPayload, Headers};
use crate::infrastructure::broker::{Handler, HandlerOutcome, OutgoingMessage, EVENT_EXCHANGE};
use crate::infrastructure::metrics::MetricsService;
use async_trait::async_trait;
use cti_pipeline_domain::repositories::{ClientDelivery, EventSink};
use cti_pipeline_domain::value_objects::{RoutingKey, RoutingState};
use cti_pipeline_domain::PipelineError;
use lapin::message::Delivery;
use std::sync::Arc;

const COMPONENT: &str = "recorder";

pub struct RecorderService {
    sink: Arc<dyn EventSink>,
    metrics: Option<Arc<MetricsService>>,
}

impl RecorderService {
    pub fn new(sink: Arc<dyn EventSink>, metrics: Option<Arc<MetricsService>>) -> Self {
        Self { sink, metrics }
    }

    /// `pub` so cross-stage integration tests can feed this stage
    /// directly from the anonymizer's output; see `filter.rs`'s `process`
    /// for the same rationale.
    pub async fn process(&self, headers: &Headers, body: &[u8]) -> Result<HandlerOutcome, PipelineError> {
        let payload: FilteredPayload = serde_json::from_slice(body).map_err(|e| {
            if let Some(metrics) = &self.metrics {
                metrics.record_recorder_rejected(COMPONENT);
            }
            PipelineError::invalid_event(format!("undecodable filtered payload: {e}"))
        })?;

        let delivery = ClientDelivery { event: payload.event.clone(), client: payload.client, zone: payload.zone };
        self.sink.record(&[delivery]).await?;

        Ok(HandlerOutcome::Publish(vec![recorded_message(&payload.event, headers)?]))
    }
}

#[async_trait]
impl Handler for RecorderService {
    async fn handle(&self, delivery: &Delivery) -> Result<HandlerOutcome, PipelineError> {
        let headers = Headers::from_properties(&delivery.properties);
        self.process(&headers, &delivery.data).await
    }
}

fn recorded_message(event: &cti_pipeline_domain::entities::Event, source_headers: &Headers) -> Result<OutgoingMessage, PipelineError> {
    let routing_key = RoutingKey::new(RoutingState::Recorded, event.category, event.source.clone()).to_string();
    let payload = serde_json::to_vec(event).map_err(|e| PipelineError::SerializationError(e.to_string()))?;
    let properties = Headers::new(source_headers.message_type).to_properties();
    Ok(OutgoingMessage { exchange: EVENT_EXCHANGE.to_string(), routing_key, payload, properties })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_support::envelope::MessageType;
    use async_trait::async_trait;
    use chrono::Utc;
    use cti_pipeline_domain::entities::Event;
    use cti_pipeline_domain::value_objects::{AccessZone, Category, Confidence, EventId, OrgId, Restriction, Source};
    use std::sync::Mutex;

    struct RecordingSink {
        recorded: Mutex<Vec<ClientDelivery>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { recorded: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn record(&self, deliveries: &[ClientDelivery]) -> Result<(), PipelineError> {
            self.recorded.lock().unwrap().extend_from_slice(deliveries);
            Ok(())
        }
    }

    fn sample_payload() -> FilteredPayload {
        let event = Event::builder(
            EventId::parse("a3a3384e2707a865c24a3ab3803f9f97").unwrap(),
            Source::parse("abuse-ch.feodo").unwrap(),
            Restriction::Public,
            Confidence::Medium,
            Category::Bots,
            Utc::now(),
        )
        .build()
        .unwrap();

        FilteredPayload { event, client: OrgId::parse("org-a").unwrap(), zone: AccessZone::Inside, anonymization_required: false }
    }

    #[tokio::test]
    async fn records_then_emits_a_recorded_message() {
        let sink = Arc::new(RecordingSink::new());
        let service = RecorderService::new(sink.clone(), None);
        let headers = Headers::new(MessageType::Event);

        let outcome = service.process(&headers, &serde_json::to_vec(&sample_payload()).unwrap()).await.unwrap();
        assert_eq!(sink.recorded.lock().unwrap().len(), 1);
        match outcome {
            HandlerOutcome::Publish(messages) => assert_eq!(messages.len(), 1),
            HandlerOutcome::Absorbed => panic!("expected a recorded-state message"),
        }
    }

    #[tokio::test]
    async fn undecodable_payload_is_invalid_event() {
        let sink = Arc::new(RecordingSink::new());
        let service = RecorderService::new(sink, None);
        let headers = Headers::new(MessageType::Event);

        let err = service.process(&headers, b"not json").await.unwrap_err();
        assert_eq!(err.class(), cti_pipeline_domain::ErrorClass::PermanentInput);
    }
}
