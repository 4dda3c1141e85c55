// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The aggregator component (§4.3): wraps the pure
//! [`cti_pipeline_domain::services::aggregator`] reducer with the durable
//! state store, the per-delivery `Handler` seam, and the time-based tick
//! that flushes groups no input has touched in a while.

use crate::domain_support::envelope::{Headers, MessageType};
use crate::infrastructure::broker::{publish_once, Handler, HandlerOutcome, OutgoingMessage, EVENT_EXCHANGE};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use cti_pipeline_bootstrap::CancellationToken;
use cti_pipeline_domain::entities::{AggregatorGroup, Event};
use cti_pipeline_domain::repositories::AggregatorStateStore;
use cti_pipeline_domain::services::aggregator::{self, AggregatorOutcome};
use cti_pipeline_domain::value_objects::{GroupKey, RoutingKey, RoutingState};
use cti_pipeline_domain::PipelineError;
use deadpool_lapin::Pool;
use lapin::message::Delivery;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default bucket window and tick grace period (§4.3). These are
/// parser-declared in the upstream system; with no parser stage in this
/// crate's scope (§1 Non-goals treats collectors/parsers as external
/// collaborators), every group uses the documented defaults.
const DEFAULT_WINDOW: Duration = Duration::hours(24);
const DEFAULT_GRACE: Duration = Duration::hours(1);

pub struct AggregatorService {
    state: Mutex<HashMap<GroupKey, AggregatorGroup>>,
    store: Arc<dyn AggregatorStateStore>,
    window: Duration,
    grace: Duration,
}

impl AggregatorService {
    pub async fn load(store: Arc<dyn AggregatorStateStore>) -> Result<Self, PipelineError> {
        let state = store.load().await?;
        Ok(Self { state: Mutex::new(state), store, window: DEFAULT_WINDOW, grace: DEFAULT_GRACE })
    }

    /// Runs the tick loop (§4.3 "on a time-based tick, emit and close any
    /// group whose `last + grace < now`") until `shutdown` fires.
    pub async fn run_tick_loop(self: Arc<Self>, pool: Pool, tick_interval: std::time::Duration, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(tick_interval) => {}
            }
            self.tick(&pool).await;
        }
    }

    async fn tick(&self, pool: &Pool) {
        let emitted = {
            let mut state = self.state.lock().await;
            let emitted = aggregator::tick(&mut state, Utc::now(), self.grace);
            if !emitted.is_empty() {
                if let Err(err) = self.store.save(&state).await {
                    tracing::warn!(error = %err, "failed to persist aggregator state after tick flush");
                }
            }
            emitted
        };

        for event in emitted {
            match aggregated_message(&event) {
                Ok(message) => {
                    if let Err(err) = publish_once(pool, message).await {
                        tracing::warn!(error = %err, "failed to publish tick-emitted aggregator event");
                    }
                }
                Err(err) => tracing::warn!(error = %err, "failed to encode tick-emitted aggregator event"),
            }
        }
    }
}

impl AggregatorService {
    async fn process(&self, headers: &Headers, body: &[u8]) -> Result<HandlerOutcome, PipelineError> {
        let event: Event =
            serde_json::from_slice(body).map_err(|e| PipelineError::invalid_event(format!("undecodable parsed event: {e}")))?;
        let group = headers
            .group
            .clone()
            .ok_or_else(|| PipelineError::invalid_event("parsed event is missing the _group header the aggregator requires"))?;
        let key = GroupKey::new(event.source.clone(), group);

        let outcome = {
            let mut state = self.state.lock().await;
            let outcome = aggregator::apply(&mut state, key, event, self.window, Utc::now())?;
            self.store.save(&state).await?;
            outcome
        };

        match outcome {
            AggregatorOutcome::Folded => Ok(HandlerOutcome::Absorbed),
            AggregatorOutcome::Emitted(event) => Ok(HandlerOutcome::Publish(vec![aggregated_message(&event)?])),
        }
    }
}

#[async_trait]
impl Handler for AggregatorService {
    async fn handle(&self, delivery: &Delivery) -> Result<HandlerOutcome, PipelineError> {
        let headers = Headers::from_properties(&delivery.properties);
        self.process(&headers, &delivery.data).await
    }
}

fn aggregated_message(event: &Event) -> Result<OutgoingMessage, PipelineError> {
    let routing_key = RoutingKey::new(RoutingState::Aggregated, event.category, event.source.clone()).to_string();
    let payload = serde_json::to_vec(event).map_err(|e| PipelineError::SerializationError(e.to_string()))?;
    Ok(OutgoingMessage { exchange: EVENT_EXCHANGE.to_string(), routing_key, payload, properties: Headers::new(MessageType::Event).to_properties() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cti_pipeline_domain::value_objects::{Category, Confidence, EventId, Restriction, Source};
    use std::sync::Mutex as StdMutex;

    struct RecordingStore {
        saved: StdMutex<Vec<HashMap<GroupKey, AggregatorGroup>>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self { saved: StdMutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl AggregatorStateStore for RecordingStore {
        async fn load(&self) -> Result<HashMap<GroupKey, AggregatorGroup>, PipelineError> {
            Ok(HashMap::new())
        }

        async fn save(&self, state: &HashMap<GroupKey, AggregatorGroup>) -> Result<(), PipelineError> {
            self.saved.lock().unwrap().push(state.clone());
            Ok(())
        }
    }

    fn sample_event() -> Event {
        Event::builder(
            EventId::parse("a3a3384e2707a865c24a3ab3803f9f97").unwrap(),
            Source::parse("abuse-ch.feodo").unwrap(),
            Restriction::Public,
            Confidence::Medium,
            Category::Bots,
            Utc::now(),
        )
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn first_input_folds_without_publishing() {
        let store = Arc::new(RecordingStore::new());
        let service = AggregatorService::load(store.clone()).await.unwrap();
        let event = sample_event();
        let headers = Headers::new(MessageType::Event).with_group("1.2.3.4|80|tcp");

        let outcome = service.process(&headers, &serde_json::to_vec(&event).unwrap()).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Absorbed));
        assert_eq!(store.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_group_header_is_invalid_event() {
        let store = Arc::new(RecordingStore::new());
        let service = AggregatorService::load(store).await.unwrap();
        let event = sample_event();
        let headers = Headers::new(MessageType::Event);

        let err = service.process(&headers, &serde_json::to_vec(&event).unwrap()).await.unwrap_err();
        assert_eq!(err.class(), cti_pipeline_domain::ErrorClass::PermanentInput);
    }
}
