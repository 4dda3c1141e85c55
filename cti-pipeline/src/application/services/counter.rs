// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The counter component: a minimal consumer of `recorded` messages that
//! increments a per-`(source, category)` counter and acks. No state to
//! persist, nothing to publish.

use crate::infrastructure::broker::{Handler, HandlerOutcome};
use crate::infrastructure::metrics::MetricsService;
use async_trait::async_trait;
use cti_pipeline_domain::entities::Event;
use cti_pipeline_domain::PipelineError;
use lapin::message::Delivery;
use std::sync::Arc;

pub struct CounterService {
    metrics: Arc<MetricsService>,
}

impl CounterService {
    pub fn new(metrics: Arc<MetricsService>) -> Self {
        Self { metrics }
    }

    async fn process(&self, body: &[u8]) -> Result<HandlerOutcome, PipelineError> {
        let event: Event = serde_json::from_slice(body).map_err(|e| PipelineError::invalid_event(format!("undecodable recorded event: {e}")))?;
        self.metrics.record_recorded_event(&event.source.to_string(), &event.category.to_string());
        Ok(HandlerOutcome::Absorbed)
    }
}

#[async_trait]
impl Handler for CounterService {
    async fn handle(&self, delivery: &Delivery) -> Result<HandlerOutcome, PipelineError> {
        self.process(&delivery.data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cti_pipeline_domain::value_objects::{Category, Confidence, EventId, Restriction, Source};

    #[tokio::test]
    async fn increments_the_per_source_category_counter() {
        let metrics = Arc::new(MetricsService::new().unwrap());
        let service = CounterService::new(metrics.clone());
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

        let outcome = service.process(&serde_json::to_vec(&event).unwrap()).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Absorbed));

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("cti_pipeline_recorded_events_total"));
        assert!(rendered.contains(r#"source="abuse-ch.feodo""#));
    }
}
