// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The comparator component (§4.4): buffers one blacklist series per
//! `source` until its end marker (or a time-quiet threshold) arrives,
//! then runs the pure [`cti_pipeline_domain::services::comparator`] differ
//! against the persisted snapshot.

use crate::domain_support::envelope::{Headers, MessageType};
use crate::infrastructure::broker::{publish_once, Handler, HandlerOutcome, OutgoingMessage, EVENT_EXCHANGE};
use crate::infrastructure::config::ComparatorConfig;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use cti_pipeline_bootstrap::CancellationToken;
use cti_pipeline_domain::entities::{BlKey, ComparatorEntry, Delta, Event};
use cti_pipeline_domain::repositories::ComparatorStateStore;
use cti_pipeline_domain::services::comparator;
use cti_pipeline_domain::value_objects::{LifecycleTag, RoutingKey, RoutingState, SeriesId};
use cti_pipeline_domain::PipelineError;
use deadpool_lapin::Pool;
use lapin::message::Delivery;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// How long a series may sit without a new message before the comparator
/// finalizes it anyway (§4.4 "series-end marker ... or time-quiet
/// threshold").
const DEFAULT_QUIET_THRESHOLD: Duration = Duration::minutes(5);

struct SeriesBuffer {
    series_id: SeriesId,
    started_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    entries: HashMap<BlKey, Event>,
}

impl SeriesBuffer {
    fn new(series_id: SeriesId, now: DateTime<Utc>) -> Self {
        Self { series_id, started_at: now, last_activity: now, entries: HashMap::new() }
    }
}

pub struct ComparatorService {
    store: Arc<dyn ComparatorStateStore>,
    config: ComparatorConfig,
    buffers: Mutex<HashMap<String, SeriesBuffer>>,
}

impl ComparatorService {
    pub fn new(store: Arc<dyn ComparatorStateStore>, config: ComparatorConfig) -> Self {
        Self { store, config, buffers: Mutex::new(HashMap::new()) }
    }

    /// Periodically finalizes any series that has gone quiet past
    /// [`DEFAULT_QUIET_THRESHOLD`] without an explicit end marker.
    pub async fn run_quiet_sweep_loop(self: Arc<Self>, pool: Pool, sweep_interval: std::time::Duration, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(sweep_interval) => {}
            }
            self.sweep(&pool).await;
        }
    }

    async fn sweep(&self, pool: &Pool) {
        let now = Utc::now();
        let stale_sources: Vec<String> = {
            let buffers = self.buffers.lock().await;
            buffers
                .iter()
                .filter(|(_, buf)| now - buf.last_activity > DEFAULT_QUIET_THRESHOLD)
                .map(|(source, _)| source.clone())
                .collect()
        };

        for source in stale_sources {
            match self.finalize(&source).await {
                Ok(Some(messages)) => {
                    for message in messages {
                        if let Err(err) = publish_once(pool, message).await {
                            tracing::warn!(error = %err, source = %source, "failed to publish quiet-swept comparator delta");
                        }
                    }
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, source = %source, "failed to finalize quiet-swept comparator series"),
            }
        }
    }

    async fn process(&self, headers: &Headers, body: &[u8]) -> Result<HandlerOutcome, PipelineError> {
        let event: Event =
            serde_json::from_slice(body).map_err(|e| PipelineError::invalid_event(format!("undecodable enriched blacklist event: {e}")))?;
        let series_id = headers
            .series_id
            .clone()
            .map(SeriesId::new)
            .ok_or_else(|| PipelineError::invalid_event("blacklist event is missing the series_id header the comparator requires"))?;
        let source = event.source.to_string();
        let key = event.id.to_hex();
        let now = Utc::now();

        {
            let mut buffers = self.buffers.lock().await;
            match buffers.get_mut(&source) {
                Some(buf) if buf.series_id == series_id => {
                    buf.entries.insert(key, event);
                    buf.last_activity = now;
                }
                Some(buf) if headers.timestamp > buf.started_at => {
                    // A newer series has started before the old one ended;
                    // §4.4's "later series-end timestamp wins" discards the
                    // superseded series outright.
                    let mut fresh = SeriesBuffer::new(series_id, now);
                    fresh.entries.insert(key, event);
                    buffers.insert(source.clone(), fresh);
                }
                Some(_) => {
                    // Message belongs to a series already superseded; drop it.
                    return Ok(HandlerOutcome::Absorbed);
                }
                None => {
                    let mut fresh = SeriesBuffer::new(series_id, now);
                    fresh.entries.insert(key, event);
                    buffers.insert(source.clone(), fresh);
                }
            }
        }

        if headers.series_end {
            match self.finalize(&source).await? {
                Some(messages) => Ok(HandlerOutcome::Publish(messages)),
                None => Ok(HandlerOutcome::Absorbed),
            }
        } else {
            Ok(HandlerOutcome::Absorbed)
        }
    }

    /// Drains and diffs the buffered series for `source`, if one is open.
    async fn finalize(&self, source: &str) -> Result<Option<Vec<OutgoingMessage>>, PipelineError> {
        let buffer = { self.buffers.lock().await.remove(source) };
        let Some(buffer) = buffer else {
            return Ok(None);
        };

        let prior = self.store.load(source).await?;
        let compared_fields: Option<HashSet<String>> = self.config.compared_fields_for(source).map(|fields| fields.into_iter().collect());
        let retention = self.config.retention_after_delisting();

        let (deltas, next) = comparator::diff(&prior, buffer.entries, buffer.series_id.clone(), compared_fields.as_ref(), retention, Utc::now())?;
        self.store.save(source, &next).await?;

        let messages = deltas.iter().map(delta_message).collect::<Result<Vec<_>, _>>()?;
        Ok(Some(messages))
    }
}

#[async_trait]
impl Handler for ComparatorService {
    async fn handle(&self, delivery: &Delivery) -> Result<HandlerOutcome, PipelineError> {
        let headers = Headers::from_properties(&delivery.properties);
        self.process(&headers, &delivery.data).await
    }
}

fn delta_message(delta: &Delta) -> Result<OutgoingMessage, PipelineError> {
    let event = &delta.entry.event_snapshot;
    let routing_key = RoutingKey::new(RoutingState::Compared, event.category, event.source.clone()).to_string();
    let payload = serde_json::to_vec(event).map_err(|e| PipelineError::SerializationError(e.to_string()))?;
    let message_type = match delta.tag {
        LifecycleTag::BlNew => MessageType::BlNew,
        LifecycleTag::BlUpdate => MessageType::BlUpdate,
        LifecycleTag::BlChange => MessageType::BlChange,
        LifecycleTag::BlDelist => MessageType::BlDelist,
    };
    let properties = Headers::new(message_type).with_series(delta.entry.last_seen_series.as_str(), true).to_properties();
    Ok(OutgoingMessage { exchange: EVENT_EXCHANGE.to_string(), routing_key, payload, properties })
}
