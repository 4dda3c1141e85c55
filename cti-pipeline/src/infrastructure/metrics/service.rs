// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Prometheus metrics for the operational signals §7's disposition table
//! and §5's flush cadence call out: quarantined messages, broker
//! reconnects, nack-requeues, recorder rejections, and per-stage flush
//! lag. Every counter is labeled by `component` so one process type's
//! dashboard panel can be reused across every binary.

use cti_pipeline_domain::PipelineError;
use prometheus::{GaugeVec, IntCounterVec, Opts, Registry};
use std::sync::Arc;

#[derive(Clone)]
pub struct MetricsService {
    registry: Arc<Registry>,
    quarantine_total: IntCounterVec,
    reconnect_total: IntCounterVec,
    nack_requeue_total: IntCounterVec,
    recorder_rejected_total: IntCounterVec,
    recorded_events_total: IntCounterVec,
    flush_lag_seconds: GaugeVec,
}

fn register_counter_vec(registry: &Registry, name: &str, help: &str) -> Result<IntCounterVec, PipelineError> {
    register_labeled_counter_vec(registry, name, help, &["component"])
}

fn register_labeled_counter_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> Result<IntCounterVec, PipelineError> {
    let metric = IntCounterVec::new(Opts::new(name, help).namespace("cti_pipeline"), labels)
        .map_err(|e| PipelineError::InternalError(format!("failed to create {name} metric: {e}")))?;
    registry
        .register(Box::new(metric.clone()))
        .map_err(|e| PipelineError::InternalError(format!("failed to register {name} metric: {e}")))?;
    Ok(metric)
}

impl MetricsService {
    pub fn new() -> Result<Self, PipelineError> {
        let registry = Registry::new();

        let quarantine_total = register_counter_vec(&registry, "quarantine_total", "Messages routed to a component's quarantine queue")?;
        let reconnect_total = register_counter_vec(&registry, "reconnect_total", "Broker reconnect attempts after a dropped connection")?;
        let nack_requeue_total = register_counter_vec(&registry, "nack_requeue_total", "Deliveries nacked and requeued after a transient failure")?;
        let recorder_rejected_total =
            register_counter_vec(&registry, "recorder_rejected_total", "Deliveries the recorder rejected rather than persisted")?;
        let recorded_events_total = register_labeled_counter_vec(
            &registry,
            "recorded_events_total",
            "Events the counter stage observed on the recorded routing state",
            &["source", "category"],
        )?;

        let flush_lag_seconds = GaugeVec::new(
            Opts::new("flush_lag_seconds", "Seconds since a stage's state store was last flushed").namespace("cti_pipeline"),
            &["component"],
        )
        .map_err(|e| PipelineError::InternalError(format!("failed to create flush_lag_seconds metric: {e}")))?;
        registry
            .register(Box::new(flush_lag_seconds.clone()))
            .map_err(|e| PipelineError::InternalError(format!("failed to register flush_lag_seconds metric: {e}")))?;

        Ok(Self {
            registry: Arc::new(registry),
            quarantine_total,
            reconnect_total,
            nack_requeue_total,
            recorder_rejected_total,
            recorded_events_total,
            flush_lag_seconds,
        })
    }

    pub fn record_quarantine(&self, component: &str) {
        self.quarantine_total.with_label_values(&[component]).inc();
    }

    pub fn record_reconnect(&self, component: &str) {
        self.reconnect_total.with_label_values(&[component]).inc();
    }

    pub fn record_nack_requeue(&self, component: &str) {
        self.nack_requeue_total.with_label_values(&[component]).inc();
    }

    pub fn record_recorder_rejected(&self, component: &str) {
        self.recorder_rejected_total.with_label_values(&[component]).inc();
    }

    /// One `recorded`-state message reached the counter stage (§12).
    pub fn record_recorded_event(&self, source: &str, category: &str) {
        self.recorded_events_total.with_label_values(&[source, category]).inc();
    }

    pub fn set_flush_lag(&self, component: &str, lag: std::time::Duration) {
        self.flush_lag_seconds.with_label_values(&[component]).set(lag.as_secs_f64());
    }

    /// Renders every registered metric in Prometheus text exposition
    /// format for the `/metrics` endpoint.
    pub fn render(&self) -> Result<String, PipelineError> {
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode_to_string(&families).map_err(|e| PipelineError::InternalError(format!("failed to encode metrics: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_labeled_per_component_and_appear_in_render_output() {
        let service = MetricsService::new().unwrap();
        service.record_quarantine("filter");
        service.record_reconnect("parser");
        service.set_flush_lag("aggregator", std::time::Duration::from_secs(5));

        let rendered = service.render().unwrap();
        assert!(rendered.contains("cti_pipeline_quarantine_total"));
        assert!(rendered.contains(r#"component="filter""#));
        assert!(rendered.contains("cti_pipeline_reconnect_total"));
        assert!(rendered.contains("cti_pipeline_flush_lag_seconds"));
    }
}
