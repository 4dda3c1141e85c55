// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `LoggingPublisher` (§7, §11): mirrors structured error events to the
//! `logging` exchange alongside the local `tracing` subscriber, so a
//! central log consumer sees every component's quarantine/nack/reconnect
//! events without tailing each binary's own stdout.

use crate::infrastructure::broker::{publish_once, OutgoingMessage, LOGGING_EXCHANGE};
use chrono::Utc;
use cti_pipeline_domain::PipelineError;
use deadpool_lapin::Pool;
use lapin::BasicProperties;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub component: &'a str,
    pub level: &'a str,
    pub message: &'a str,
    pub timestamp: chrono::DateTime<Utc>,
}

pub struct LoggingPublisher {
    pool: Pool,
    component: String,
}

impl LoggingPublisher {
    pub fn new(pool: Pool, component: impl Into<String>) -> Self {
        Self { pool, component: component.into() }
    }

    /// Publishes one structured log line to the shared `logging` exchange,
    /// routed by `<component>.<level>` so a consumer can bind on either
    /// axis. Publish failures are logged locally and swallowed: a broker
    /// hiccup mirroring a log line must never fail the operation that
    /// triggered the log.
    pub async fn publish(&self, level: &str, message: &str) {
        let event = LogEvent { component: &self.component, level, message, timestamp: Utc::now() };
        let payload = match serde_json::to_vec(&event) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize log event for the logging exchange");
                return;
            }
        };

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_timestamp(event.timestamp.timestamp() as u64)
            .with_delivery_mode(2);

        let outgoing = OutgoingMessage {
            exchange: LOGGING_EXCHANGE.to_string(),
            routing_key: format!("{}.{}", self.component, level),
            payload,
            properties,
        };

        if let Err(err) = self.publish_outgoing(outgoing).await {
            tracing::warn!(error = %err, "failed to publish log event to the logging exchange");
        }
    }

    async fn publish_outgoing(&self, message: OutgoingMessage) -> Result<(), PipelineError> {
        publish_once(&self.pool, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_event_serializes_with_component_level_and_message() {
        let event = LogEvent { component: "filter", level: "error", message: "quarantined a delivery", timestamp: Utc::now() };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"component\":\"filter\""));
        assert!(json.contains("\"level\":\"error\""));
        assert!(json.contains("quarantined a delivery"));
    }
}
