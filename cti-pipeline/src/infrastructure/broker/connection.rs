// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Pool setup and exchange/queue topology declaration (§4.1, §6).
//!
//! Every component connects to the same three long-lived exchanges
//! (`raw`, `event`, `logging`) plus its own `<component>.quarantine`
//! exchange and queue for messages a handler could not process (§12's
//! supplemented quarantine path). Everything is declared durable;
//! messages publish with persistent delivery mode so a broker restart does
//! not silently drop work in flight.

use crate::infrastructure::config::RabbitMqConfig;
use cti_pipeline_domain::value_objects::RoutingState;
use cti_pipeline_domain::PipelineError;
use deadpool_lapin::{Config as PoolConfig, Pool, Runtime};
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind};

pub const RAW_EXCHANGE: &str = "raw";
pub const EVENT_EXCHANGE: &str = "event";
pub const LOGGING_EXCHANGE: &str = "logging";

fn broker_err(context: impl std::fmt::Display, source: impl std::fmt::Display) -> PipelineError {
    PipelineError::BrokerError(format!("{context}: {source}"))
}

/// Builds a `deadpool-lapin` connection pool for one component process.
pub fn build_pool(rabbitmq: &RabbitMqConfig) -> Result<Pool, PipelineError> {
    let mut config = PoolConfig::default();
    config.url = Some(rabbitmq.connection_uri());
    config.create_pool(Some(Runtime::Tokio1)).map_err(|e| broker_err("creating connection pool", e))
}

/// Declares the three shared exchanges. Idempotent: every component calls
/// this on startup, and redeclaring an existing durable exchange with the
/// same arguments is a no-op on the broker side.
pub async fn declare_shared_exchanges(channel: &Channel) -> Result<(), PipelineError> {
    for exchange in [RAW_EXCHANGE, EVENT_EXCHANGE, LOGGING_EXCHANGE] {
        channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| broker_err(format!("declaring exchange {exchange}"), e))?;
    }
    Ok(())
}

/// A component's own quarantine exchange and queue, fed by the runtime when
/// a handler permanently fails a delivery (§12).
pub fn quarantine_exchange_name(component: &str) -> String {
    format!("{component}.quarantine")
}

pub fn quarantine_queue_name(component: &str) -> String {
    format!("{component}.quarantine")
}

pub async fn declare_quarantine(channel: &Channel, component: &str) -> Result<(), PipelineError> {
    let exchange = quarantine_exchange_name(component);
    let queue = quarantine_queue_name(component);

    channel
        .exchange_declare(
            &exchange,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions { durable: true, ..Default::default() },
            FieldTable::default(),
        )
        .await
        .map_err(|e| broker_err(format!("declaring exchange {exchange}"), e))?;

    channel
        .queue_declare(&queue, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
        .await
        .map_err(|e| broker_err(format!("declaring queue {queue}"), e))?;

    channel
        .queue_bind(&queue, &exchange, "#", QueueBindOptions::default(), FieldTable::default())
        .await
        .map_err(|e| broker_err(format!("binding queue {queue}"), e))?;

    Ok(())
}

/// Declares a component's durable input queue against `source_exchange`,
/// bound to every pattern its configured routing states expand to (§4.1).
pub async fn declare_component_queue(
    channel: &Channel,
    source_exchange: &str,
    queue_name: &str,
    states: &[RoutingState],
) -> Result<(), PipelineError> {
    channel
        .queue_declare(queue_name, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
        .await
        .map_err(|e| broker_err(format!("declaring queue {queue_name}"), e))?;

    for pattern in cti_pipeline_domain::value_objects::binding_patterns_for(states) {
        channel
            .queue_bind(queue_name, source_exchange, &pattern, QueueBindOptions::default(), FieldTable::default())
            .await
            .map_err(|e| broker_err(format!("binding queue {queue_name} to {pattern}"), e))?;
    }

    Ok(())
}
