// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The generic consume → handle → publish → ack loop every component binary
//! runs (§4, §5). A handler decodes one delivery, does its stage's work,
//! and returns zero or more outgoing messages; the runtime takes care of
//! publisher confirms, ack/nack, quarantine-on-permanent-error, and
//! reconnect-with-backoff on a dropped connection.

use crate::infrastructure::broker::connection::{self, quarantine_exchange_name};
use crate::infrastructure::broker::retry::{calculate_delay, BackoffConfig};
use crate::infrastructure::metrics::MetricsService;
use cti_pipeline_bootstrap::CancellationToken;
use cti_pipeline_domain::{ErrorClass, PipelineError};
use deadpool_lapin::Pool;
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions, ConfirmSelectOptions,
};
use lapin::types::FieldTable;
use lapin::BasicProperties;
use std::sync::Arc;

/// One outgoing message a handler produces for the runtime to publish.
pub struct OutgoingMessage {
    pub exchange: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub properties: BasicProperties,
}

/// What a stage did with one delivery.
pub enum HandlerOutcome {
    /// Processing succeeded; publish these messages, then ack the input.
    Publish(Vec<OutgoingMessage>),
    /// The delivery decoded fine but this stage has nothing to emit for it
    /// (e.g. a reducer absorbing a row into in-memory state); just ack.
    Absorbed,
}

#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, delivery: &Delivery) -> Result<HandlerOutcome, PipelineError>;
}

/// §4.1/§7's default "requeued up to N times (config)" when a component's
/// config carries no `max_retries` override.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

pub struct ComponentRuntime {
    pool: Pool,
    component: String,
    queue_name: String,
    prefetch_count: u16,
    max_retries: u32,
    backoff: BackoffConfig,
    metrics: Option<Arc<MetricsService>>,
}

impl ComponentRuntime {
    pub fn new(pool: Pool, component: impl Into<String>, queue_name: impl Into<String>, prefetch_count: u16) -> Self {
        Self {
            pool,
            component: component.into(),
            queue_name: queue_name.into(),
            prefetch_count,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffConfig::default(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsService>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Runs the consume loop until `shutdown` is cancelled. Reconnects with
    /// backoff on a dropped channel/connection (`ErrorClass::TransientBroker`)
    /// rather than exiting; any other error bubbles to the caller, who maps
    /// it to an exit code (§7).
    pub async fn run(&self, handler: Arc<dyn Handler>, shutdown: CancellationToken) -> Result<(), PipelineError> {
        let mut attempt: u32 = 0;
        loop {
            if shutdown.is_cancelled() {
                return Ok(());
            }

            match self.run_once(handler.clone(), shutdown.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) if err.class() == ErrorClass::TransientBroker => {
                    attempt += 1;
                    let delay = calculate_delay(&self.backoff, attempt);
                    if let Some(metrics) = &self.metrics {
                        metrics.record_reconnect(&self.component);
                    }
                    tracing::warn!(component = %self.component, attempt, ?delay, error = %err, "broker connection lost, reconnecting");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.cancelled() => return Ok(()),
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn run_once(&self, handler: Arc<dyn Handler>, shutdown: CancellationToken) -> Result<(), PipelineError> {
        let connection = self.pool.get().await.map_err(|e| PipelineError::BrokerError(e.to_string()))?;
        let channel = connection.create_channel().await.map_err(|e| PipelineError::BrokerError(e.to_string()))?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| PipelineError::BrokerError(e.to_string()))?;

        channel
            .basic_qos(self.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| PipelineError::BrokerError(e.to_string()))?;

        let mut consumer = channel
            .basic_consume(
                &self.queue_name,
                &format!("{}-consumer", self.component),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| PipelineError::BrokerError(e.to_string()))?;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                next = consumer.next() => {
                    let Some(delivery) = next else {
                        return Err(PipelineError::BrokerError("consumer stream closed".to_string()));
                    };
                    let delivery = delivery.map_err(|e| PipelineError::BrokerError(e.to_string()))?;
                    self.process_delivery(&channel, &handler, delivery).await?;
                }
            }
        }
    }

    async fn process_delivery(
        &self,
        channel: &lapin::Channel,
        handler: &Arc<dyn Handler>,
        delivery: Delivery,
    ) -> Result<(), PipelineError> {
        match handler.handle(&delivery).await {
            Ok(HandlerOutcome::Absorbed) => {
                delivery.ack(BasicAckOptions::default()).await.map_err(|e| PipelineError::BrokerError(e.to_string()))
            }
            Ok(HandlerOutcome::Publish(messages)) => {
                for message in messages {
                    channel
                        .basic_publish(
                            &message.exchange,
                            &message.routing_key,
                            BasicPublishOptions::default(),
                            &message.payload,
                            message.properties,
                        )
                        .await
                        .map_err(|e| PipelineError::BrokerError(e.to_string()))?
                        .await
                        .map_err(|e| PipelineError::BrokerError(e.to_string()))?;
                }
                delivery.ack(BasicAckOptions::default()).await.map_err(|e| PipelineError::BrokerError(e.to_string()))
            }
            Err(err) => self.handle_failure(channel, delivery, err).await,
        }
    }

    /// §7's per-class disposition: transient-downstream errors are redelivered
    /// up to `max_retries` times (tracked via the `x-retry-count` header,
    /// since a plain `nack(requeue: true)` gives the broker no way to carry a
    /// count without a dead-letter policy this topology doesn't declare),
    /// then reclassified `PermanentInput` and quarantined; everything else
    /// that is not a broker-connection problem is quarantined and acked
    /// immediately so a single bad message cannot block the queue forever.
    async fn handle_failure(
        &self,
        channel: &lapin::Channel,
        delivery: Delivery,
        err: PipelineError,
    ) -> Result<(), PipelineError> {
        match err.class() {
            ErrorClass::TransientBroker => Err(err),
            ErrorClass::TransientDownstream => {
                let retry_count = retry_count(&delivery.properties);
                if retry_count < self.max_retries {
                    tracing::warn!(component = %self.component, error = %err, retry_count, "transient failure, requeueing");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_nack_requeue(&self.component);
                    }
                    self.republish_with_incremented_retry_count(channel, &delivery, retry_count).await?;
                    delivery.ack(BasicAckOptions::default()).await.map_err(|e| PipelineError::BrokerError(e.to_string()))
                } else {
                    tracing::warn!(component = %self.component, error = %err, retry_count, "retry budget exhausted, quarantining");
                    self.quarantine(channel, &delivery).await
                }
            }
            ErrorClass::FatalResource => {
                tracing::error!(component = %self.component, error = %err, "fatal resource condition, requeueing input and exiting");
                delivery
                    .nack(BasicNackOptions { requeue: true, ..Default::default() })
                    .await
                    .map_err(|e| PipelineError::BrokerError(e.to_string()))?;
                Err(err)
            }
            ErrorClass::PermanentInput | ErrorClass::PermanentConfig => {
                tracing::warn!(component = %self.component, error = %err, "permanent failure, quarantining");
                self.quarantine(channel, &delivery).await
            }
        }
    }

    /// Republishes `delivery` straight to this component's own queue (via
    /// the default exchange, whose routing key is the queue name) with
    /// `x-retry-count` set to `previous_count + 1`, so the next delivery of
    /// the same input carries a budget the broker's own redelivery can't.
    async fn republish_with_incremented_retry_count(
        &self,
        channel: &lapin::Channel,
        delivery: &Delivery,
        previous_count: u32,
    ) -> Result<(), PipelineError> {
        let properties = with_retry_count(&delivery.properties, previous_count + 1);
        channel
            .basic_publish(
                "",
                &self.queue_name,
                BasicPublishOptions::default(),
                delivery.data.as_slice(),
                properties,
            )
            .await
            .map_err(|e| PipelineError::BrokerError(e.to_string()))?
            .await
            .map_err(|e| PipelineError::BrokerError(e.to_string()))?;
        Ok(())
    }

    async fn quarantine(&self, channel: &lapin::Channel, delivery: &Delivery) -> Result<(), PipelineError> {
        if let Some(metrics) = &self.metrics {
            metrics.record_quarantine(&self.component);
        }
        let exchange = quarantine_exchange_name(&self.component);
        channel
            .basic_publish(&exchange, "", BasicPublishOptions::default(), delivery.data.as_slice(), delivery.properties.clone())
            .await
            .map_err(|e| PipelineError::BrokerError(e.to_string()))?
            .await
            .map_err(|e| PipelineError::BrokerError(e.to_string()))?;
        delivery.ack(BasicAckOptions::default()).await.map_err(|e| PipelineError::BrokerError(e.to_string()))
    }
}

/// Header name carrying this runtime's own redelivery counter (§7's "per-
/// message retry budget"), since the topology declares no dead-letter
/// policy for the `x-death` array AMQP brokers would otherwise populate.
const RETRY_COUNT_HEADER: &str = "x-retry-count";

fn retry_count(properties: &BasicProperties) -> u32 {
    properties
        .headers()
        .as_ref()
        .and_then(|table| table.inner().get(RETRY_COUNT_HEADER))
        .and_then(|value| match value {
            lapin::types::AMQPValue::LongInt(n) => Some(*n as u32),
            _ => None,
        })
        .unwrap_or(0)
}

fn with_retry_count(properties: &BasicProperties, count: u32) -> BasicProperties {
    let mut table = properties.headers().clone().unwrap_or_default();
    table.insert(lapin::types::ShortString::from(RETRY_COUNT_HEADER), lapin::types::AMQPValue::LongInt(count as i32));
    properties.clone().with_headers(table)
}

/// Publishes one outgoing message on a freshly-acquired channel, for
/// components (the logging sink, the recorder's DLQ) that publish without
/// running the full consume loop.
pub async fn publish_once(pool: &Pool, message: OutgoingMessage) -> Result<(), PipelineError> {
    let connection = pool.get().await.map_err(|e| PipelineError::BrokerError(e.to_string()))?;
    let channel = connection.create_channel().await.map_err(|e| PipelineError::BrokerError(e.to_string()))?;
    channel
        .confirm_select(ConfirmSelectOptions::default())
        .await
        .map_err(|e| PipelineError::BrokerError(e.to_string()))?;
    channel
        .basic_publish(&message.exchange, &message.routing_key, BasicPublishOptions::default(), &message.payload, message.properties)
        .await
        .map_err(|e| PipelineError::BrokerError(e.to_string()))?
        .await
        .map_err(|e| PipelineError::BrokerError(e.to_string()))?;
    Ok(())
}

pub use connection::{declare_component_queue, declare_quarantine, declare_shared_exchanges, build_pool};
