// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The bootstrap sequence every `src/bin/*.rs` component shares (§10):
//! parse and validate the CLI, load configuration, install logging, open
//! the broker pool, declare the shared topology plus this component's own
//! queue and quarantine, and start the metrics endpoint. What remains for
//! each binary's own `main` is wiring up its particular application
//! service and calling [`ComponentRuntime::run`].

use crate::infrastructure::broker::{build_pool, declare_component_queue, declare_quarantine, declare_shared_exchanges, DEFAULT_MAX_RETRIES, EVENT_EXCHANGE};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::metrics::{MetricsEndpoint, MetricsService};
use cti_pipeline_bootstrap::{create_signal_handler, ShutdownCoordinator, ValidatedCli};
use cti_pipeline_domain::PipelineError;
use deadpool_lapin::Pool;
use lapin::options::ConfirmSelectOptions;
use std::sync::Arc;
use std::time::Duration;

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// What a component's `main` needs once the broker topology is in place
/// and the metrics endpoint is already serving in the background.
pub struct ComponentStartup {
    pub config: AppConfig,
    pub pool: Pool,
    pub metrics: Arc<MetricsService>,
    pub shutdown: ShutdownCoordinator,
    pub prefetch_count: u16,
    pub max_retries: u32,
}

/// Runs the shared bootstrap sequence for `component`. `default_prefetch`
/// is the fallback used when neither `--prefetch-count` nor the
/// component's config section sets one (§6).
pub async fn start(component: &str, default_prefetch: u16) -> Result<ComponentStartup, PipelineError> {
    let cli: ValidatedCli = cti_pipeline_bootstrap::parse_and_validate().map_err(|e| PipelineError::invalid_config(e.to_string()))?;

    let config = AppConfig::load(&cli.config)?;
    crate::infrastructure::logging::init(&config.logging());

    let pool = build_pool(&config.rabbitmq()?)?;
    declare_topology(&pool, component, &config).await?;

    let metrics = Arc::new(MetricsService::new()?);
    let shutdown = ShutdownCoordinator::new(SHUTDOWN_GRACE_PERIOD);

    spawn_metrics_endpoint(metrics.clone(), config.metrics().bind_addr.clone(), shutdown.clone());
    spawn_signal_watcher(shutdown.clone());

    let prefetch_count = cli.prefetch_count.unwrap_or_else(|| config.prefetch_count(component, default_prefetch));
    let max_retries = config.max_retries(component, DEFAULT_MAX_RETRIES);

    Ok(ComponentStartup { config, pool, metrics, shutdown, prefetch_count, max_retries })
}

async fn declare_topology(pool: &Pool, component: &str, config: &AppConfig) -> Result<(), PipelineError> {
    let connection = pool.get().await.map_err(|e| PipelineError::BrokerError(e.to_string()))?;
    let channel = connection.create_channel().await.map_err(|e| PipelineError::BrokerError(e.to_string()))?;
    channel
        .confirm_select(ConfirmSelectOptions::default())
        .await
        .map_err(|e| PipelineError::BrokerError(e.to_string()))?;

    declare_shared_exchanges(&channel).await?;
    declare_quarantine(&channel, component).await?;
    let states = config.routing_states(component)?;
    declare_component_queue(&channel, EVENT_EXCHANGE, component, &states).await?;
    Ok(())
}

fn spawn_metrics_endpoint(metrics: Arc<MetricsService>, bind_addr: String, shutdown: ShutdownCoordinator) {
    tokio::spawn(async move {
        let endpoint = MetricsEndpoint::new(metrics);
        if let Err(err) = endpoint.run(&bind_addr, shutdown.token()).await {
            tracing::error!(error = %err, "metrics endpoint exited");
        }
    });
}

/// SIGTERM/SIGINT/SIGHUP trigger `coordinator.initiate_shutdown()`, which
/// cancels every token derived from it; each component's own loops race
/// that cancellation the same way the runtime's consume loop does.
fn spawn_signal_watcher(shutdown: ShutdownCoordinator) {
    tokio::spawn(async move {
        let handler = create_signal_handler();
        handler.wait_for_signal(Box::new(move || shutdown.initiate_shutdown())).await;
    });
}
