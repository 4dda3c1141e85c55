// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The aggregator process (§4.3): folds `parsed` deliveries into their
//! group's running state and emits `aggregated` messages on close.

use cti_pipeline::application::services::AggregatorService;
use cti_pipeline::infrastructure::broker::ComponentRuntime;
use cti_pipeline::infrastructure::repositories::FileAggregatorStateStore;
use cti_pipeline::infrastructure::startup;
use cti_pipeline_bootstrap::ExitCode;
use cti_pipeline_domain::PipelineError;
use std::sync::Arc;

const COMPONENT: &str = "aggregator";
const DEFAULT_PREFETCH: u16 = 20;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "aggregator exited");
            std::process::ExitCode::from(ExitCode::from(err.class()).as_i32() as u8)
        }
    }
}

async fn run() -> Result<(), PipelineError> {
    let boot = startup::start(COMPONENT, DEFAULT_PREFETCH).await?;
    let aggregator_config = boot.config.aggregator()?;

    let store = Arc::new(FileAggregatorStateStore::new(aggregator_config.dbpath.clone()));
    let service = Arc::new(AggregatorService::load(store).await?);

    let tick_interval = aggregator_config.tick_interval().to_std().unwrap_or(std::time::Duration::from_secs(3600));
    let tick_handle = tokio::spawn(service.clone().run_tick_loop(boot.pool.clone(), tick_interval, boot.shutdown.token()));

    let runtime = ComponentRuntime::new(boot.pool, COMPONENT, COMPONENT, boot.prefetch_count)
        .with_metrics(boot.metrics)
        .with_max_retries(boot.max_retries);
    let result = runtime.run(service, boot.shutdown.token()).await;

    boot.shutdown.initiate_shutdown();
    let _ = tick_handle.await;
    result
}
