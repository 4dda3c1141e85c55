// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The comparator process (§4.4): buffers one blacklist series per
//! source and emits `compared` lifecycle-tagged messages on close.

use cti_pipeline::application::services::ComparatorService;
use cti_pipeline::infrastructure::broker::ComponentRuntime;
use cti_pipeline::infrastructure::repositories::FileComparatorStateStore;
use cti_pipeline::infrastructure::startup;
use cti_pipeline_bootstrap::ExitCode;
use cti_pipeline_domain::PipelineError;
use std::sync::Arc;
use std::time::Duration;

const COMPONENT: &str = "comparator";
const DEFAULT_PREFETCH: u16 = 20;

/// How often the background sweep checks for series gone quiet (§4.4).
/// Independent of, and much finer-grained than, the quiet threshold
/// itself: this is polling cadence, not the threshold.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "comparator exited");
            std::process::ExitCode::from(ExitCode::from(err.class()).as_i32() as u8)
        }
    }
}

async fn run() -> Result<(), PipelineError> {
    let boot = startup::start(COMPONENT, DEFAULT_PREFETCH).await?;
    let comparator_config = boot.config.comparator()?;

    let store = Arc::new(FileComparatorStateStore::new(comparator_config.dbpath.clone()));
    let service = Arc::new(ComparatorService::new(store, comparator_config));

    let sweep_handle = tokio::spawn(service.clone().run_quiet_sweep_loop(boot.pool.clone(), SWEEP_INTERVAL, boot.shutdown.token()));

    let runtime = ComponentRuntime::new(boot.pool, COMPONENT, COMPONENT, boot.prefetch_count)
        .with_metrics(boot.metrics)
        .with_max_retries(boot.max_retries);
    let result = runtime.run(service, boot.shutdown.token()).await;

    boot.shutdown.initiate_shutdown();
    let _ = sweep_handle.await;
    result
}
