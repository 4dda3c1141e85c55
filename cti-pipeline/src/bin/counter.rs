// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The counter process (§12): the terminal stage, incrementing a
//! per-`(source, category)` metric for every `recorded` delivery.

use cti_pipeline::application::services::CounterService;
use cti_pipeline::infrastructure::broker::ComponentRuntime;
use cti_pipeline::infrastructure::startup;
use cti_pipeline_bootstrap::ExitCode;
use cti_pipeline_domain::PipelineError;
use std::sync::Arc;

const COMPONENT: &str = "counter";
const DEFAULT_PREFETCH: u16 = 100;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "counter exited");
            std::process::ExitCode::from(ExitCode::from(err.class()).as_i32() as u8)
        }
    }
}

async fn run() -> Result<(), PipelineError> {
    let boot = startup::start(COMPONENT, DEFAULT_PREFETCH).await?;
    let service = Arc::new(CounterService::new(boot.metrics.clone()));

    let runtime = ComponentRuntime::new(boot.pool, COMPONENT, COMPONENT, boot.prefetch_count)
        .with_metrics(boot.metrics)
        .with_max_retries(boot.max_retries);
    runtime.run(service, boot.shutdown.token()).await
}
