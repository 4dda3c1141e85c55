// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The recorder process (§4.8): persists `filtered` deliveries to the
//! Event DB and emits a `recorded` message for the counter.

use cti_pipeline::application::services::RecorderService;
use cti_pipeline::infrastructure::broker::ComponentRuntime;
use cti_pipeline::infrastructure::repositories::SqliteEventSink;
use cti_pipeline::infrastructure::startup;
use cti_pipeline_bootstrap::ExitCode;
use cti_pipeline_domain::repositories::EventSink;
use cti_pipeline_domain::PipelineError;
use std::sync::Arc;

const COMPONENT: &str = "recorder";
const DEFAULT_PREFETCH: u16 = 20;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "recorder exited");
            std::process::ExitCode::from(ExitCode::from(err.class()).as_i32() as u8)
        }
    }
}

async fn run() -> Result<(), PipelineError> {
    let boot = startup::start(COMPONENT, DEFAULT_PREFETCH).await?;
    let recorder_config = boot.config.recorder()?;

    let sink: Arc<dyn EventSink> = Arc::new(SqliteEventSink::connect(&recorder_config.uri, recorder_config.fatal_db_api_error_codes()).await?);
    let service = Arc::new(RecorderService::new(sink, Some(boot.metrics.clone())));

    let runtime = ComponentRuntime::new(boot.pool, COMPONENT, COMPONENT, boot.prefetch_count)
        .with_metrics(boot.metrics)
        .with_max_retries(boot.max_retries);
    runtime.run(service, boot.shutdown.token()).await
}
