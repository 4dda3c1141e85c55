// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The anonymizer process (§4.6): masks the destination address on
//! `filtered` deliveries whose matched subsource requires it, and passes
//! everything else through unchanged.

use cti_pipeline::application::services::AnonymizerService;
use cti_pipeline::infrastructure::broker::ComponentRuntime;
use cti_pipeline::infrastructure::startup;
use cti_pipeline_bootstrap::ExitCode;
use cti_pipeline_domain::PipelineError;
use std::sync::Arc;

const COMPONENT: &str = "anonymizer";
const DEFAULT_PREFETCH: u16 = 50;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "anonymizer exited");
            std::process::ExitCode::from(ExitCode::from(err.class()).as_i32() as u8)
        }
    }
}

async fn run() -> Result<(), PipelineError> {
    let boot = startup::start(COMPONENT, DEFAULT_PREFETCH).await?;
    let service = Arc::new(AnonymizerService::new());

    let runtime = ComponentRuntime::new(boot.pool, COMPONENT, COMPONENT, boot.prefetch_count)
        .with_metrics(boot.metrics)
        .with_max_retries(boot.max_retries);
    runtime.run(service, boot.shutdown.token()).await
}
