// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The filter process (§4.5): fans one `compared`/`enriched` event out
//! into a `filtered` copy per organization and zone the auth snapshot
//! grants visibility to.

use cti_pipeline::infrastructure::auth::{self, SqliteAuthDataSource};
use cti_pipeline::infrastructure::broker::ComponentRuntime;
use cti_pipeline::infrastructure::startup;
use cti_pipeline::application::services::FilterService;
use cti_pipeline_bootstrap::ExitCode;
use cti_pipeline_domain::PipelineError;
use std::sync::Arc;

const COMPONENT: &str = "filter";
const DEFAULT_PREFETCH: u16 = 50;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "filter exited");
            std::process::ExitCode::from(ExitCode::from(err.class()).as_i32() as u8)
        }
    }
}

async fn run() -> Result<(), PipelineError> {
    let boot = startup::start(COMPONENT, DEFAULT_PREFETCH).await?;
    let auth_config = boot.config.auth_api_prefetching()?;
    let filter_config = boot.config.filter()?;
    let categories_filtered_through_fqdn_only = filter_config.categories_filtered_through_fqdn_only()?.into_iter().collect();

    let auth_source: Arc<dyn cti_pipeline_domain::repositories::AuthDataSource> = Arc::new(SqliteAuthDataSource::connect(&auth_config.uri).await?);
    let (auth_handle, prefetch_join) = auth::start(auth_source, auth_config, boot.shutdown.token()).await;

    let service = Arc::new(FilterService::new(auth_handle, categories_filtered_through_fqdn_only));

    let runtime = ComponentRuntime::new(boot.pool, COMPONENT, COMPONENT, boot.prefetch_count)
        .with_metrics(boot.metrics)
        .with_max_retries(boot.max_retries);
    let result = runtime.run(service, boot.shutdown.token()).await;

    boot.shutdown.initiate_shutdown();
    let _ = prefetch_join.await;
    result
}
