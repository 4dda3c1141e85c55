// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The recorder's `sqlx`-backed Event DB (§4.8, §6's `events` /
//! `client_to_event` schema).

use async_trait::async_trait;
use cti_pipeline_domain::repositories::{ClientDelivery, EventSink};
use cti_pipeline_domain::PipelineError;
use sqlx::SqlitePool;
use std::collections::HashSet;

/// Error codes from `recorder.fatal_db_api_error_codes` (§6): when the
/// underlying driver reports one of these, the failure is
/// [`cti_pipeline_domain::ErrorClass::FatalResource`], not a retryable
/// transient — e.g. `SQLITE_FULL` meaning the event DB's disk is full.
pub struct SqliteEventSink {
    pool: SqlitePool,
    fatal_codes: HashSet<String>,
}

impl SqliteEventSink {
    pub async fn connect(uri: &str, fatal_codes: Vec<String>) -> Result<Self, PipelineError> {
        let pool = SqlitePool::connect(uri).await.map_err(|e| PipelineError::DatabaseError(e.to_string()))?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS events (\
                id TEXT PRIMARY KEY, \
                source TEXT NOT NULL, \
                category TEXT NOT NULL, \
                time TEXT NOT NULL, \
                data TEXT NOT NULL\
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| PipelineError::DatabaseError(e.to_string()))?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS client_to_event (\
                event_id TEXT NOT NULL, \
                client TEXT NOT NULL, \
                zone TEXT NOT NULL, \
                PRIMARY KEY (event_id, client, zone)\
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| PipelineError::DatabaseError(e.to_string()))?;

        Ok(Self { pool, fatal_codes: fatal_codes.into_iter().collect() })
    }

    /// Exposed so integration tests can inspect the underlying tables
    /// directly instead of adding read paths this port has no other use for.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn classify(&self, err: sqlx::Error) -> PipelineError {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if self.fatal_codes.contains(code.as_ref()) {
                    return PipelineError::FatalResource(format!("database code {code}: {db_err}"));
                }
            }
        }
        PipelineError::DatabaseError(err.to_string())
    }
}

#[async_trait]
impl EventSink for SqliteEventSink {
    /// Upserts `events` by `id` and idempotently inserts every
    /// `(event_id, client, zone)` row in one transaction, so a redelivered
    /// batch after a crash between commit and ack changes nothing (§8).
    async fn record(&self, deliveries: &[ClientDelivery]) -> Result<(), PipelineError> {
        if deliveries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| self.classify(e))?;

        let mut seen_events = HashSet::new();
        for delivery in deliveries {
            let id = delivery.event.id.to_hex();
            if seen_events.insert(id.clone()) {
                let data = serde_json::to_string(&delivery.event).map_err(|e| PipelineError::SerializationError(e.to_string()))?;
                sqlx::query(
                    "INSERT INTO events (id, source, category, time, data) VALUES (?1, ?2, ?3, ?4, ?5) \
                     ON CONFLICT(id) DO UPDATE SET source = excluded.source, category = excluded.category, \
                     time = excluded.time, data = excluded.data",
                )
                .bind(&id)
                .bind(delivery.event.source.to_string())
                .bind(delivery.event.category.to_string())
                .bind(delivery.event.time.to_rfc3339())
                .bind(&data)
                .execute(&mut *tx)
                .await
                .map_err(|e| self.classify(e))?;
            }

            sqlx::query("INSERT OR IGNORE INTO client_to_event (event_id, client, zone) VALUES (?1, ?2, ?3)")
                .bind(&id)
                .bind(delivery.client.as_str())
                .bind(delivery.zone.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| self.classify(e))?;
        }

        tx.commit().await.map_err(|e| self.classify(e))
    }
}
