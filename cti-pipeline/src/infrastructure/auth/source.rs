// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `sqlx`-backed [`AuthDataSource`] (§4.7): reads the Auth DB's
//! organizations and subsources tables and assembles them into a fresh
//! [`AuthSnapshot`]. Read-only — nothing in this module ever writes to
//! the Auth DB.

use async_trait::async_trait;
use chrono::Utc;
use cti_pipeline_domain::entities::{AuthSnapshot, OrgPredicate, Organization, Subsource};
use cti_pipeline_domain::repositories::AuthDataSource;
use cti_pipeline_domain::value_objects::{AccessZone, OrgId, Source};
use cti_pipeline_domain::PipelineError;
use sqlx::SqlitePool;
use std::collections::HashMap;

pub struct SqliteAuthDataSource {
    pool: SqlitePool,
}

impl SqliteAuthDataSource {
    pub async fn connect(uri: &str) -> Result<Self, PipelineError> {
        let pool = SqlitePool::connect(uri).await.map_err(|e| PipelineError::DatabaseError(e.to_string()))?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS organizations (\
                org_id TEXT PRIMARY KEY, \
                actual_name TEXT NOT NULL, \
                full_access INTEGER NOT NULL DEFAULT 0, \
                inside_criteria TEXT NOT NULL DEFAULT '{}', \
                notification_preferences TEXT NOT NULL DEFAULT '{}', \
                agreements TEXT NOT NULL DEFAULT '[]'\
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| PipelineError::DatabaseError(e.to_string()))?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS subsources (\
                source TEXT NOT NULL, \
                zone TEXT NOT NULL, \
                org_id TEXT NOT NULL, \
                predicate TEXT NOT NULL DEFAULT '{}', \
                PRIMARY KEY (source, zone, org_id)\
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| PipelineError::DatabaseError(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl AuthDataSource for SqliteAuthDataSource {
    async fn fetch_snapshot(&self) -> Result<AuthSnapshot, PipelineError> {
        let org_rows: Vec<(String, String, i64, String, String, String)> = sqlx::query_as(
            "SELECT org_id, actual_name, full_access, inside_criteria, notification_preferences, agreements FROM organizations",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PipelineError::DatabaseError(e.to_string()))?;

        let mut organizations = HashMap::new();
        for (org_id, actual_name, full_access, inside_criteria, notification_preferences, agreements) in org_rows {
            let org_id = OrgId::parse(&org_id)?;
            let organization = Organization {
                org_id: org_id.clone(),
                actual_name,
                full_access: full_access != 0,
                inside_criteria: serde_json::from_str(&inside_criteria).map_err(|e| PipelineError::SerializationError(e.to_string()))?,
                notification_preferences: serde_json::from_str(&notification_preferences)
                    .map_err(|e| PipelineError::SerializationError(e.to_string()))?,
                agreements: serde_json::from_str(&agreements).map_err(|e| PipelineError::SerializationError(e.to_string()))?,
            };
            organizations.insert(org_id, organization);
        }

        let sub_rows: Vec<(String, String, String, String)> =
            sqlx::query_as("SELECT source, zone, org_id, predicate FROM subsources")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| PipelineError::DatabaseError(e.to_string()))?;

        let mut subsources = Vec::with_capacity(sub_rows.len());
        for (source, zone, org_id, predicate) in sub_rows {
            let source = Source::parse(&source)?;
            let zone: AccessZone = zone.parse()?;
            let org_id = OrgId::parse(&org_id)?;
            let predicate: OrgPredicate =
                serde_json::from_str(&predicate).map_err(|e| PipelineError::SerializationError(e.to_string()))?;
            subsources.push(Subsource { source, zone, org_id, predicate });
        }

        Ok(AuthSnapshot::from_subsources(Utc::now(), organizations, subsources))
    }
}
