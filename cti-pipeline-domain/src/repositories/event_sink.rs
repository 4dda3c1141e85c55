// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The recorder's persistence port (§4.8).

use crate::entities::Event;
use crate::error::PipelineError;
use crate::value_objects::{AccessZone, OrgId};
use async_trait::async_trait;

/// One `(event, client, zone)` delivery the recorder must persist.
#[derive(Debug, Clone)]
pub struct ClientDelivery {
    pub event: Event,
    pub client: OrgId,
    pub zone: AccessZone,
}

/// Persists `filtered` events to the Event DB (§4.8, §6's `events` /
/// `client_to_event` schema). Implementations must make `record` safe to
/// call twice with the same `event.id`/`(event.id, client, zone)` (§8's
/// idempotence law).
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Upserts `events(id, ...)` and idempotently inserts into
    /// `client_to_event` for every delivery sharing this event id, inside
    /// one transaction (§4.8 steps 1-4).
    async fn record(&self, deliveries: &[ClientDelivery]) -> Result<(), PipelineError>;
}
