// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Message headers and the filtered-event payload shape (§6).

use chrono::{DateTime, Utc};
use cti_pipeline_domain::entities::Event;
use cti_pipeline_domain::value_objects::{AccessZone, OrgId};
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::BasicProperties;
use serde::{Deserialize, Serialize};

/// §6's `type` header values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Stream,
    File,
    Blacklist,
    Event,
    BlNew,
    BlUpdate,
    BlChange,
    BlDelist,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Stream => "stream",
            MessageType::File => "file",
            MessageType::Blacklist => "blacklist",
            MessageType::Event => "event",
            MessageType::BlNew => "bl-new",
            MessageType::BlUpdate => "bl-update",
            MessageType::BlChange => "bl-change",
            MessageType::BlDelist => "bl-delist",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "stream" => MessageType::Stream,
            "file" => MessageType::File,
            "blacklist" => MessageType::Blacklist,
            "event" => MessageType::Event,
            "bl-new" => MessageType::BlNew,
            "bl-update" => MessageType::BlUpdate,
            "bl-change" => MessageType::BlChange,
            "bl-delist" => MessageType::BlDelist,
            _ => return None,
        })
    }
}

/// §6's message header set: `type`, `content_type`, `timestamp`,
/// `message_id`, and the optional blacklist/aggregator headers.
#[derive(Debug, Clone)]
pub struct Headers {
    pub message_type: MessageType,
    pub content_type: String,
    pub timestamp: DateTime<Utc>,
    pub message_id: String,
    pub series_id: Option<String>,
    pub series_end: bool,
    pub group: Option<String>,
}

impl Headers {
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            content_type: "application/json".to_string(),
            timestamp: Utc::now(),
            message_id: ulid::Ulid::new().to_string(),
            series_id: None,
            series_end: false,
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_series(mut self, series_id: impl Into<String>, series_end: bool) -> Self {
        self.series_id = Some(series_id.into());
        self.series_end = series_end;
        self
    }

    /// Builds the AMQP basic properties for a publish, persistent delivery
    /// mode (`delivery_mode=2`) per §6.
    pub fn to_properties(&self) -> BasicProperties {
        let mut table = FieldTable::default();
        table.insert(
            ShortString::from("type"),
            AMQPValue::LongString(LongString::from(self.message_type.as_str())),
        );
        if let Some(series_id) = &self.series_id {
            table.insert(ShortString::from("series_id"), AMQPValue::LongString(LongString::from(series_id.as_str())));
            table.insert(ShortString::from("series_end"), AMQPValue::Boolean(self.series_end));
        }
        if let Some(group) = &self.group {
            table.insert(ShortString::from("_group"), AMQPValue::LongString(LongString::from(group.as_str())));
        }

        BasicProperties::default()
            .with_content_type(ShortString::from(self.content_type.as_str()))
            .with_message_id(ShortString::from(self.message_id.as_str()))
            .with_timestamp(self.timestamp.timestamp() as u64)
            .with_delivery_mode(2)
            .with_headers(table)
    }

    /// Recovers headers from delivered AMQP properties. Falls back to
    /// `MessageType::Event` and a fresh message id when a producer omitted
    /// them, rather than failing the whole delivery over missing metadata.
    pub fn from_properties(properties: &BasicProperties) -> Self {
        let table = properties.headers().clone().unwrap_or_default();

        let message_type = table
            .inner()
            .get("type")
            .and_then(|v| match v {
                AMQPValue::LongString(s) => MessageType::parse(s.as_str()),
                _ => None,
            })
            .unwrap_or(MessageType::Event);

        let series_id = table.inner().get("series_id").and_then(|v| match v {
            AMQPValue::LongString(s) => Some(s.to_string()),
            _ => None,
        });

        let series_end = table.inner().get("series_end").and_then(|v| match v {
            AMQPValue::Boolean(b) => Some(*b),
            _ => None,
        }).unwrap_or(false);

        let group = table.inner().get("_group").and_then(|v| match v {
            AMQPValue::LongString(s) => Some(s.to_string()),
            _ => None,
        });

        Self {
            message_type,
            content_type: properties
                .content_type()
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/json".to_string()),
            timestamp: properties
                .timestamp()
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts as i64, 0))
                .unwrap_or_else(Utc::now),
            message_id: properties
                .message_id()
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| ulid::Ulid::new().to_string()),
            series_id,
            series_end,
            group,
        }
    }
}

/// The body of a `filtered`-state message (§4.5): the event plus the single
/// `(org, zone)` pair this copy is destined for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredPayload {
    pub event: Event,
    pub client: OrgId,
    pub zone: AccessZone,
    /// Whether the subsource binding that admitted this copy requires
    /// destination-address anonymization (§4.6) before the recorder sees it.
    #[serde(default)]
    pub anonymization_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_headers_through_amqp_properties() {
        let headers = Headers::new(MessageType::BlUpdate)
            .with_series("series-1", true)
            .with_group("1.2.3.4|80|tcp");

        let properties = headers.to_properties();
        let recovered = Headers::from_properties(&properties);

        assert_eq!(recovered.message_type.as_str(), "bl-update");
        assert_eq!(recovered.series_id.as_deref(), Some("series-1"));
        assert!(recovered.series_end);
        assert_eq!(recovered.group.as_deref(), Some("1.2.3.4|80|tcp"));
    }

    #[test]
    fn defaults_missing_headers_to_event_type() {
        let properties = BasicProperties::default();
        let recovered = Headers::from_properties(&properties);
        assert_eq!(recovered.message_type.as_str(), "event");
        assert!(recovered.series_id.is_none());
    }
}
