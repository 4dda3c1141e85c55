// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Aggregator bucket state (§3 `AggregatorGroup`). The transition logic
//! that mutates or closes a group lives in
//! [`crate::services::aggregator`]; this type only enforces the shape
//! invariants at construction and mutation time.

use crate::entities::Event;
use crate::error::PipelineError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorGroup {
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub count: u64,
    pub representative: Event,
    pub window: Duration,
}

impl AggregatorGroup {
    /// Opens a new group from its first event.
    pub fn open(event: Event, window: Duration) -> Self {
        Self { first: event.time, last: event.time, count: 1, representative: event, window }
    }

    /// The window's closing boundary (`first + window`).
    pub fn window_end(&self) -> DateTime<Utc> {
        self.first + self.window
    }

    /// Whether `time` falls inside this group's open window.
    pub fn covers(&self, time: DateTime<Utc>) -> bool {
        time >= self.first && time < self.window_end()
    }

    /// Extends the group with a new occurrence of the same grouped event,
    /// applying the last-writer rule to the representative's mutable
    /// fields and extending `last`. Does not check `covers`; the caller
    /// (the reducer) decides when extension vs. rollover applies.
    pub fn extend(&mut self, event: Event) -> Result<(), PipelineError> {
        if event.time > self.last {
            self.last = event.time;
            self.representative = event;
        }
        self.count = self.count.checked_add(1).ok_or_else(|| PipelineError::internal("aggregator count overflow"))?;
        self.validate()
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.first > self.last {
            return Err(PipelineError::internal("aggregator group has first > last"));
        }
        if self.last > self.window_end() {
            return Err(PipelineError::internal("aggregator group has last past window end"));
        }
        if self.count == 0 {
            return Err(PipelineError::internal("aggregator group has zero count"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{Category, Confidence, EventId, Restriction, Source};

    fn event_at(time: DateTime<Utc>) -> Event {
        Event::builder(
            EventId::parse("a3a3384e2707a865c24a3ab3803f9f97").unwrap(),
            Source::parse("abuse-ch.feodo").unwrap(),
            Restriction::Public,
            Confidence::Medium,
            Category::Bots,
            time,
        )
        .build()
        .unwrap()
    }

    #[test]
    fn open_starts_with_count_one() {
        let now = Utc::now();
        let group = AggregatorGroup::open(event_at(now), Duration::hours(24));
        assert_eq!(group.count, 1);
        assert_eq!(group.first, now);
        assert_eq!(group.last, now);
    }

    #[test]
    fn extend_increments_count_and_preserves_first() {
        let now = Utc::now();
        let mut group = AggregatorGroup::open(event_at(now), Duration::hours(24));
        group.extend(event_at(now + Duration::minutes(1))).unwrap();
        group.extend(event_at(now + Duration::minutes(30))).unwrap();
        assert_eq!(group.count, 3);
        assert_eq!(group.first, now);
        assert_eq!(group.last, now + Duration::minutes(30));
    }
}
