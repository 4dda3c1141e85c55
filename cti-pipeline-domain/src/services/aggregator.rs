// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The aggregator reducer (§4.3): collapses high-frequency repetitions of
//! the same event into one emitted message per bucket window while
//! preserving total counts.

use crate::entities::{AggregatorGroup, Event};
use crate::error::PipelineError;
use crate::value_objects::GroupKey;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// One input's effect on the aggregator's state: either nothing (folded
/// into an open group) or the event(s) to emit.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatorOutcome {
    Folded,
    Emitted(Event),
}

/// Applies one input event to the aggregator's state.
///
/// - If a group is open for `key` and `event.time` is within its window
///   (including out-of-order arrivals older than the group's `first`),
///   the event is folded in and nothing is emitted.
/// - If a group is open but `event.time` has rolled past the window end,
///   the open group is closed and emitted, and a new group is opened with
///   this event.
/// - If no group is open and the event is already older than `window`
///   relative to `now` (§4.3's "input older than any retained group"), it
///   is emitted immediately as a single-count event rather than opening a
///   group that would never close through the normal tick path.
pub fn apply(state: &mut HashMap<GroupKey, AggregatorGroup>, key: GroupKey, event: Event, window: Duration, now: DateTime<Utc>) -> Result<AggregatorOutcome, PipelineError> {
    match state.get_mut(&key) {
        Some(group) => {
            if event.time < group.window_end() {
                group.extend(event)?;
                Ok(AggregatorOutcome::Folded)
            } else {
                let closed = close(group);
                state.insert(key, AggregatorGroup::open(event, window));
                Ok(AggregatorOutcome::Emitted(closed))
            }
        }
        None => {
            if event.time + window < now {
                let mut single = AggregatorGroup::open(event, window);
                single.validate()?;
                Ok(AggregatorOutcome::Emitted(close(&single)))
            } else {
                state.insert(key, AggregatorGroup::open(event, window));
                Ok(AggregatorOutcome::Folded)
            }
        }
    }
}

/// Time-based tick (§4.3): closes and emits every group whose
/// `last + grace < now`.
pub fn tick(state: &mut HashMap<GroupKey, AggregatorGroup>, now: DateTime<Utc>, grace: Duration) -> Vec<Event> {
    let expired: Vec<GroupKey> = state
        .iter()
        .filter(|(_, group)| group.last + grace < now)
        .map(|(key, _)| key.clone())
        .collect();
    expired
        .into_iter()
        .filter_map(|key| state.remove(&key))
        .map(|group| close(&group))
        .collect()
}

/// Produces the emitted event for a closed group: the representative
/// payload with `count` and `time` set to the bucket's first event, per
/// §4.3's "retain the original event `id` of the bucket's first event".
fn close(group: &AggregatorGroup) -> Event {
    let mut event = group.representative.clone();
    event.count = Some(group.count as u32);
    event.time = group.first;
    event
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

    fn key() -> GroupKey {
        GroupKey::new(Source::parse("abuse-ch.feodo").unwrap(), "1.2.3.4|80|tcp")
    }

    #[test]
    fn three_inputs_within_window_fold_without_emitting() {
        let mut state = HashMap::new();
        let t0 = Utc::now();
        let window = Duration::hours(24);

        assert_eq!(apply(&mut state, key(), event_at(t0), window, t0).unwrap(), AggregatorOutcome::Folded);
        assert_eq!(apply(&mut state, key(), event_at(t0 + Duration::minutes(1)), window, t0).unwrap(), AggregatorOutcome::Folded);
        assert_eq!(apply(&mut state, key(), event_at(t0 + Duration::minutes(30)), window, t0).unwrap(), AggregatorOutcome::Folded);

        assert_eq!(state.get(&key()).unwrap().count, 3);
    }

    #[test]
    fn tick_after_window_plus_grace_emits_closed_group_with_total_count() {
        let mut state = HashMap::new();
        let t0 = Utc::now();
        let window = Duration::hours(24);
        apply(&mut state, key(), event_at(t0), window, t0).unwrap();
        apply(&mut state, key(), event_at(t0 + Duration::minutes(1)), window, t0).unwrap();
        apply(&mut state, key(), event_at(t0 + Duration::minutes(30)), window, t0).unwrap();

        let grace = Duration::hours(1);
        let later = t0 + Duration::hours(24) + Duration::hours(1) + Duration::minutes(1);
        let emitted = tick(&mut state, later, grace);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].count, Some(3));
        assert_eq!(emitted[0].time, t0);
        assert!(state.is_empty());
    }

    #[test]
    fn rollover_closes_old_group_and_opens_new_one() {
        let mut state = HashMap::new();
        let t0 = Utc::now();
        let window = Duration::hours(24);
        apply(&mut state, key(), event_at(t0), window, t0).unwrap();

        let past_window = t0 + Duration::hours(25);
        let outcome = apply(&mut state, key(), event_at(past_window), window, t0).unwrap();

        match outcome {
            AggregatorOutcome::Emitted(event) => {
                assert_eq!(event.count, Some(1));
                assert_eq!(event.time, t0);
            }
            AggregatorOutcome::Folded => panic!("expected rollover to emit the closed group"),
        }
        assert_eq!(state.get(&key()).unwrap().first, past_window);
    }

    #[test]
    fn counts_are_conserved_across_the_window() {
        let mut state = HashMap::new();
        let t0 = Utc::now();
        let window = Duration::hours(24);
        let input_count = 5;
        for i in 0..input_count {
            apply(&mut state, key(), event_at(t0 + Duration::minutes(i)), window, t0).unwrap();
        }
        let emitted = tick(&mut state, t0 + Duration::hours(26), Duration::hours(1));
        let total_emitted: u32 = emitted.iter().filter_map(|e| e.count).sum();
        assert_eq!(total_emitted, input_count as u32);
    }
}

/// §8's "for every group key and every window,
/// `sum(count over emitted events) == sum(count over input events)`",
/// checked against arbitrary (including out-of-order and off-window)
/// input sequences rather than the hand-picked ones above.
#[cfg(test)]
mod count_conservation {
    use super::*;
    use crate::value_objects::{Category, Confidence, EventId, Restriction, Source};
    use proptest::prelude::*;

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

    proptest! {
        #[test]
        fn every_input_is_accounted_for_exactly_once(offsets_minutes in prop::collection::vec(-7200i64..7200, 1..40)) {
            let key = GroupKey::new(Source::parse("abuse-ch.feodo").unwrap(), "1.2.3.4|80|tcp");
            let window = Duration::hours(24);
            let t0 = Utc::now();

            let mut state = HashMap::new();
            let mut already_emitted: u64 = 0;

            for minutes in &offsets_minutes {
                let outcome = apply(&mut state, key.clone(), event_at(t0 + Duration::minutes(*minutes)), window, t0).unwrap();
                if let AggregatorOutcome::Emitted(event) = outcome {
                    already_emitted += event.count.unwrap_or(0) as u64;
                }
            }

            // Past every possible `window_end` (offsets are bounded below 7200
            // minutes, window is 24h) plus the tick grace, so the flush below
            // is guaranteed to close every group the loop above could have left open.
            let far_future = t0 + Duration::minutes(7200 + 24 * 60 + 60 + 10);
            let flushed = tick(&mut state, far_future, Duration::hours(1));
            let flushed_count: u64 = flushed.iter().filter_map(|e| e.count).map(|c| c as u64).sum();

            prop_assert_eq!(already_emitted + flushed_count, offsets_minutes.len() as u64);
            prop_assert!(state.is_empty());
        }
    }
}
