// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The comparator differ (§4.4): turns a resolved series' full snapshot
//! into a delta against the prior snapshot.

use crate::entities::{BlKey, ComparatorEntry, ComparatorState, Delta, Event};
use crate::error::PipelineError;
use crate::value_objects::{LifecycleTag, SeriesId};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

/// Computes the delta between `prior` and `new_snapshot`, and the next
/// snapshot that results from applying it.
///
/// `compared_fields` is the per-source configuration list from §9 Open
/// Question 1: the set of field names (besides `expires`) whose equality
/// decides `bl-update` vs. `bl-change`. `None` means "all fields".
pub fn diff(
    prior: &ComparatorState,
    new_snapshot: HashMap<BlKey, Event>,
    series: SeriesId,
    compared_fields: Option<&HashSet<String>>,
    retention_after_delisting: Duration,
    now: DateTime<Utc>,
) -> Result<(Vec<Delta>, ComparatorState), PipelineError> {
    let mut deltas = Vec::new();
    let mut next_entries: HashMap<BlKey, ComparatorEntry> = HashMap::new();

    for (key, event) in &new_snapshot {
        let expires = event
            .expires
            .ok_or_else(|| PipelineError::invalid_event(format!("blacklist event {key} is missing expires")))?;
        let entry = ComparatorEntry { last_seen_series: series.clone(), event_snapshot: event.clone(), expires };

        let tag = match prior.entries.get(key) {
            None => LifecycleTag::BlNew,
            Some(old) => {
                if normalized(&old.event_snapshot, compared_fields)? == normalized(event, compared_fields)? {
                    if old.expires == expires {
                        // Identical in every respect the feed controls: no delta, but still
                        // carried forward into the next snapshot below.
                        next_entries.insert(key.clone(), entry);
                        continue;
                    }
                    LifecycleTag::BlUpdate
                } else {
                    LifecycleTag::BlChange
                }
            }
        };
        deltas.push(Delta { key: key.clone(), tag, entry: entry.clone() });
        next_entries.insert(key.clone(), entry);
    }

    for (key, old) in &prior.entries {
        if new_snapshot.contains_key(key) {
            continue;
        }
        if old.expires + retention_after_delisting >= now {
            deltas.push(Delta { key: key.clone(), tag: LifecycleTag::BlDelist, entry: old.clone() });
        }
        // Whether retained for delisting or fully expired, a missing key does
        // not carry forward into the next snapshot: §4.4 replaces the
        // snapshot wholesale with the new feed's contents.
    }

    let mut next = ComparatorState::empty();
    next.replace(next_entries);
    Ok((deltas, next))
}

/// Applies a set of deltas to a prior snapshot, producing the same next
/// snapshot `diff` would — the invariant exercised in the round-trip test
/// below (§8 "`apply(prior, deltas(prior, next)) == next`").
pub fn apply(prior: &ComparatorState, deltas: &[Delta]) -> ComparatorState {
    let mut entries = prior.entries.clone();
    for delta in deltas {
        match delta.tag {
            LifecycleTag::BlDelist => {
                entries.remove(&delta.key);
            }
            LifecycleTag::BlNew | LifecycleTag::BlUpdate | LifecycleTag::BlChange => {
                entries.insert(delta.key.clone(), delta.entry.clone());
            }
        }
    }
    let mut next = ComparatorState::empty();
    next.replace(entries);
    next
}

fn normalized(event: &Event, compared_fields: Option<&HashSet<String>>) -> Result<serde_json::Value, PipelineError> {
    let mut value = serde_json::to_value(event)?;
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("expires");
        if let Some(fields) = compared_fields {
            map.retain(|k, _| fields.contains(k));
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{Category, Confidence, EventId, Restriction, Source};

    fn bl_event(id_hex: &str, expires: DateTime<Utc>) -> Event {
        Event::builder(
            EventId::parse(id_hex).unwrap(),
            Source::parse("abuse-ch.feodo").unwrap(),
            Restriction::Public,
            Confidence::Medium,
            Category::Cnc,
            Utc::now(),
        )
        .expires(expires)
        .build()
        .unwrap()
    }

    #[test]
    fn classifies_new_update_and_delist() {
        let t0 = Utc::now();
        let k1_old = bl_event("a3a3384e2707a865c24a3ab3803f9f97", t0);
        let k2_old = bl_event("b3a3384e2707a865c24a3ab3803f9f97", t0);

        let mut prior = ComparatorState::empty();
        prior.entries.insert(
            "k1".to_string(),
            ComparatorEntry { last_seen_series: SeriesId::new("s0"), event_snapshot: k1_old, expires: t0 },
        );
        prior.entries.insert(
            "k2".to_string(),
            ComparatorEntry { last_seen_series: SeriesId::new("s0"), event_snapshot: k2_old, expires: t0 },
        );

        let k1_new = bl_event("a3a3384e2707a865c24a3ab3803f9f97", t0 + Duration::days(31));
        let k3_new = bl_event("c3a3384e2707a865c24a3ab3803f9f97", t0);

        let mut new_snapshot = HashMap::new();
        new_snapshot.insert("k1".to_string(), k1_new);
        new_snapshot.insert("k3".to_string(), k3_new);

        let (deltas, next) = diff(&prior, new_snapshot, SeriesId::new("s1"), None, Duration::days(30), t0).unwrap();

        let tags: HashMap<&str, LifecycleTag> = deltas.iter().map(|d| (d.key.as_str(), d.tag)).collect();
        assert_eq!(tags.get("k1"), Some(&LifecycleTag::BlUpdate));
        assert_eq!(tags.get("k3"), Some(&LifecycleTag::BlNew));
        assert_eq!(tags.get("k2"), Some(&LifecycleTag::BlDelist));
        assert!(!next.entries.contains_key("k2"));
        assert!(next.entries.contains_key("k1"));
        assert!(next.entries.contains_key("k3"));
    }

    #[test]
    fn apply_of_diff_reproduces_next_snapshot() {
        let t0 = Utc::now();
        let mut prior = ComparatorState::empty();
        prior.entries.insert(
            "k1".to_string(),
            ComparatorEntry { last_seen_series: SeriesId::new("s0"), event_snapshot: bl_event("a3a3384e2707a865c24a3ab3803f9f97", t0), expires: t0 },
        );

        let mut new_snapshot = HashMap::new();
        new_snapshot.insert("k1".to_string(), bl_event("a3a3384e2707a865c24a3ab3803f9f97", t0 + Duration::days(1)));
        new_snapshot.insert("k2".to_string(), bl_event("b3a3384e2707a865c24a3ab3803f9f97", t0));

        let (deltas, next) = diff(&prior, new_snapshot, SeriesId::new("s1"), None, Duration::days(30), t0).unwrap();
        let reapplied = apply(&prior, &deltas);
        assert_eq!(reapplied, next);
    }

    #[test]
    fn fully_expired_delisted_entry_is_not_emitted() {
        let t0 = Utc::now();
        let mut prior = ComparatorState::empty();
        prior.entries.insert(
            "k1".to_string(),
            ComparatorEntry {
                last_seen_series: SeriesId::new("s0"),
                event_snapshot: bl_event("a3a3384e2707a865c24a3ab3803f9f97", t0 - Duration::days(60)),
                expires: t0 - Duration::days(60),
            },
        );
        let (deltas, next) = diff(&prior, HashMap::new(), SeriesId::new("s1"), None, Duration::days(30), t0).unwrap();
        assert!(deltas.is_empty());
        assert!(next.entries.is_empty());
    }
}
