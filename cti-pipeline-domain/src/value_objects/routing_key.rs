// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Routing-key and binding-key algebra (dependency-order item 1): the pure
//! functions every component's binding layout is built from. No broker
//! client lives here; the substrate in `cti-pipeline`'s infrastructure
//! layer calls these to compute what to declare and bind.

use crate::error::PipelineError;
use crate::value_objects::{Category, RoutingState, Source};
use std::fmt;

/// `<routing-state>.<category>.<provider>.<channel>`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RoutingKey {
    pub state: RoutingState,
    pub category: Category,
    pub source: Source,
}

impl RoutingKey {
    pub fn new(state: RoutingState, category: Category, source: Source) -> Self {
        Self { state, category, source }
    }

    pub fn parse(s: &str) -> Result<Self, PipelineError> {
        let mut parts = s.splitn(4, '.');
        let state = parts
            .next()
            .ok_or_else(|| PipelineError::routing(format!("empty routing key {s:?}")))?
            .parse()?;
        let category = parts
            .next()
            .ok_or_else(|| PipelineError::routing(format!("routing key {s:?} missing category")))?
            .parse()?;
        let provider = parts
            .next()
            .ok_or_else(|| PipelineError::routing(format!("routing key {s:?} missing provider")))?;
        let channel = parts
            .next()
            .ok_or_else(|| PipelineError::routing(format!("routing key {s:?} missing channel")))?;
        let source = Source::new(provider, channel)?;
        Ok(Self::new(state, category, source))
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.state, self.category, self.source.provider(), self.source.channel())
    }
}

/// Derives the binding patterns a component's queue should be bound to
/// given the routing-states it consumes (the `pipeline.<component>`
/// configuration list). Each state expands to `<state>.#`, matching every
/// category and source under that state, per §4.1's "expanding those
/// states into patterns".
pub fn binding_patterns_for(states: &[RoutingState]) -> Vec<String> {
    states.iter().map(|state| format!("{state}.#")).collect()
}

/// AMQP 0.9.1 topic-exchange matching: `*` matches exactly one
/// dot-separated segment, `#` matches zero or more segments (and may only
/// appear meaningfully as a whole segment; a plain segment must match
/// literally).
pub fn matches_binding(routing_key: &str, pattern: &str) -> bool {
    let key_segments: Vec<&str> = routing_key.split('.').collect();
    let pattern_segments: Vec<&str> = pattern.split('.').collect();
    match_segments(&key_segments, &pattern_segments)
}

fn match_segments(key: &[&str], pattern: &[&str]) -> bool {
    match pattern.first() {
        None => key.is_empty(),
        Some(&"#") => {
            if pattern.len() == 1 {
                return true;
            }
            // `#` may match zero segments too: try every split point.
            (0..=key.len()).any(|i| match_segments(&key[i..], &pattern[1..]))
        }
        Some(&"*") => !key.is_empty() && match_segments(&key[1..], &pattern[1..]),
        Some(seg) => key.first() == Some(seg) && match_segments(&key[1..], &pattern[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_patterns_expand_states() {
        let patterns = binding_patterns_for(&[RoutingState::Parsed, RoutingState::Aggregated]);
        assert_eq!(patterns, vec!["parsed.#", "aggregated.#"]);
    }

    #[test]
    fn state_hash_binds_every_category_and_source() {
        assert!(matches_binding("parsed.bots.abuse-ch.feodo", "parsed.#"));
        assert!(matches_binding("parsed.phish.x.y", "parsed.#"));
        assert!(!matches_binding("aggregated.bots.abuse-ch.feodo", "parsed.#"));
    }

    #[test]
    fn star_matches_exactly_one_segment() {
        assert!(matches_binding("parsed.bots.abuse-ch.feodo", "parsed.*.abuse-ch.feodo"));
        assert!(!matches_binding("parsed.bots.feodo", "parsed.*.abuse-ch.feodo"));
    }

    #[test]
    fn hash_matches_zero_segments() {
        assert!(matches_binding("parsed", "parsed.#"));
    }

    #[test]
    fn round_trips_routing_key_display_and_parse() {
        let rk = RoutingKey::new(RoutingState::Parsed, Category::Bots, Source::parse("abuse-ch.feodo").unwrap());
        let s = rk.to_string();
        assert_eq!(s, "parsed.bots.abuse-ch.feodo");
        let parsed = RoutingKey::parse(&s).unwrap();
        assert_eq!(parsed, rk);
    }

    #[test]
    fn no_overlap_means_zero_matches() {
        assert!(!matches_binding("enriched.bots.x.y", "parsed.#"));
        assert!(!matches_binding("enriched.bots.x.y", "compared.#"));
    }
}
