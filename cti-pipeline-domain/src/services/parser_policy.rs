// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Parser fan-out policy (§9 "exceptions as control flow"): a per-row
//! `Result` plus a per-parser policy deciding whether one bad row poisons
//! the whole batch.

use crate::entities::Event;
use crate::error::PipelineError;

/// How a parser responds to a row it could not parse.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ParserPolicy {
    /// Drop the offending row and keep processing the rest of the batch.
    SkipBadRows,
    /// Abort the entire batch; the whole input is treated as
    /// `PermanentInput`.
    FailBatch,
}

/// Runs a parser's per-row results through its policy, producing the
/// events to emit or a single batch-level failure.
pub fn apply_policy(rows: Vec<Result<Event, PipelineError>>, policy: ParserPolicy) -> Result<Vec<Event>, PipelineError> {
    match policy {
        ParserPolicy::SkipBadRows => Ok(rows.into_iter().filter_map(Result::ok).collect()),
        ParserPolicy::FailBatch => rows.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{Category, Confidence, EventId, Restriction, Source};
    use chrono::Utc;

    fn ok_event() -> Result<Event, PipelineError> {
        Ok(Event::builder(
            EventId::parse("a3a3384e2707a865c24a3ab3803f9f97").unwrap(),
            Source::parse("abuse-ch.feodo").unwrap(),
            Restriction::Public,
            Confidence::Medium,
            Category::Bots,
            Utc::now(),
        )
        .build()
        .unwrap())
    }

    #[test]
    fn skip_bad_rows_keeps_valid_rows_only() {
        let rows = vec![ok_event(), Err(PipelineError::invalid_event("bad")), ok_event()];
        let events = apply_policy(rows, ParserPolicy::SkipBadRows).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn fail_batch_propagates_first_error() {
        let rows = vec![ok_event(), Err(PipelineError::invalid_event("bad"))];
        assert!(apply_policy(rows, ParserPolicy::FailBatch).is_err());
    }
}
