// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain-specific errors for the event pipeline.
//!
//! Each variant maps to exactly one of the error-handling design's kinds
//! (`ErrorClass`) so that the component runtime can decide, without
//! inspecting message text, whether to reconnect, retry-then-quarantine,
//! quarantine immediately, fail fast at startup, or requeue-and-exit.

use thiserror::Error;

/// Domain-specific errors for the pipeline processing system.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("routing error: {0}")]
    RoutingError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("broker error: {0}")]
    BrokerError(String),

    #[error("timeout: {0}")]
    TimeoutError(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("security violation: {0}")]
    SecurityError(String),

    #[error("fatal resource condition: {0}")]
    FatalResource(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

/// The error-handling design's taxonomy (§7): what the component runtime
/// should do in response to a given error, independent of its message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connection lost, channel closed, confirm timeout: reconnect with
    /// backoff, no message loss.
    TransientBroker,
    /// DB deadlock, DNS timeout: bounded retry with backoff, then
    /// quarantine.
    TransientDownstream,
    /// Undecodable body, schema violation: ack-and-quarantine immediately.
    PermanentInput,
    /// Missing required config, bad binding spec: fail fast at startup.
    PermanentConfig,
    /// Disk full on the event DB (or another configured fatal code):
    /// requeue the input and exit non-zero.
    FatalResource,
}

impl PipelineError {
    pub fn invalid_event(msg: impl Into<String>) -> Self {
        Self::InvalidEvent(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn routing(msg: impl Into<String>) -> Self {
        Self::RoutingError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Classifies the error per the error-handling design (§7). Unclassified
    /// call sites default to `TransientDownstream`, matching the "unclassified
    /// exceptions are treated as transient until retry budget exhausts" rule;
    /// that default lives at the call site (application layer), not here,
    /// since only the caller knows the retry budget.
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::BrokerError(_) | PipelineError::TimeoutError(_) => ErrorClass::TransientBroker,
            PipelineError::DatabaseError(_) | PipelineError::ResourceExhausted(_) | PipelineError::IoError(_) => {
                ErrorClass::TransientDownstream
            }
            PipelineError::InvalidEvent(_) | PipelineError::ValidationError(_) | PipelineError::SerializationError(_) => {
                ErrorClass::PermanentInput
            }
            PipelineError::InvalidConfiguration(_) | PipelineError::RoutingError(_) => ErrorClass::PermanentConfig,
            PipelineError::FatalResource(_) => ErrorClass::FatalResource,
            PipelineError::SecurityError(_) | PipelineError::InternalError(_) => ErrorClass::TransientDownstream,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self.class(), ErrorClass::TransientBroker | ErrorClass::TransientDownstream)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_errors_are_transient_broker() {
        assert_eq!(PipelineError::BrokerError("x".into()).class(), ErrorClass::TransientBroker);
    }

    #[test]
    fn fatal_resource_is_fatal() {
        assert_eq!(PipelineError::FatalResource("disk full".into()).class(), ErrorClass::FatalResource);
    }

    #[test]
    fn invalid_event_is_permanent_input() {
        assert_eq!(PipelineError::InvalidEvent("bad".into()).class(), ErrorClass::PermanentInput);
    }

    #[test]
    fn recoverable_matches_transient_classes() {
        assert!(PipelineError::DatabaseError("x".into()).is_recoverable());
        assert!(!PipelineError::InvalidEvent("x".into()).is_recoverable());
    }
}
