// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A hierarchical error type for the pipeline domain, organized along the
//! kinds enumerated in the error-handling design: transient broker failures,
//! transient downstream failures, permanent input/config failures, and fatal
//! resource conditions, plus the domain-level validation errors raised while
//! constructing events, organizations, and routing keys.

mod pipeline_error;

pub use pipeline_error::{ErrorClass, PipelineError};
