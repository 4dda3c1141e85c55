// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete implementations of `cti-pipeline-domain`'s repository ports:
//! `sqlx`-backed event persistence, and write-then-rename JSON state
//! stores for the aggregator and comparator.

mod aggregator_store;
mod comparator_store;
mod file_store;
mod recorder_store;

pub use aggregator_store::FileAggregatorStateStore;
pub use comparator_store::FileComparatorStateStore;
pub use recorder_store::SqliteEventSink;
