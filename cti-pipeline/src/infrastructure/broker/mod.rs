// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The AMQP 0.9.1 topic-exchange routing substrate (§4.1): connection
//! pooling, exchange/queue topology, and the generic per-component
//! consume-publish-ack runtime every binary drives.

pub mod connection;
pub mod retry;
pub mod runtime;

pub use connection::{
    build_pool, declare_component_queue, declare_quarantine, declare_shared_exchanges, quarantine_exchange_name,
    quarantine_queue_name, EVENT_EXCHANGE, LOGGING_EXCHANGE, RAW_EXCHANGE,
};
pub use runtime::{publish_once, ComponentRuntime, Handler, HandlerOutcome, OutgoingMessage, DEFAULT_MAX_RETRIES};
