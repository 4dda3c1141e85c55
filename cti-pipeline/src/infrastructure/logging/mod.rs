// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Local structured logging (`tracing`/`tracing-subscriber`) plus the
//! `LoggingPublisher` sink that mirrors error events to the `logging`
//! exchange (§7, §11).

mod init;
mod publisher;

pub use init::init;
pub use publisher::LoggingPublisher;
