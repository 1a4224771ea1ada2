// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Wagate integration tests.
//!
//! Provides a recording event sink and a harness that assembles the session
//! runtime over a temp SQLite database and the loopback network, for fast,
//! deterministic tests without external services.
//!
//! # Components
//!
//! - [`RecordingSink`] - Event sink capturing every envelope, with wait helpers
//! - [`TestHarness`] - Runtime, storage, loopback controller and webhook registry

pub mod harness;
pub mod recording_sink;

pub use harness::{TestHarness, TestHarnessBuilder, fast_settings};
pub use recording_sink::RecordingSink;
