// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process wiring for the `wagate` binary.

pub mod serve;
pub mod telemetry;

pub use serve::{Gateway, run_serve};
