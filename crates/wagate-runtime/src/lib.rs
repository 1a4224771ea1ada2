// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session runtime for the Wagate gateway.
//!
//! [`SessionRuntime`] keeps a registry of per-session supervisors. Each
//! supervisor owns one remote client and drives the session state machine
//! (pairing, connected operation, reconnect with backoff, logout) from a
//! single task, so transitions within a session are totally ordered.

pub mod backoff;
mod command;
pub mod deadline;
pub mod restore;
mod runtime;
pub mod settings;
pub mod shutdown;
mod supervisor;

pub use backoff::Backoff;
pub use restore::RestoreReport;
pub use runtime::{RuntimeDeps, SessionCounts, SessionRuntime};
pub use settings::RuntimeSettings;
pub use shutdown::install_signal_handler;
