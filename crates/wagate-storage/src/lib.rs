// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Wagate gateway.
//!
//! Sessions, webhooks, encrypted device blobs and the message ledger live in
//! one database. All access goes through tokio-rusqlite's single background
//! connection, and schema changes are embedded refinery migrations.

pub mod adapter;
pub mod crypto;
pub mod database;
pub mod keystore;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::{Database, DatabaseOptions};
