// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the sharesync engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`:
//!
//! - [`SqliteQueueStore`]: keyed FIFO queues for every pipeline stage
//! - [`SqliteTripleStore`]: the share graph's fact table
//! - [`SqliteDownloadBlacklist`]: failed download counts and blacklisted users

pub mod blacklist;
pub mod database;
pub mod migrations;
pub mod queue;
pub mod triples;

pub use blacklist::SqliteDownloadBlacklist;
pub use database::Database;
pub use queue::SqliteQueueStore;
pub use triples::SqliteTripleStore;
