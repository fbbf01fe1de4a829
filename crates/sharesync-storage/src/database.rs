// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup and migrations.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Stores share one [`Database`] by cloning it; do not open extra
//! connections for writes.

use chrono::{DateTime, Utc};
use sharesync_config::model::StorageConfig;
use sharesync_core::SyncError;
use tracing::info;

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into `SyncError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SyncError {
    SyncError::Storage {
        source: Box::new(e),
    }
}

/// Fixed-width UTC timestamp so that text ordering is chronological.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// `?1, ?2, ...` placeholders starting at `first`.
pub(crate) fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Handle to the shared SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open the database at `path`, apply migrations and PRAGMAs.
    pub async fn open(path: &str) -> Result<Self, SyncError> {
        Self::open_with(path, true).await
    }

    /// Open using the storage section of the configuration.
    pub async fn open_from_config(config: &StorageConfig) -> Result<Self, SyncError> {
        if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SyncError::Storage {
                    source: Box::new(e),
                })?;
            }
        }
        Self::open_with(&config.database_path, config.wal_mode).await
    }

    async fn open_with(path: &str, wal_mode: bool) -> Result<Self, SyncError> {
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), SyncError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(|e| {
                SyncError::Storage {
                    source: Box::new(e),
                }
            })?;
            run_migrations(&mut conn)
        })
        .await
        .map_err(|e| SyncError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| SyncError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| {
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            }
            conn.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), SyncError> {
        self.conn
            .call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| SyncError::Storage {
            source: Box::new(e),
        })
    }
}
