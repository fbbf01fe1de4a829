// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed FIFO queues backed by the `queue_items` table.
//!
//! Each queue is a namespace in one table. Writing an existing key replaces
//! the payload and moves the entry to the tail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params_from_iter;
use sharesync_core::{KeyMatch, QueueEntry, QueueItemId, QueueKind, QueueStore, SyncError};

use crate::database::{format_ts, map_tr_err, parse_ts, placeholders, Database};

/// SQLite implementation of [`QueueStore`].
#[derive(Clone)]
pub struct SqliteQueueStore {
    db: Database,
}

impl SqliteQueueStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<QueueEntry, rusqlite::Error> {
    let identifier: String = row.get(0)?;
    let payload: String = row.get(1)?;
    let created_at: String = row.get(2)?;
    Ok(QueueEntry {
        identifier: QueueItemId(identifier),
        payload,
        created_at: parse_ts(2, &created_at)?,
    })
}

/// SQL condition selecting identifiers for a key predicate, bound to `?2`.
fn key_condition(key: &KeyMatch) -> (&'static str, String) {
    match key {
        KeyMatch::Exact(k) => ("identifier = ?2", k.clone()),
        KeyMatch::Prefix(p) => ("substr(identifier, 1, length(?2)) = ?2", p.clone()),
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn enqueue(
        &self,
        queue: QueueKind,
        id: &QueueItemId,
        payload: &str,
    ) -> Result<(), SyncError> {
        self.insert(queue, id, payload, Utc::now()).await
    }

    async fn insert(
        &self,
        queue: QueueKind,
        id: &QueueItemId,
        payload: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let queue = queue.to_string();
        let id = id.as_str().to_string();
        let payload = payload.to_string();
        let at = format_ts(at);
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO queue_items (queue_name, identifier, payload, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (queue_name, identifier)
                     DO UPDATE SET payload = excluded.payload, created_at = excluded.created_at",
                    rusqlite::params![queue, id, payload, at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn dequeue(&self, queue: QueueKind, id: &QueueItemId) -> Result<bool, SyncError> {
        let queue = queue.to_string();
        let id = id.as_str().to_string();
        self.db
            .connection()
            .call(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM queue_items WHERE queue_name = ?1 AND identifier = ?2",
                    rusqlite::params![queue, id],
                )?;
                Ok(removed > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn peek(
        &self,
        queue: QueueKind,
        limit: usize,
        created_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<QueueEntry>, SyncError> {
        let queue = queue.to_string();
        // SQLite treats a negative LIMIT as unbounded.
        let limit: i64 = if limit == 0 { -1 } else { limit as i64 };
        let before = created_before.map(format_ts);
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT identifier, payload, created_at FROM queue_items
                     WHERE queue_name = ?1 AND (?2 IS NULL OR created_at <= ?2)
                     ORDER BY created_at ASC, rowid ASC
                     LIMIT ?3",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![queue, before, limit], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn retrieve(
        &self,
        queue: QueueKind,
        ids: &[QueueItemId],
    ) -> Result<Vec<QueueEntry>, SyncError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut params = vec![queue.to_string()];
        params.extend(ids.iter().map(|id| id.as_str().to_string()));
        let sql = format!(
            "SELECT identifier, payload, created_at FROM queue_items
             WHERE queue_name = ?1 AND identifier IN ({})
             ORDER BY created_at ASC, rowid ASC",
            placeholders(2, ids.len())
        );
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(params.iter()), row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn retrieve_matching(
        &self,
        queue: QueueKind,
        key: &KeyMatch,
    ) -> Result<Vec<QueueEntry>, SyncError> {
        let queue = queue.to_string();
        let (condition, value) = key_condition(key);
        let sql = format!(
            "SELECT identifier, payload, created_at FROM queue_items
             WHERE queue_name = ?1 AND {condition}
             ORDER BY created_at ASC, rowid ASC"
        );
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params![queue, value], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove_values(&self, queue: QueueKind, key: &KeyMatch) -> Result<usize, SyncError> {
        let queue = queue.to_string();
        let (condition, value) = key_condition(key);
        let sql = format!("DELETE FROM queue_items WHERE queue_name = ?1 AND {condition}");
        self.db
            .connection()
            .call(move |conn| {
                let removed = conn.execute(&sql, rusqlite::params![queue, value])?;
                Ok(removed)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn count(&self, queue: QueueKind) -> Result<usize, SyncError> {
        let queue = queue.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM queue_items WHERE queue_name = ?1",
                    rusqlite::params![queue],
                    |row| row.get(0),
                )?;
                Ok(count as usize)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn clear(&self, queue: QueueKind) -> Result<(), SyncError> {
        let queue = queue.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM queue_items WHERE queue_name = ?1",
                    rusqlite::params![queue],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
