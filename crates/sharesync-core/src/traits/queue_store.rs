// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::queue::{KeyMatch, QueueEntry, QueueItemId, QueueKind};

/// Persistent keyed FIFO queues.
///
/// Writes are idempotent with respect to the identifier: writing an existing
/// key replaces its payload. Dequeue removes a key exactly once.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Write `payload` under `id`, timestamped now.
    async fn enqueue(
        &self,
        queue: QueueKind,
        id: &QueueItemId,
        payload: &str,
    ) -> Result<(), SyncError>;

    /// Write `payload` under `id` at an explicit timestamp.
    async fn insert(
        &self,
        queue: QueueKind,
        id: &QueueItemId,
        payload: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SyncError>;

    /// Remove `id`. Returns whether it was present.
    async fn dequeue(&self, queue: QueueKind, id: &QueueItemId) -> Result<bool, SyncError>;

    /// Oldest entries first. A `limit` of 0 means no limit.
    async fn peek(
        &self,
        queue: QueueKind,
        limit: usize,
        created_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<QueueEntry>, SyncError>;

    async fn retrieve(
        &self,
        queue: QueueKind,
        ids: &[QueueItemId],
    ) -> Result<Vec<QueueEntry>, SyncError>;

    async fn retrieve_matching(
        &self,
        queue: QueueKind,
        key: &KeyMatch,
    ) -> Result<Vec<QueueEntry>, SyncError>;

    /// Remove every entry whose key matches. Returns the number removed.
    async fn remove_values(&self, queue: QueueKind, key: &KeyMatch) -> Result<usize, SyncError>;

    async fn count(&self, queue: QueueKind) -> Result<usize, SyncError>;

    async fn clear(&self, queue: QueueKind) -> Result<(), SyncError>;
}
