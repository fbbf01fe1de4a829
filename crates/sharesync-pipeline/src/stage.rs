// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The common driver for every pipeline stage.

use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, future, stream};
use sharesync_core::{QueueItemId, QueueKind, SyncError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::context::StageContext;
use crate::items::QueueItem;

/// Items of one stage processed concurrently by a single run.
pub const MAX_CONCURRENT_ITEMS: usize = 4;

/// A stage that consumes one queue.
///
/// Implementors provide [`process`](QueueStage::process); the driver methods
/// reserve, load and decode items before handing them over.
#[async_trait]
pub trait QueueStage: Send + Sync {
    /// Queue consumed by this stage.
    fn kind(&self) -> QueueKind;

    fn context(&self) -> &StageContext;

    /// Handle one decoded item. Collaborator failures are recorded in the
    /// failed queues; an `Err` means the queue store itself failed.
    async fn process(&self, id: &QueueItemId, item: QueueItem) -> Result<(), SyncError>;

    /// Reserve, reload and process a single item. A missing item is a success.
    async fn run_once(&self, id: &QueueItemId) -> Result<(), SyncError> {
        let ctx = self.context();
        let kind = self.kind();
        let _reservation = ctx.registry.reserve(kind, id)?;

        let Some(entry) = ctx.entry(kind, id).await? else {
            debug!(queue = %kind, id = %id, "item no longer queued");
            return Ok(());
        };

        let item = match QueueItem::decode(id, &entry.payload) {
            Ok(item) if item.kind() == kind => item,
            Ok(item) => {
                error!(
                    queue = %kind,
                    id = %id,
                    found = %item.kind(),
                    "dropping item stored in the wrong queue"
                );
                ctx.dequeue(kind, id).await?;
                return Ok(());
            }
            Err(e) => {
                error!(queue = %kind, id = %id, error = %e, "dropping undecodable queue item");
                ctx.dequeue(kind, id).await?;
                return Ok(());
            }
        };

        self.process(id, item).await
    }

    /// Process queued items created up to now, oldest first. A `limit` of 0
    /// means no limit. Returns the number of items processed.
    async fn run(&self, limit: usize, cancel: &CancellationToken) -> Result<usize, SyncError> {
        let entries = self
            .context()
            .queues
            .peek(self.kind(), limit, Some(Utc::now()))
            .await?;
        let ids: Vec<QueueItemId> = entries.into_iter().map(|e| e.identifier).collect();
        self.run_for(&ids, cancel).await
    }

    /// Process the given items, up to [`MAX_CONCURRENT_ITEMS`] at a time.
    ///
    /// The token is checked before each item is admitted; items not admitted
    /// stay queued.
    async fn run_for(
        &self,
        ids: &[QueueItemId],
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let kind = self.kind();
        let results: Vec<(&QueueItemId, Result<(), SyncError>)> = stream::iter(ids)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|id| async move { (id, self.run_once(id).await) })
            .boxed()
            .buffer_unordered(MAX_CONCURRENT_ITEMS)
            .collect()
            .await;

        let mut processed = 0;
        for (id, result) in results {
            match result {
                Ok(()) => processed += 1,
                Err(SyncError::AlreadyProcessing { .. }) => {
                    debug!(queue = %kind, id = %id, "skipping item already in progress");
                }
                Err(e) => warn!(queue = %kind, id = %id, error = %e, "failed to process item"),
            }
        }
        debug!(queue = %kind, processed, total = ids.len(), "stage run finished");
        Ok(processed)
    }
}
