// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborators shared by every pipeline stage.

use std::sync::Arc;

use sharesync_core::{
    AssetCrypto, AssetQuality, GlobalIdentifier, KeyMatch, LocalServer, PhotoLibrary, QueueEntry,
    QueueItemId, QueueKind, QueueStore, RemoteServer, SyncError, Timeouts, UploadState, User,
};
use sharesync_graph::ShareGraph;
use tracing::{debug, warn};

use crate::delegate::PipelineDelegates;
use crate::items::{AssetRequest, QueueItem};
use crate::processing::ProcessingRegistry;

/// Dependencies and policy shared by the stages.
pub struct StageContext {
    pub queues: Arc<dyn QueueStore>,
    pub local: Arc<dyn LocalServer>,
    pub remote: Arc<dyn RemoteServer>,
    pub library: Arc<dyn PhotoLibrary>,
    pub crypto: Arc<dyn AssetCrypto>,
    pub graph: Arc<ShareGraph>,
    pub delegates: PipelineDelegates,
    pub registry: ProcessingRegistry,
    pub timeouts: Timeouts,
    /// Upload a mid-resolution surrogate first and the full resolution in the background.
    pub surrogate_resolution: bool,
    pub current_user: User,
}

impl StageContext {
    pub async fn enqueue(&self, id: &QueueItemId, item: &QueueItem) -> Result<(), SyncError> {
        let kind = item.kind();
        self.queues.enqueue(kind, id, &item.encode()?).await?;
        debug!(queue = %kind, id = %id, "enqueued");
        Ok(())
    }

    pub async fn dequeue(&self, kind: QueueKind, id: &QueueItemId) -> Result<(), SyncError> {
        if !self.queues.dequeue(kind, id).await? {
            debug!(queue = %kind, id = %id, "item already removed");
        }
        Ok(())
    }

    /// Stored entry for `id`, if any.
    pub async fn entry(
        &self,
        kind: QueueKind,
        id: &QueueItemId,
    ) -> Result<Option<QueueEntry>, SyncError> {
        Ok(self
            .queues
            .retrieve(kind, std::slice::from_ref(id))
            .await?
            .into_iter()
            .next())
    }

    pub async fn prune(&self, kind: QueueKind, key: KeyMatch) -> Result<usize, SyncError> {
        let removed = self.queues.remove_values(kind, &key).await?;
        if removed > 0 {
            debug!(queue = %kind, removed, "pruned entries");
        }
        Ok(removed)
    }

    /// Record a failed fetch, encryption or upload.
    ///
    /// Any upload history for `id` is removed. A foreground request with
    /// recipients also gets a failed share record, since its share can no
    /// longer happen.
    pub async fn record_failed_upload(
        &self,
        id: &QueueItemId,
        request: &AssetRequest,
    ) -> Result<(), SyncError> {
        self.enqueue(id, &QueueItem::FailedUpload(request.clone()))
            .await?;
        self.prune(QueueKind::UploadHistory, KeyMatch::Exact(id.to_string()))
            .await?;
        if !request.is_background && request.has_recipients() {
            self.record_failed_share(id, request).await?;
        }
        Ok(())
    }

    pub async fn record_failed_share(
        &self,
        id: &QueueItemId,
        request: &AssetRequest,
    ) -> Result<(), SyncError> {
        self.enqueue(id, &QueueItem::FailedShare(request.clone()))
            .await
    }

    /// Mark each version of a local asset.
    ///
    /// Every failed version is logged here with its quality; the first error
    /// is returned.
    pub async fn mark_versions(
        &self,
        global_identifier: &GlobalIdentifier,
        versions: &[AssetQuality],
        state: UploadState,
    ) -> Result<(), SyncError> {
        let mut first_error = None;
        for quality in versions {
            let marked = self
                .timeouts
                .local(self.local.mark_asset(global_identifier, *quality, state))
                .await;
            if let Err(e) = marked {
                warn!(
                    gid = %global_identifier,
                    quality = %quality,
                    state = %state,
                    error = %e,
                    "failed to mark local asset"
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
