// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry points into the pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;

use sharesync_core::{
    AssetQuality, GlobalIdentifier, KeyMatch, LocalIdentifier, QueueItemId, QueueKind, SyncError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::StageContext;
use crate::items::{AssetRequest, FetchRequest, QueueItem, ShareTarget};
use crate::stage::QueueStage;
use crate::stages::{EncryptStage, FetchStage, ShareStage, UploadStage};

/// The four stages over a shared [`StageContext`].
pub struct Pipeline {
    ctx: Arc<StageContext>,
    fetch: FetchStage,
    encrypt: EncryptStage,
    upload: UploadStage,
    share: ShareStage,
}

impl Pipeline {
    pub fn new(ctx: StageContext) -> Self {
        let ctx = Arc::new(ctx);
        Self {
            fetch: FetchStage::new(ctx.clone()),
            encrypt: EncryptStage::new(ctx.clone()),
            upload: UploadStage::new(ctx.clone()),
            share: ShareStage::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &Arc<StageContext> {
        &self.ctx
    }

    /// Stage consuming `kind`, if it is a work queue.
    pub fn stage(&self, kind: QueueKind) -> Option<&dyn QueueStage> {
        match kind {
            QueueKind::Fetch => Some(&self.fetch),
            QueueKind::Encrypt => Some(&self.encrypt),
            QueueKind::Upload => Some(&self.upload),
            QueueKind::Share => Some(&self.share),
            _ => None,
        }
    }

    fn versions_for(&self, target: &ShareTarget) -> Vec<AssetQuality> {
        if self.ctx.surrogate_resolution && target.has_recipients_other_than(&self.ctx.current_user)
        {
            vec![AssetQuality::Low, AssetQuality::Mid]
        } else {
            vec![AssetQuality::Low, AssetQuality::Hi]
        }
    }

    fn request(
        &self,
        local_identifier: Option<&LocalIdentifier>,
        global_identifier: Option<&GlobalIdentifier>,
        target: &ShareTarget,
    ) -> AssetRequest {
        AssetRequest {
            local_identifier: local_identifier.cloned(),
            global_identifier: global_identifier.cloned(),
            versions: self.versions_for(target),
            group_id: target.group_id.clone(),
            event_originator: self.ctx.current_user.clone(),
            shared_with: target.shared_with.clone(),
            invited_users: target.invited_users.clone(),
            group_title: target.group_title.clone(),
            as_photo_message_in_thread_id: target.as_photo_message_in_thread_id.clone(),
            permissions: target.permissions,
            is_background: false,
        }
    }

    /// Queue library assets for upload, and for sharing when `target` has recipients.
    ///
    /// Every asset is attempted. If queueing fails, the request is recorded
    /// in the failed queues and the first error is returned.
    pub async fn request_upload(
        &self,
        local_identifiers: &[LocalIdentifier],
        target: &ShareTarget,
    ) -> Result<Vec<QueueItemId>, SyncError> {
        let mut queued = Vec::with_capacity(local_identifiers.len());
        let mut first_error = None;

        for local_identifier in local_identifiers {
            let request = self.request(Some(local_identifier), None, target);
            let id = request.queue_item_id()?;
            let item = QueueItem::Fetch(FetchRequest {
                request: request.clone(),
                should_upload: true,
            });
            match self.ctx.enqueue(&id, &item).await {
                Ok(()) => queued.push(id),
                Err(e) => {
                    error!(id = %id, error = %e, "failed to queue upload");
                    if let Err(e) = self.ctx.record_failed_upload(&id, &request).await {
                        error!(id = %id, error = %e, "failed to record failed request");
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        info!(queued = queued.len(), group = %target.group_id, "upload requested");
        match first_error {
            Some(e) => Err(e),
            None => Ok(queued),
        }
    }

    /// Queue an already uploaded asset for sharing.
    pub async fn request_share(
        &self,
        global_identifier: &GlobalIdentifier,
        local_identifier: Option<&LocalIdentifier>,
        target: &ShareTarget,
    ) -> Result<QueueItemId, SyncError> {
        if !target.has_recipients_other_than(&self.ctx.current_user) {
            return Err(SyncError::InvalidRequest(format!(
                "cannot share {global_identifier} without recipients"
            )));
        }
        let request = self.request(local_identifier, Some(global_identifier), target);
        let id = request.queue_item_id()?;
        if let Err(e) = self.ctx.enqueue(&id, &QueueItem::Share(request.clone())).await {
            error!(id = %id, error = %e, "failed to queue share");
            if let Err(e) = self.ctx.record_failed_share(&id, &request).await {
                error!(id = %id, error = %e, "failed to record failed share");
            }
            return Err(e);
        }
        info!(id = %id, "share requested");
        Ok(id)
    }

    /// Run every queued work item for the given library assets, stage by stage.
    pub async fn run_for_local_identifiers(
        &self,
        local_identifiers: &[LocalIdentifier],
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let mut processed = 0;
        for kind in QueueKind::WORK {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let Some(stage) = self.stage(kind) else {
                continue;
            };
            let mut ids = Vec::new();
            for local_identifier in local_identifiers {
                let prefix = KeyMatch::Prefix(QueueItemId::asset_prefix(local_identifier));
                ids.extend(
                    self.ctx
                        .queues
                        .retrieve_matching(kind, &prefix)
                        .await?
                        .into_iter()
                        .map(|e| e.identifier),
                );
            }
            processed += stage.run_for(&ids, cancel).await?;
        }
        Ok(processed)
    }

    /// Purge every queue of items for the given assets. Returns the number removed.
    pub async fn remove_items(
        &self,
        local_identifiers: &[LocalIdentifier],
        global_identifiers: &[GlobalIdentifier],
    ) -> Result<usize, SyncError> {
        if local_identifiers.is_empty() && global_identifiers.is_empty() {
            return Ok(0);
        }
        let local_ids: BTreeSet<&str> = local_identifiers.iter().map(String::as_str).collect();
        let gids: BTreeSet<&str> = global_identifiers.iter().map(String::as_str).collect();

        let mut removed = 0;
        for kind in QueueKind::ALL {
            for entry in self.ctx.queues.peek(kind, 0, None).await? {
                let key_matches = entry
                    .identifier
                    .asset_key()
                    .is_some_and(|key| local_ids.contains(key) || gids.contains(key));
                let request_matches = match QueueItem::decode(&entry.identifier, &entry.payload) {
                    Ok(item) => {
                        let request = item.request();
                        request
                            .local_identifier
                            .as_deref()
                            .is_some_and(|l| local_ids.contains(l))
                            || request
                                .global_identifier
                                .as_deref()
                                .is_some_and(|g| gids.contains(g))
                    }
                    Err(e) => {
                        warn!(queue = %kind, error = %e, "skipping undecodable item");
                        false
                    }
                };
                if (key_matches || request_matches)
                    && self.ctx.queues.dequeue(kind, &entry.identifier).await?
                {
                    debug!(queue = %kind, id = %entry.identifier, "removed item");
                    removed += 1;
                }
            }
        }
        info!(removed, "removed pipeline items");
        Ok(removed)
    }

    /// Number of entries in every queue.
    pub async fn queue_counts(&self) -> Result<Vec<(QueueKind, usize)>, SyncError> {
        let mut counts = Vec::with_capacity(QueueKind::ALL.len());
        for kind in QueueKind::ALL {
            counts.push((kind, self.ctx.queues.count(kind).await?));
        }
        Ok(counts)
    }
}
