// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetch stage: resolve the asset from the photo library.

use std::sync::Arc;

use async_trait::async_trait;
use sharesync_core::{KeyMatch, QueueItemId, QueueKind, SyncError};
use tracing::{debug, warn};

use crate::context::StageContext;
use crate::items::{AssetRequest, FetchRequest, QueueItem};
use crate::stage::QueueStage;

pub struct FetchStage {
    ctx: Arc<StageContext>,
}

impl FetchStage {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }

    /// Fill in the global identifier from the library when the request lacks one.
    async fn resolve(&self, request: &AssetRequest) -> Result<AssetRequest, SyncError> {
        let Some(local_identifier) = request.local_identifier.as_ref() else {
            // Remote-only asset, nothing to read locally.
            request.global_identifier()?;
            return Ok(request.clone());
        };
        let asset = self
            .ctx
            .timeouts
            .local(self.ctx.library.retrieve(local_identifier, &request.versions))
            .await?;
        let mut resolved = request.clone();
        if resolved.global_identifier.is_none() {
            resolved.global_identifier = Some(asset.global_identifier);
        }
        Ok(resolved)
    }
}

#[async_trait]
impl QueueStage for FetchStage {
    fn kind(&self) -> QueueKind {
        QueueKind::Fetch
    }

    fn context(&self) -> &StageContext {
        &self.ctx
    }

    async fn process(&self, id: &QueueItemId, item: QueueItem) -> Result<(), SyncError> {
        let (request, should_upload) = match item {
            QueueItem::Fetch(FetchRequest {
                request,
                should_upload,
            }) => (request, should_upload),
            other => {
                return Err(SyncError::Inconsistency(format!(
                    "fetch stage received a {} item",
                    other.kind()
                )));
            }
        };
        let ctx = &self.ctx;

        if !request.is_background {
            let key = request.asset_key()?;
            ctx.prune(
                QueueKind::FailedUpload,
                KeyMatch::Prefix(QueueItemId::asset_group_prefix(key, &request.group_id)),
            )
            .await?;
            ctx.prune(QueueKind::FailedShare, KeyMatch::Exact(id.to_string()))
                .await?;
            ctx.delegates.notify(|d| d.did_start_fetching(id, &request));
        }

        match self.resolve(&request).await {
            Ok(resolved) => {
                if should_upload {
                    ctx.enqueue(id, &QueueItem::Encrypt(resolved.clone())).await?;
                    ctx.dequeue(QueueKind::Fetch, id).await?;
                    if !resolved.is_background {
                        ctx.delegates.notify(|d| d.did_complete_fetching(id, &resolved));
                    }
                } else {
                    ctx.enqueue(id, &QueueItem::Share(resolved)).await?;
                    ctx.dequeue(QueueKind::Fetch, id).await?;
                }
                debug!(id = %id, should_upload, "fetched asset");
                Ok(())
            }
            Err(e) => {
                ctx.dequeue(QueueKind::Fetch, id).await?;
                if request.is_background {
                    debug!(id = %id, error = %e, "background fetch failed");
                    return Ok(());
                }
                warn!(id = %id, error = %e, "fetch failed");
                ctx.record_failed_upload(id, &request).await?;
                ctx.delegates.notify(|d| d.did_fail_fetching(id, &request, &e));
                Ok(())
            }
        }
    }
}
