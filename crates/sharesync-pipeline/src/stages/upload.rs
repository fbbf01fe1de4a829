// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upload stage: push the encrypted asset to the remote and fan out.

use std::sync::Arc;

use async_trait::async_trait;
use sharesync_core::{AssetQuality, KeyMatch, QueueItemId, QueueKind, SyncError, UploadState};
use tracing::{debug, info, warn};

use crate::context::StageContext;
use crate::items::{AssetRequest, FetchRequest, QueueItem};
use crate::stage::QueueStage;

pub struct UploadStage {
    ctx: Arc<StageContext>,
}

impl UploadStage {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }

    async fn upload(&self, request: &AssetRequest) -> Result<(), SyncError> {
        let ctx = &self.ctx;
        let gid = request.global_identifier()?;

        let encrypted = ctx
            .timeouts
            .local(ctx.local.encrypted_asset(gid, &request.versions))
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("encrypted asset {gid}")))?;
        if &encrypted.global_identifier != gid {
            return Err(SyncError::GlobalIdentifierDisagreement {
                local_identifier: request.asset_key()?.to_string(),
                expected: gid.clone(),
                actual: encrypted.global_identifier,
            });
        }

        let server_gid = ctx
            .timeouts
            .network(ctx.remote.upload(&encrypted, &request.versions))
            .await?;
        if &server_gid != gid {
            return Err(SyncError::GlobalIdentifierDisagreement {
                local_identifier: request.asset_key()?.to_string(),
                expected: gid.clone(),
                actual: server_gid,
            });
        }
        Ok(())
    }

    /// Queue the follow-up work of a completed upload.
    async fn fan_out(&self, id: &QueueItemId, request: &AssetRequest) -> Result<(), SyncError> {
        let ctx = &self.ctx;

        if !request.has_recipients() {
            return Ok(());
        }
        ctx.enqueue(
            id,
            &QueueItem::Fetch(FetchRequest {
                request: request.clone(),
                should_upload: false,
            }),
        )
        .await?;

        // Background items never spawn further background work.
        if ctx.surrogate_resolution
            && !request.is_background
            && !request.versions.contains(&AssetQuality::Hi)
        {
            let mut full = request.with_versions(vec![AssetQuality::Hi]);
            full.is_background = true;
            let full_id = full.queue_item_id()?;
            ctx.enqueue(
                &full_id,
                &QueueItem::Fetch(FetchRequest {
                    request: full,
                    should_upload: true,
                }),
            )
            .await?;
            info!(id = %full_id, "queued full resolution upload");
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStage for UploadStage {
    fn kind(&self) -> QueueKind {
        QueueKind::Upload
    }

    fn context(&self) -> &StageContext {
        &self.ctx
    }

    async fn process(&self, id: &QueueItemId, item: QueueItem) -> Result<(), SyncError> {
        let request = match item {
            QueueItem::Upload(request) => request,
            other => {
                return Err(SyncError::Inconsistency(format!(
                    "upload stage received a {} item",
                    other.kind()
                )));
            }
        };
        let ctx = &self.ctx;

        if !request.is_background {
            ctx.delegates.notify(|d| d.did_start_upload(id, &request));
        }

        match self.upload(&request).await {
            Ok(()) => {
                // The remote already holds the asset.
                if let Some(gid) = &request.global_identifier
                    && let Err(e) = ctx
                        .mark_versions(gid, &request.versions, UploadState::Completed)
                        .await
                {
                    warn!(id = %id, error = %e, "uploaded asset not marked completed locally");
                }
                ctx.enqueue(id, &QueueItem::UploadHistory(request.clone()))
                    .await?;
                ctx.dequeue(QueueKind::Upload, id).await?;
                ctx.prune(QueueKind::FailedUpload, KeyMatch::Exact(id.to_string()))
                    .await?;
                debug!(id = %id, "uploaded asset");
                if !request.is_background {
                    ctx.delegates.notify(|d| d.did_complete_upload(id, &request));
                }
                self.fan_out(id, &request).await?;
            }
            Err(e) => {
                warn!(id = %id, error = %e, "upload failed");
                ctx.dequeue(QueueKind::Upload, id).await?;
                ctx.record_failed_upload(id, &request).await?;
                if let Some(gid) = &request.global_identifier
                    && let Err(mark_error) = ctx
                        .mark_versions(gid, &request.versions, UploadState::Failed)
                        .await
                {
                    debug!(id = %id, error = %mark_error, "local asset not marked failed");
                }
                if !request.is_background {
                    ctx.delegates.notify(|d| d.did_fail_upload(id, &request, &e));
                    if request.has_recipients() {
                        ctx.delegates.notify(|d| d.did_fail_sharing(id, &request, &e));
                    }
                }
            }
        }
        Ok(())
    }
}
