// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Share stage: wrap the asset secrets for the recipients and share remotely.

use std::sync::Arc;

use async_trait::async_trait;
use sharesync_core::{KeyMatch, QueueItemId, QueueKind, SyncError};
use tracing::{debug, warn};

use crate::context::StageContext;
use crate::items::{AssetRequest, QueueItem};
use crate::stage::QueueStage;

pub struct ShareStage {
    ctx: Arc<StageContext>,
}

impl ShareStage {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }

    async fn share(&self, request: &AssetRequest) -> Result<(), SyncError> {
        let ctx = &self.ctx;
        let recipients = request.recipient_identifiers();
        if recipients.is_empty() {
            return Err(SyncError::InvalidRequest(
                "share request has no recipients other than the sender".into(),
            ));
        }
        let gid = request.global_identifier()?;

        let encrypted = ctx
            .timeouts
            .local(ctx.local.encrypted_asset(gid, &request.versions))
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("encrypted asset {gid}")))?;
        let payload = ctx
            .timeouts
            .local(ctx.crypto.shareable_payload(
                &encrypted,
                &request.shared_with,
                &request.group_id,
                request.as_photo_message_in_thread_id.as_deref(),
                request.permissions,
            ))
            .await?;
        ctx.timeouts
            .local(ctx.local.store_shareable(&payload))
            .await?;

        if !request.is_background {
            ctx.timeouts
                .network(ctx.remote.setup_group(
                    &request.group_id,
                    &request.shared_with,
                    request.group_title.as_deref(),
                    request.as_photo_message_in_thread_id.as_deref(),
                ))
                .await?;
            ctx.graph
                .ingest_share(gid, &request.event_originator.identifier, &recipients)
                .await?;
        }

        ctx.timeouts
            .network(ctx.remote.share(&payload, request.is_background))
            .await
    }
}

#[async_trait]
impl QueueStage for ShareStage {
    fn kind(&self) -> QueueKind {
        QueueKind::Share
    }

    fn context(&self) -> &StageContext {
        &self.ctx
    }

    async fn process(&self, id: &QueueItemId, item: QueueItem) -> Result<(), SyncError> {
        let request = match item {
            QueueItem::Share(request) => request,
            other => {
                return Err(SyncError::Inconsistency(format!(
                    "share stage received a {} item",
                    other.kind()
                )));
            }
        };
        let ctx = &self.ctx;

        if !request.is_background {
            ctx.delegates.notify(|d| d.did_start_sharing(id, &request));
        }

        match self.share(&request).await {
            Ok(()) => {
                if !request.is_background {
                    let key = request.asset_key()?;
                    ctx.prune(
                        QueueKind::ShareHistory,
                        KeyMatch::Prefix(QueueItemId::asset_group_prefix(key, &request.group_id)),
                    )
                    .await?;
                }
                ctx.enqueue(id, &QueueItem::ShareHistory(request.clone()))
                    .await?;
                ctx.dequeue(QueueKind::Share, id).await?;
                ctx.prune(QueueKind::FailedShare, KeyMatch::Exact(id.to_string()))
                    .await?;
                debug!(id = %id, "shared asset");
                if !request.is_background {
                    ctx.delegates.notify(|d| d.did_complete_sharing(id, &request));
                }
            }
            Err(e) => {
                warn!(id = %id, error = %e, "share failed");
                ctx.dequeue(QueueKind::Share, id).await?;
                ctx.record_failed_share(id, &request).await?;
                ctx.prune(QueueKind::ShareHistory, KeyMatch::Exact(id.to_string()))
                    .await?;
                if !request.is_background {
                    ctx.delegates.notify(|d| d.did_fail_sharing(id, &request, &e));
                }
            }
        }
        Ok(())
    }
}
