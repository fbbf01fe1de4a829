// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypt stage: encrypt for the owner and record the asset locally.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sharesync_core::types::SharingInfo;
use sharesync_core::{
    AssetDescriptor, GlobalIdentifier, GroupInfo, QueueItemId, QueueKind, SyncError, UploadState,
};
use tracing::{debug, warn};

use crate::context::StageContext;
use crate::items::{AssetRequest, QueueItem};
use crate::stage::QueueStage;

pub struct EncryptStage {
    ctx: Arc<StageContext>,
}

impl EncryptStage {
    pub fn new(ctx: Arc<StageContext>) -> Self {
        Self { ctx }
    }

    async fn encrypt(&self, request: &AssetRequest) -> Result<(), SyncError> {
        let ctx = &self.ctx;
        let gid = request.global_identifier()?;
        let local_identifier = request.local_identifier.as_ref().ok_or_else(|| {
            SyncError::InvalidRequest(format!("cannot encrypt {gid} without a local identifier"))
        })?;

        // Reuse the secret of a previous upload so every version shares it.
        let secret = ctx.timeouts.local(ctx.local.encryption_secret(gid)).await?;
        let asset = ctx
            .timeouts
            .local(ctx.library.retrieve(local_identifier, &request.versions))
            .await?;
        let encrypted = ctx
            .timeouts
            .local(ctx.crypto.encrypt(&asset, &request.versions, secret))
            .await?;

        let descriptor = synthesize_descriptor(request, gid, asset.creation_date, Utc::now());
        ctx.timeouts
            .local(ctx.local.create_assets(
                vec![encrypted],
                BTreeMap::from([(gid.clone(), descriptor)]),
                UploadState::NotStarted,
            ))
            .await
    }
}

/// Descriptor recorded locally before the remote knows about the asset.
pub(crate) fn synthesize_descriptor(
    request: &AssetRequest,
    global_identifier: &GlobalIdentifier,
    creation_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AssetDescriptor {
    let sender = request.event_originator.identifier.clone();
    let mut group_ids_by_recipient: BTreeMap<_, Vec<_>> = BTreeMap::new();
    group_ids_by_recipient.insert(sender.clone(), vec![request.group_id.clone()]);
    for recipient in &request.shared_with {
        group_ids_by_recipient.insert(recipient.identifier.clone(), vec![request.group_id.clone()]);
    }

    let invited = (!request.invited_users.is_empty()).then(|| {
        request
            .invited_users
            .iter()
            .map(|phone| (phone.clone(), now.to_rfc3339()))
            .collect()
    });
    let group_info = GroupInfo {
        name: None,
        encrypted_title: request.group_title.clone(),
        created_at: Some(now),
        created_by: Some(sender.clone()),
        permissions: Some(request.permissions),
        invited_users_phone_numbers: invited,
        created_from_thread_id: request.as_photo_message_in_thread_id.clone(),
    };

    AssetDescriptor {
        global_identifier: global_identifier.clone(),
        local_identifier: request.local_identifier.clone(),
        creation_date,
        upload_state: UploadState::NotStarted,
        sharing_info: SharingInfo {
            shared_by_user_identifier: sender,
            group_ids_by_recipient_user_identifier: group_ids_by_recipient,
            group_info_by_id: BTreeMap::from([(request.group_id.clone(), group_info)]),
        },
    }
}

#[async_trait]
impl QueueStage for EncryptStage {
    fn kind(&self) -> QueueKind {
        QueueKind::Encrypt
    }

    fn context(&self) -> &StageContext {
        &self.ctx
    }

    async fn process(&self, id: &QueueItemId, item: QueueItem) -> Result<(), SyncError> {
        let request = match item {
            QueueItem::Encrypt(request) => request,
            other => {
                return Err(SyncError::Inconsistency(format!(
                    "encrypt stage received a {} item",
                    other.kind()
                )));
            }
        };
        let ctx = &self.ctx;

        if !request.is_background {
            ctx.delegates.notify(|d| d.did_start_encryption(id, &request));
            if let Some(gid) = &request.global_identifier {
                if let Err(e) = ctx
                    .graph
                    .ingest_provisional_share(
                        gid,
                        request.local_identifier.as_ref(),
                        &request.event_originator.identifier,
                        &request.recipient_identifiers(),
                    )
                    .await
                {
                    warn!(id = %id, error = %e, "failed to record provisional share");
                }
            }
        }

        match self.encrypt(&request).await {
            Ok(()) => {
                ctx.enqueue(id, &QueueItem::Upload(request.clone())).await?;
                ctx.dequeue(QueueKind::Encrypt, id).await?;
                debug!(id = %id, "encrypted asset");
                if !request.is_background {
                    ctx.delegates.notify(|d| d.did_complete_encryption(id, &request));
                }
            }
            Err(e) => {
                warn!(id = %id, error = %e, "encryption failed");
                ctx.dequeue(QueueKind::Encrypt, id).await?;
                ctx.record_failed_upload(id, &request).await?;
                if let Some(gid) = &request.global_identifier
                    && let Err(mark_error) = ctx
                        .mark_versions(gid, &request.versions, UploadState::Failed)
                        .await
                {
                    debug!(id = %id, error = %mark_error, "local asset not marked failed");
                }
                if !request.is_background {
                    ctx.delegates.notify(|d| d.did_fail_encryption(id, &request, &e));
                    if request.has_recipients() {
                        ctx.delegates.notify(|d| d.did_fail_sharing(id, &request, &e));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharesync_core::{AssetQuality, User};

    #[test]
    fn synthesized_descriptor_includes_sender_and_group() {
        let request = AssetRequest {
            local_identifier: Some("L1".into()),
            global_identifier: Some("g1".into()),
            versions: vec![AssetQuality::Low, AssetQuality::Hi],
            group_id: "G1".into(),
            event_originator: User::new("alice", "Alice"),
            shared_with: vec![User::new("bob", "Bob")],
            invited_users: vec!["+15550100".into()],
            group_title: Some("trip".into()),
            as_photo_message_in_thread_id: None,
            permissions: 1,
            is_background: false,
        };
        let now = Utc::now();
        let descriptor = synthesize_descriptor(&request, &"g1".to_string(), None, now);

        assert_eq!(descriptor.upload_state, UploadState::NotStarted);
        assert_eq!(descriptor.sharing_info.shared_by_user_identifier, "alice");
        assert_eq!(descriptor.recipients_other_than_sender(), vec!["bob".to_string()]);
        let info = &descriptor.sharing_info.group_info_by_id["G1"];
        assert_eq!(info.created_by.as_deref(), Some("alice"));
        assert_eq!(info.permissions, Some(1));
        assert!(info
            .invited_users_phone_numbers
            .as_ref()
            .is_some_and(|m| m.contains_key("+15550100")));
    }
}
