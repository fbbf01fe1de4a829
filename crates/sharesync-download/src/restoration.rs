// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History restoration for assets this user shared from another device.
//!
//! Restoration fetches the low resolution of each asset from an
//! [`AssetPayloadSource`], then rebuilds the upload and share history the
//! pipeline would have written had the asset been shared from this device.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sharesync_core::types::EncryptedAsset;
use sharesync_core::{
    AssetDescriptor, AssetQuality, GlobalIdentifier, GroupId, GroupInfo, LocalServer, QueueKind,
    QueueStore, RemoteServer, SyncError, Timeouts, UploadState, User, UserIdentifier,
};
use sharesync_pipeline::{AssetRequest, QueueItem};
use tracing::{debug, error, info, warn};

use crate::delegate::RestorationDelegate;

/// History items per group, each with the date it is filed under.
pub type HistoryItems = BTreeMap<GroupId, Vec<(AssetRequest, DateTime<Utc>)>>;

/// Where restored payloads come from.
#[async_trait]
pub trait AssetPayloadSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Low resolution of each asset. Assets the source does not have are absent.
    async fn low_resolution(
        &self,
        global_identifiers: &[GlobalIdentifier],
    ) -> Result<BTreeMap<GlobalIdentifier, EncryptedAsset>, SyncError>;

    /// Whether fetched payloads still need to be written to the local store.
    fn needs_local_copy(&self) -> bool;
}

/// Fetches from the remote authority. Used during download cycles.
pub struct RemotePayloadSource {
    remote: Arc<dyn RemoteServer>,
    timeouts: Timeouts,
}

impl RemotePayloadSource {
    pub fn new(remote: Arc<dyn RemoteServer>, timeouts: Timeouts) -> Self {
        Self { remote, timeouts }
    }
}

#[async_trait]
impl AssetPayloadSource for RemotePayloadSource {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn low_resolution(
        &self,
        global_identifiers: &[GlobalIdentifier],
    ) -> Result<BTreeMap<GlobalIdentifier, EncryptedAsset>, SyncError> {
        self.timeouts
            .network(
                self.remote
                    .fetch_assets(global_identifiers, &[AssetQuality::Low]),
            )
            .await
    }

    fn needs_local_copy(&self) -> bool {
        true
    }
}

/// Reads assets already in the local store. Used by the startup restore.
pub struct LocalPayloadSource {
    local: Arc<dyn LocalServer>,
    timeouts: Timeouts,
}

impl LocalPayloadSource {
    pub fn new(local: Arc<dyn LocalServer>, timeouts: Timeouts) -> Self {
        Self { local, timeouts }
    }
}

#[async_trait]
impl AssetPayloadSource for LocalPayloadSource {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn low_resolution(
        &self,
        global_identifiers: &[GlobalIdentifier],
    ) -> Result<BTreeMap<GlobalIdentifier, EncryptedAsset>, SyncError> {
        let mut assets = BTreeMap::new();
        for gid in global_identifiers {
            let asset = self
                .timeouts
                .local(self.local.encrypted_asset(gid, &[AssetQuality::Low]))
                .await?;
            match asset {
                Some(asset) => {
                    assets.insert(gid.clone(), asset);
                }
                None => debug!(gid = %gid, "no local low resolution to restore from"),
            }
        }
        Ok(assets)
    }

    fn needs_local_copy(&self) -> bool {
        false
    }
}

/// History rebuilt from a batch of descriptors.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SynthesizedHistory {
    pub upload: HistoryItems,
    pub share: HistoryItems,
    pub users_involved: BTreeSet<UserIdentifier>,
}

/// Rebuild upload history for groups that include `current_user` and share
/// history for groups with other recipients.
///
/// Descriptors whose sender is not in `users` are skipped, as are groups
/// without a creation date.
pub fn synthesize_history(
    current_user: &User,
    descriptors: &[AssetDescriptor],
    users: &BTreeMap<UserIdentifier, User>,
) -> SynthesizedHistory {
    let mut history = SynthesizedHistory::default();

    for descriptor in descriptors {
        let sharing = &descriptor.sharing_info;
        let Some(sender) = users.get(&sharing.shared_by_user_identifier) else {
            error!(
                gid = %descriptor.global_identifier,
                sender = %sharing.shared_by_user_identifier,
                "sender of restored asset is unknown, skipping"
            );
            continue;
        };

        // group -> (recipients, latest creation date, info)
        let mut shares: BTreeMap<&GroupId, (BTreeSet<&User>, DateTime<Utc>, &GroupInfo)> =
            BTreeMap::new();

        for (recipient_id, group_ids) in &sharing.group_ids_by_recipient_user_identifier {
            for group_id in group_ids {
                let Some(info) = sharing.group_info_by_id.get(group_id) else {
                    error!(gid = %descriptor.global_identifier, group = %group_id, "no group info");
                    continue;
                };
                let Some(created_at) = info.created_at else {
                    error!(
                        gid = %descriptor.global_identifier,
                        group = %group_id,
                        "group has no creation date"
                    );
                    continue;
                };

                if *recipient_id == current_user.identifier {
                    let request = history_request(descriptor, group_id, info, sender, Vec::new());
                    history
                        .upload
                        .entry(group_id.clone())
                        .or_default()
                        .push((request, created_at));
                    continue;
                }

                let Some(recipient) = users.get(recipient_id) else {
                    warn!(
                        gid = %descriptor.global_identifier,
                        user = %recipient_id,
                        "unknown recipient, skipping"
                    );
                    continue;
                };
                let entry = shares
                    .entry(group_id)
                    .or_insert_with(|| (BTreeSet::new(), created_at, info));
                entry.0.insert(recipient);
                entry.1 = entry.1.max(created_at);
                history.users_involved.insert(recipient_id.clone());
            }
        }

        for (group_id, (recipients, date, info)) in shares {
            let shared_with = recipients.into_iter().cloned().collect();
            let request = history_request(descriptor, group_id, info, sender, shared_with);
            history
                .share
                .entry(group_id.clone())
                .or_default()
                .push((request, date));
        }
    }

    history
}

fn history_request(
    descriptor: &AssetDescriptor,
    group_id: &GroupId,
    info: &GroupInfo,
    sender: &User,
    shared_with: Vec<User>,
) -> AssetRequest {
    AssetRequest {
        local_identifier: descriptor.local_identifier.clone(),
        global_identifier: Some(descriptor.global_identifier.clone()),
        versions: vec![AssetQuality::Low, AssetQuality::Hi],
        group_id: group_id.clone(),
        event_originator: sender.clone(),
        shared_with,
        invited_users: info
            .invited_users_phone_numbers
            .as_ref()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default(),
        group_title: info.encrypted_title.clone(),
        as_photo_message_in_thread_id: info.created_from_thread_id.clone(),
        permissions: info.permissions.unwrap_or(0),
        is_background: false,
    }
}

/// Restores history for assets shared by the current user.
pub struct Restoration {
    queues: Arc<dyn QueueStore>,
    local: Arc<dyn LocalServer>,
    timeouts: Timeouts,
    current_user: User,
    delegates: Vec<Arc<dyn RestorationDelegate>>,
}

impl Restoration {
    pub fn new(
        queues: Arc<dyn QueueStore>,
        local: Arc<dyn LocalServer>,
        timeouts: Timeouts,
        current_user: User,
    ) -> Self {
        Self {
            queues,
            local,
            timeouts,
            current_user,
            delegates: Vec::new(),
        }
    }

    pub fn add_delegate(&mut self, delegate: Arc<dyn RestorationDelegate>) {
        self.delegates.push(delegate);
    }

    /// Restore `descriptors` from `source`. Returns the global identifiers
    /// whose payload was found.
    pub async fn restore(
        &self,
        source: &dyn AssetPayloadSource,
        descriptors: &[AssetDescriptor],
        users: &BTreeMap<UserIdentifier, User>,
    ) -> Result<Vec<GlobalIdentifier>, SyncError> {
        if descriptors.is_empty() {
            return Ok(Vec::new());
        }

        let gids: Vec<GlobalIdentifier> = descriptors
            .iter()
            .map(|d| d.global_identifier.clone())
            .collect();
        let assets = source.low_resolution(&gids).await?;
        let restored: Vec<GlobalIdentifier> = assets.keys().cloned().collect();

        if source.needs_local_copy() && !assets.is_empty() {
            let by_gid: BTreeMap<GlobalIdentifier, AssetDescriptor> = descriptors
                .iter()
                .filter(|d| assets.contains_key(&d.global_identifier))
                .map(|d| (d.global_identifier.clone(), d.clone()))
                .collect();
            self.timeouts
                .local(self.local.create_assets(
                    assets.into_values().collect(),
                    by_gid,
                    UploadState::Completed,
                ))
                .await?;
        }

        let history = synthesize_history(&self.current_user, descriptors, users);
        let persisted_uploads = self
            .persist(QueueKind::UploadHistory, &history.upload)
            .await?;
        let persisted_shares = self
            .persist(QueueKind::ShareHistory, &history.share)
            .await?;

        for delegate in &self.delegates {
            if !history.upload.is_empty() {
                delegate.restore_upload_history_items(&history.upload);
            }
            if !history.share.is_empty() {
                delegate.restore_share_history_items(&history.share);
            }
            delegate.did_complete_restoration(&history.users_involved);
        }

        info!(
            source = source.name(),
            restored = restored.len(),
            upload_history = persisted_uploads,
            share_history = persisted_shares,
            "restoration complete"
        );
        Ok(restored)
    }

    /// Insert each item with its original date unless already present.
    async fn persist(&self, kind: QueueKind, items: &HistoryItems) -> Result<usize, SyncError> {
        let mut inserted = 0;
        for (request, date) in items.values().flatten() {
            let id = request.queue_item_id()?;
            let present = !self
                .queues
                .retrieve(kind, std::slice::from_ref(&id))
                .await?
                .is_empty();
            if present {
                continue;
            }
            let item = match kind {
                QueueKind::UploadHistory => QueueItem::UploadHistory(request.clone()),
                _ => QueueItem::ShareHistory(request.clone()),
            };
            self.queues.insert(kind, &id, &item.encode()?, *date).await?;
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharesync_core::SharingInfo;
    use tracing_test::traced_test;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn users() -> BTreeMap<UserIdentifier, User> {
        ["alice", "bob", "carol"]
            .into_iter()
            .map(|id| (id.to_string(), User::new(id, id.to_uppercase())))
            .collect()
    }

    fn descriptor(recipients: &[(&str, &str)], groups: &[(&str, Option<i64>)]) -> AssetDescriptor {
        let mut by_recipient: BTreeMap<UserIdentifier, Vec<GroupId>> = BTreeMap::new();
        for (user, group) in recipients {
            by_recipient
                .entry(user.to_string())
                .or_default()
                .push(group.to_string());
        }
        AssetDescriptor {
            global_identifier: "gid-1".into(),
            local_identifier: Some("L1".into()),
            creation_date: Some(at(100)),
            upload_state: UploadState::Completed,
            sharing_info: SharingInfo {
                shared_by_user_identifier: "alice".into(),
                group_ids_by_recipient_user_identifier: by_recipient,
                group_info_by_id: groups
                    .iter()
                    .map(|(g, created)| {
                        (
                            g.to_string(),
                            GroupInfo {
                                encrypted_title: Some(format!("title-{g}")),
                                created_at: created.map(at),
                                permissions: Some(2),
                                ..GroupInfo::default()
                            },
                        )
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn own_group_yields_upload_history_only() {
        let d = descriptor(&[("alice", "g-own")], &[("g-own", Some(500))]);
        let history = synthesize_history(&User::new("alice", "ALICE"), &[d], &users());

        assert!(history.share.is_empty());
        let items = &history.upload["g-own"];
        assert_eq!(items.len(), 1);
        let (request, date) = &items[0];
        assert_eq!(*date, at(500));
        assert!(request.shared_with.is_empty());
        assert_eq!(request.versions, vec![AssetQuality::Low, AssetQuality::Hi]);
        assert_eq!(request.group_title.as_deref(), Some("title-g-own"));
        assert_eq!(request.permissions, 2);
        assert_eq!(request.event_originator.identifier, "alice");
    }

    #[test]
    fn other_recipients_are_aggregated_per_group() {
        let d = descriptor(
            &[("alice", "g1"), ("bob", "g1"), ("carol", "g1"), ("bob", "g2")],
            &[("g1", Some(10)), ("g2", Some(20))],
        );
        let history = synthesize_history(&User::new("alice", "ALICE"), &[d], &users());

        assert_eq!(history.upload.len(), 1);
        assert_eq!(history.share.len(), 2);
        let (g1, _) = &history.share["g1"][0];
        let ids: Vec<&str> = g1.shared_with.iter().map(|u| u.identifier.as_str()).collect();
        assert_eq!(ids, vec!["bob", "carol"]);
        assert_eq!(history.share["g2"][0].1, at(20));
        assert_eq!(
            history.users_involved,
            BTreeSet::from(["bob".to_string(), "carol".to_string()])
        );
    }

    #[test]
    #[traced_test]
    fn groups_without_creation_date_are_skipped() {
        let d = descriptor(&[("alice", "g1"), ("bob", "g1")], &[("g1", None)]);
        let history = synthesize_history(&User::new("alice", "ALICE"), &[d], &users());
        assert_eq!(history, SynthesizedHistory::default());
        assert!(logs_contain("group has no creation date"));
    }

    #[test]
    #[traced_test]
    fn unknown_sender_is_skipped() {
        let d = descriptor(&[("alice", "g1")], &[("g1", Some(1))]);
        let mut known = users();
        known.remove("alice");
        let history = synthesize_history(&User::new("alice", "ALICE"), &[d], &known);
        assert!(history.upload.is_empty());
        assert!(logs_contain("sender of restored asset is unknown"));
    }
}
