// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A delegate that records every callback it receives.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

use sharesync_core::types::{DecryptedAsset, InteractionAnchor, Message, Reaction, ShareChange};
use sharesync_core::{
    AssetDescriptor, GlobalIdentifier, GroupId, GroupInfo, LocalIdentifier, QueueItemId,
    SyncError, User, UserIdentifier,
};
use sharesync_download::{DownloadDelegate, HistoryItems, RestorationDelegate};
use sharesync_pipeline::{AssetRequest, PipelineDelegate};
use sharesync_sync::{AssetSyncingDelegate, BackedUpAsset, InteractionsSyncDelegate};

/// Records callbacks as `"<callback> <subject>"` strings, in call order.
///
/// Pipeline events use the queue item identifier as subject, download events
/// the global identifier.
#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<String>>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events whose text starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn joined<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

impl PipelineDelegate for RecordingDelegate {
    fn did_start_fetching(&self, id: &QueueItemId, _: &AssetRequest) {
        self.record(format!("start_fetching {id}"));
    }
    fn did_complete_fetching(&self, id: &QueueItemId, _: &AssetRequest) {
        self.record(format!("complete_fetching {id}"));
    }
    fn did_fail_fetching(&self, id: &QueueItemId, _: &AssetRequest, _: &SyncError) {
        self.record(format!("fail_fetching {id}"));
    }

    fn did_start_encryption(&self, id: &QueueItemId, _: &AssetRequest) {
        self.record(format!("start_encryption {id}"));
    }
    fn did_complete_encryption(&self, id: &QueueItemId, _: &AssetRequest) {
        self.record(format!("complete_encryption {id}"));
    }
    fn did_fail_encryption(&self, id: &QueueItemId, _: &AssetRequest, _: &SyncError) {
        self.record(format!("fail_encryption {id}"));
    }

    fn did_start_upload(&self, id: &QueueItemId, _: &AssetRequest) {
        self.record(format!("start_upload {id}"));
    }
    fn did_complete_upload(&self, id: &QueueItemId, _: &AssetRequest) {
        self.record(format!("complete_upload {id}"));
    }
    fn did_fail_upload(&self, id: &QueueItemId, _: &AssetRequest, _: &SyncError) {
        self.record(format!("fail_upload {id}"));
    }

    fn did_start_sharing(&self, id: &QueueItemId, _: &AssetRequest) {
        self.record(format!("start_sharing {id}"));
    }
    fn did_complete_sharing(&self, id: &QueueItemId, _: &AssetRequest) {
        self.record(format!("complete_sharing {id}"));
    }
    fn did_fail_sharing(&self, id: &QueueItemId, _: &AssetRequest, _: &SyncError) {
        self.record(format!("fail_sharing {id}"));
    }
}

impl DownloadDelegate for RecordingDelegate {
    fn did_receive_descriptors(
        &self,
        descriptors: &[AssetDescriptor],
        _: &BTreeMap<UserIdentifier, User>,
    ) {
        self.record(format!(
            "receive_descriptors {}",
            joined(descriptors.iter().map(|d| &d.global_identifier))
        ));
    }

    fn did_identify_local_assets(
        &self,
        descriptors: &BTreeMap<LocalIdentifier, AssetDescriptor>,
    ) {
        self.record(format!("identify_local_assets {}", joined(descriptors.keys())));
    }

    fn did_start_download(&self, global_identifiers: &[GlobalIdentifier]) {
        self.record(format!("start_download {}", joined(global_identifiers)));
    }

    fn did_complete_download(&self, asset: &DecryptedAsset) {
        self.record(format!("complete_download {}", asset.global_identifier));
    }

    fn did_fail_download(&self, global_identifier: &GlobalIdentifier, _: &SyncError) {
        self.record(format!("fail_download {global_identifier}"));
    }

    fn did_fail_repeatedly(&self, global_identifier: &GlobalIdentifier) {
        self.record(format!("fail_repeatedly {global_identifier}"));
    }

    fn did_complete_download_cycle(
        &self,
        descriptors: &BTreeMap<GlobalIdentifier, AssetDescriptor>,
    ) {
        self.record(format!("complete_download_cycle {}", descriptors.len()));
    }

    fn did_fail_download_cycle(&self, _: &SyncError) {
        self.record("fail_download_cycle".to_string());
    }
}

impl RestorationDelegate for RecordingDelegate {
    fn restore_upload_history_items(&self, items: &HistoryItems) {
        self.record(format!("restore_upload_history {}", joined(items.keys())));
    }

    fn restore_share_history_items(&self, items: &HistoryItems) {
        self.record(format!("restore_share_history {}", joined(items.keys())));
    }

    fn did_complete_restoration(&self, users: &BTreeSet<UserIdentifier>) {
        self.record(format!("complete_restoration {}", joined(users)));
    }
}

impl AssetSyncingDelegate for RecordingDelegate {
    fn assets_were_deleted(&self, assets: &[BackedUpAsset]) {
        self.record(format!(
            "assets_deleted {}",
            joined(assets.iter().map(|a| &a.global_identifier))
        ));
    }

    fn users_were_added_to_share(
        &self,
        global_identifier: &GlobalIdentifier,
        change: &ShareChange,
    ) {
        self.record(format!(
            "users_added {global_identifier} {}",
            joined(change.group_ids_by_recipient.keys())
        ));
    }

    fn users_were_removed_from_share(
        &self,
        global_identifier: &GlobalIdentifier,
        group_ids_by_recipient: &BTreeMap<UserIdentifier, Vec<GroupId>>,
    ) {
        self.record(format!(
            "users_removed_from_share {global_identifier} {}",
            joined(group_ids_by_recipient.keys())
        ));
    }

    fn groups_info_were_updated(&self, info_by_group: &BTreeMap<GroupId, GroupInfo>) {
        self.record(format!("groups_updated {}", joined(info_by_group.keys())));
    }

    fn groups_were_removed(&self, group_ids: &[GroupId]) {
        self.record(format!("groups_removed {}", joined(group_ids)));
    }

    fn users_were_removed(&self, user_identifiers: &[UserIdentifier]) {
        self.record(format!("users_removed {}", joined(user_identifiers)));
    }
}

impl InteractionsSyncDelegate for RecordingDelegate {
    fn did_receive_messages(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        messages: &[Message],
    ) {
        self.record(format!("messages {anchor}:{anchor_id} {}", messages.len()));
    }

    fn reactions_did_change(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        added: &[Reaction],
        removed: &[Reaction],
    ) {
        self.record(format!(
            "reactions {anchor}:{anchor_id} +{} -{}",
            added.len(),
            removed.len()
        ));
    }
}
