// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asset reconciliation pass.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use sharesync_core::types::{all_referenced_user_ids, DescriptorFilter};
use sharesync_core::{
    AssetDescriptor, BackgroundOperation, DownloadBlacklist, GlobalIdentifier, GroupId, GroupInfo,
    LocalIdentifier, LocalServer, RemoteServer, SyncError, Timeouts, UserIdentifier,
};
use sharesync_graph::ShareGraph;
use sharesync_pipeline::Pipeline;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::delegate::AssetSyncingDelegate;
use crate::diff::{AssetDescriptorsDiff, DiffOptions};

/// Counts of what one pass applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetsSyncReport {
    pub users_removed: usize,
    pub assets_removed: usize,
    pub state_changes: usize,
    pub groups_updated: usize,
    pub shares_extended: usize,
    pub shares_revoked: usize,
    pub groups_removed: usize,
    /// Steps that failed. Each was logged and the pass continued.
    pub errors: usize,
}

pub struct AssetsSync {
    remote: Arc<dyn RemoteServer>,
    local: Arc<dyn LocalServer>,
    blacklist: Arc<dyn DownloadBlacklist>,
    graph: Arc<ShareGraph>,
    pipeline: Arc<Pipeline>,
    current_user: UserIdentifier,
    timeouts: Timeouts,
    options: DiffOptions,
    delegates: Vec<Arc<dyn AssetSyncingDelegate>>,
}

impl AssetsSync {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        remote: Arc<dyn RemoteServer>,
        local: Arc<dyn LocalServer>,
        blacklist: Arc<dyn DownloadBlacklist>,
        graph: Arc<ShareGraph>,
        pipeline: Arc<Pipeline>,
        current_user: UserIdentifier,
        timeouts: Timeouts,
        options: DiffOptions,
    ) -> Self {
        Self {
            remote,
            local,
            blacklist,
            graph,
            pipeline,
            current_user,
            timeouts,
            options,
            delegates: Vec::new(),
        }
    }

    pub fn add_delegate(&mut self, delegate: Arc<dyn AssetSyncingDelegate>) {
        self.delegates.push(delegate);
    }

    fn notify(&self, f: impl Fn(&dyn AssetSyncingDelegate)) {
        for delegate in &self.delegates {
            f(delegate.as_ref());
        }
    }

    /// One reconciliation pass.
    ///
    /// Fetch failures abort the pass. Failures while applying the diff are
    /// logged and counted in the report.
    pub async fn run(&self) -> Result<AssetsSyncReport, SyncError> {
        let remote = self
            .timeouts
            .network(self.remote.asset_descriptors(&DescriptorFilter::default()))
            .await?;
        let local = self
            .timeouts
            .local(self.local.asset_descriptors(None))
            .await?;

        let mut report = AssetsSyncReport::default();
        self.remove_stale_users(&remote, &local, &mut report).await?;

        let diff =
            AssetDescriptorsDiff::generate_with(&remote, &local, &self.current_user, self.options);
        if diff.is_empty() {
            debug!(remote = remote.len(), local = local.len(), "local cache in sync");
            return Ok(report);
        }

        self.apply_removals(&diff, &mut report).await;
        self.apply_state_changes(&diff, &mut report).await;
        self.apply_group_info_changes(&diff, &mut report).await;
        self.apply_added_recipients(&diff, &mut report).await;
        self.apply_removed_recipients(&diff, &mut report).await;
        self.apply_removed_groups(&diff, &mut report).await;

        info!(
            assets_removed = report.assets_removed,
            state_changes = report.state_changes,
            groups_updated = report.groups_updated,
            shares_extended = report.shares_extended,
            shares_revoked = report.shares_revoked,
            groups_removed = report.groups_removed,
            errors = report.errors,
            "assets sync complete"
        );
        Ok(report)
    }

    /// Evict users the remote no longer references or no longer knows.
    async fn remove_stale_users(
        &self,
        remote: &[AssetDescriptor],
        local: &[AssetDescriptor],
        report: &mut AssetsSyncReport,
    ) -> Result<(), SyncError> {
        let remote_ids = all_referenced_user_ids(remote);
        let local_ids = all_referenced_user_ids(local);
        let union: Vec<UserIdentifier> = remote_ids.union(&local_ids).cloned().collect();
        if union.is_empty() {
            return Ok(());
        }

        let resolved = self
            .timeouts
            .network(self.remote.users(&union))
            .await?;

        let stale: Vec<UserIdentifier> = union
            .into_iter()
            .filter(|id| *id != self.current_user)
            .filter(|id| {
                (local_ids.contains(id) && !remote_ids.contains(id)) || !resolved.contains_key(id)
            })
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        info!(count = stale.len(), "removing users no longer on remote");
        let mut failed = false;
        if let Err(e) = self.timeouts.local(self.local.delete_users(&stale)).await {
            error!(error = %e, "failed to delete users from local store");
            failed = true;
        }
        if let Err(e) = self.graph.remove_users(&stale).await {
            error!(error = %e, "failed to remove users from share graph");
            failed = true;
        }
        if let Err(e) = self.blacklist.remove_users(&stale).await {
            error!(error = %e, "failed to remove users from blacklist");
            failed = true;
        }
        if failed {
            report.errors += 1;
        } else {
            report.users_removed = stale.len();
            self.notify(|d| d.users_were_removed(&stale));
        }
        Ok(())
    }

    async fn apply_removals(&self, diff: &AssetDescriptorsDiff, report: &mut AssetsSyncReport) {
        let removed = &diff.assets_removed_on_remote;
        if removed.is_empty() {
            return;
        }
        let gids: Vec<GlobalIdentifier> = removed
            .iter()
            .map(|a| a.global_identifier.clone())
            .collect();
        let local_ids: Vec<LocalIdentifier> = removed
            .iter()
            .filter_map(|a| a.local_identifier.clone())
            .collect();

        if let Err(e) = self.timeouts.local(self.local.delete_assets(&gids)).await {
            error!(
                error = %e,
                count = gids.len(),
                "assets deleted on remote could not be deleted locally, will retry next pass"
            );
            report.errors += 1;
            return;
        }

        if let Err(e) = self.pipeline.remove_items(&local_ids, &gids).await {
            error!(error = %e, "failed to purge queues of deleted assets");
            report.errors += 1;
        }
        if let Err(e) = self.blacklist.clean_entries(&gids).await {
            error!(error = %e, "failed to clean blacklist entries of deleted assets");
            report.errors += 1;
        }
        if let Err(e) = self.graph.remove_assets(&gids).await {
            error!(error = %e, "failed to remove deleted assets from share graph");
            report.errors += 1;
        }

        report.assets_removed = removed.len();
        self.notify(|d| d.assets_were_deleted(removed));
    }

    async fn apply_state_changes(
        &self,
        diff: &AssetDescriptorsDiff,
        report: &mut AssetsSyncReport,
    ) {
        for change in &diff.state_different_on_remote {
            let marked = self
                .timeouts
                .local(self.local.mark_asset(
                    &change.global_identifier,
                    change.quality,
                    change.new_upload_state,
                ))
                .await;
            match marked {
                Ok(()) => report.state_changes += 1,
                Err(e) => {
                    warn!(
                        gid = %change.global_identifier,
                        quality = %change.quality,
                        state = %change.new_upload_state,
                        error = %e,
                        "failed to mark asset with remote state"
                    );
                    report.errors += 1;
                }
            }
        }
    }

    async fn apply_group_info_changes(
        &self,
        diff: &AssetDescriptorsDiff,
        report: &mut AssetsSyncReport,
    ) {
        let mut updated: BTreeMap<GroupId, GroupInfo> = BTreeMap::new();
        for (group_id, change) in &diff.group_info_different_on_remote {
            let result = self
                .timeouts
                .local(self.local.update_group_info(group_id, &change.group_info))
                .await;
            match result {
                Ok(()) => {
                    updated.insert(group_id.clone(), change.group_info.clone());
                }
                Err(e) => {
                    error!(group = %group_id, error = %e, "failed to update group info");
                    report.errors += 1;
                }
            }
        }
        if !updated.is_empty() {
            report.groups_updated = updated.len();
            self.notify(|d| d.groups_info_were_updated(&updated));
        }
    }

    async fn apply_added_recipients(
        &self,
        diff: &AssetDescriptorsDiff,
        report: &mut AssetsSyncReport,
    ) {
        let changes = &diff.user_ids_added_to_the_share_of_asset_gid;
        if changes.is_empty() {
            return;
        }
        if let Err(e) = self.timeouts.local(self.local.add_recipients(changes)).await {
            error!(error = %e, "failed to add recipients to local shares");
            report.errors += 1;
            return;
        }
        if let Err(e) = self.graph.ingest_share_changes(changes).await {
            error!(error = %e, "failed to add recipients to share graph");
            report.errors += 1;
        }
        report.shares_extended = changes.len();
        for (gid, change) in changes {
            self.notify(|d| d.users_were_added_to_share(gid, change));
        }
    }

    async fn apply_removed_recipients(
        &self,
        diff: &AssetDescriptorsDiff,
        report: &mut AssetsSyncReport,
    ) {
        let removals = &diff.user_ids_removed_from_the_shares_of_asset_gid;
        if removals.is_empty() {
            return;
        }
        if let Err(e) = self.timeouts.local(self.local.remove_recipients(removals)).await {
            error!(error = %e, "failed to remove recipients from local shares");
            report.errors += 1;
            return;
        }

        let recipients_by_asset: BTreeMap<GlobalIdentifier, BTreeSet<UserIdentifier>> = removals
            .iter()
            .map(|(gid, by_user)| (gid.clone(), by_user.keys().cloned().collect()))
            .collect();
        if let Err(e) = self.graph.remove_sharing_information(&recipients_by_asset).await {
            error!(error = %e, "failed to remove recipients from share graph");
            report.errors += 1;
        }
        report.shares_revoked = removals.len();
        for (gid, by_user) in removals {
            self.notify(|d| d.users_were_removed_from_share(gid, by_user));
        }
    }

    async fn apply_removed_groups(
        &self,
        diff: &AssetDescriptorsDiff,
        report: &mut AssetsSyncReport,
    ) {
        if diff.group_info_removed_on_remote.is_empty() {
            return;
        }
        let group_ids: Vec<GroupId> = diff.group_info_removed_on_remote.iter().cloned().collect();
        match self
            .timeouts
            .local(self.local.remove_group_info(&group_ids))
            .await
        {
            Ok(()) => {
                report.groups_removed = group_ids.len();
                self.notify(|d| d.groups_were_removed(&group_ids));
            }
            Err(e) => {
                error!(error = %e, "failed to remove group info");
                report.errors += 1;
            }
        }
    }
}

#[async_trait]
impl BackgroundOperation for AssetsSync {
    fn name(&self) -> &str {
        "assets-sync"
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        self.run().await.map(|_| ())
    }
}
