// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message and reaction reconciliation for shared groups and threads.
//!
//! Messages are append-only: missing ones are added, none are removed.
//! Reactions mirror the remote set exactly.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sharesync_core::types::{InteractionAnchor, Reaction};
use sharesync_core::{
    AssetDescriptor, BackgroundOperation, GroupId, LocalServer, RemoteServer, SyncError, Timeouts,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::delegate::InteractionsSyncDelegate;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionsSyncReport {
    pub anchors_synced: usize,
    pub anchors_failed: usize,
    pub messages_added: usize,
    pub reactions_added: usize,
    pub reactions_removed: usize,
}

pub struct InteractionsSync {
    remote: Arc<dyn RemoteServer>,
    local: Arc<dyn LocalServer>,
    timeouts: Timeouts,
    delegates: Vec<Arc<dyn InteractionsSyncDelegate>>,
}

/// Groups in which an asset was shared with someone other than its sender.
pub fn shared_group_ids(descriptors: &[AssetDescriptor]) -> BTreeSet<GroupId> {
    descriptors
        .iter()
        .flat_map(|d| {
            let sender = &d.sharing_info.shared_by_user_identifier;
            d.sharing_info
                .group_ids_by_recipient_user_identifier
                .iter()
                .filter(move |(user, _)| *user != sender)
                .flat_map(|(_, groups)| groups.iter().cloned())
        })
        .collect()
}

impl InteractionsSync {
    pub fn new(
        remote: Arc<dyn RemoteServer>,
        local: Arc<dyn LocalServer>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            remote,
            local,
            timeouts,
            delegates: Vec::new(),
        }
    }

    pub fn add_delegate(&mut self, delegate: Arc<dyn InteractionsSyncDelegate>) {
        self.delegates.push(delegate);
    }

    /// Sync every shared group in the local cache and every remote thread
    /// with more than one member.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
    ) -> Result<InteractionsSyncReport, SyncError> {
        let descriptors = self
            .timeouts
            .local(self.local.asset_descriptors(None))
            .await?;
        let threads = self.timeouts.network(self.remote.threads()).await?;

        let mut anchors: Vec<(InteractionAnchor, String)> = shared_group_ids(&descriptors)
            .into_iter()
            .map(|g| (InteractionAnchor::Group, g))
            .collect();
        anchors.extend(
            threads
                .into_iter()
                .filter(|t| t.member_ids.len() > 1)
                .map(|t| (InteractionAnchor::Thread, t.thread_id)),
        );

        let mut report = InteractionsSyncReport::default();
        for (anchor, anchor_id) in &anchors {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            match self.sync_anchor(*anchor, anchor_id, &mut report).await {
                Ok(()) => report.anchors_synced += 1,
                Err(e) => {
                    warn!(
                        anchor = %anchor,
                        id = %anchor_id,
                        error = %e,
                        "interactions sync failed"
                    );
                    report.anchors_failed += 1;
                }
            }
        }

        info!(
            synced = report.anchors_synced,
            failed = report.anchors_failed,
            messages = report.messages_added,
            reactions_added = report.reactions_added,
            reactions_removed = report.reactions_removed,
            "interactions sync complete"
        );
        Ok(report)
    }

    /// Reconcile the interactions under a single group or thread.
    pub async fn sync_anchor(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        report: &mut InteractionsSyncReport,
    ) -> Result<(), SyncError> {
        let remote = self
            .timeouts
            .network(self.remote.interactions(anchor, anchor_id))
            .await?;
        let local = self
            .timeouts
            .local(self.local.interactions(anchor, anchor_id))
            .await?;

        let known: HashSet<&str> = local
            .messages
            .iter()
            .map(|m| m.interaction_id.as_str())
            .collect();
        let missing: Vec<_> = remote
            .messages
            .iter()
            .filter(|m| !known.contains(m.interaction_id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            let added = self
                .timeouts
                .local(self.local.add_messages(anchor, anchor_id, missing))
                .await?;
            if !added.is_empty() {
                report.messages_added += added.len();
                for delegate in &self.delegates {
                    delegate.did_receive_messages(anchor, anchor_id, &added);
                }
            }
        }

        let to_add = difference(&remote.reactions, &local.reactions);
        let to_remove = difference(&local.reactions, &remote.reactions);
        if to_add.is_empty() && to_remove.is_empty() {
            debug!(anchor = %anchor, id = %anchor_id, "interactions in sync");
            return Ok(());
        }
        if !to_add.is_empty() {
            self.timeouts
                .local(self.local.add_reactions(anchor, anchor_id, to_add.clone()))
                .await?;
        }
        if !to_remove.is_empty() {
            self.timeouts
                .local(self.local.remove_reactions(anchor, anchor_id, to_remove.clone()))
                .await?;
        }
        report.reactions_added += to_add.len();
        report.reactions_removed += to_remove.len();
        for delegate in &self.delegates {
            delegate.reactions_did_change(anchor, anchor_id, &to_add, &to_remove);
        }
        Ok(())
    }
}

/// Reactions in `left` with no equivalent in `right`.
fn difference(left: &[Reaction], right: &[Reaction]) -> Vec<Reaction> {
    left.iter()
        .filter(|r| !right.iter().any(|other| r.same_reaction(other)))
        .cloned()
        .collect()
}

#[async_trait]
impl BackgroundOperation for InteractionsSync {
    fn name(&self) -> &str {
        "interactions-sync"
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        self.run(cancel).await.map(|_| ())
    }
}
