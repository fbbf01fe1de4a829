// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Download cycle: pull new descriptors, restore own history, fetch what
//! others shared.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sharesync_config::model::DownloadConfig;
use sharesync_core::types::{all_referenced_user_ids, DecryptedAsset, DescriptorFilter};
use sharesync_core::{
    AssetCrypto, AssetDescriptor, AssetQuality, BackgroundOperation, DownloadBlacklist,
    GlobalIdentifier, GroupId, LocalIdentifier, LocalServer, PhotoLibrary, QueueStore,
    RemoteServer, SyncError, Timeouts, UploadState, User, UserIdentifier,
};
use sharesync_graph::ShareGraph;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::delegate::{DownloadDelegate, RestorationDelegate};
use crate::restoration::{LocalPayloadSource, RemotePayloadSource, Restoration};

/// Collaborators used by [`DownloadOrchestrator`].
#[derive(Clone)]
pub struct DownloadDependencies {
    pub remote: Arc<dyn RemoteServer>,
    pub local: Arc<dyn LocalServer>,
    pub library: Arc<dyn PhotoLibrary>,
    pub crypto: Arc<dyn AssetCrypto>,
    pub blacklist: Arc<dyn DownloadBlacklist>,
    pub queues: Arc<dyn QueueStore>,
    pub graph: Arc<ShareGraph>,
}

/// Narrows a download cycle. An empty filter fetches everything since the
/// last successful cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadFilter {
    pub global_identifiers: Option<Vec<GlobalIdentifier>>,
    pub group_ids: Option<Vec<GroupId>>,
    pub since: Option<DateTime<Utc>>,
}

/// Outcome of one download cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// Descriptors that survived filtering and user resolution.
    pub received: Vec<GlobalIdentifier>,
    /// Own assets still present in the photo library.
    pub matched_locally: Vec<GlobalIdentifier>,
    pub restored: Vec<GlobalIdentifier>,
    pub downloaded: Vec<GlobalIdentifier>,
    pub failed: Vec<GlobalIdentifier>,
    /// Assets that reached the failed attempt threshold during this cycle.
    pub blacklisted: Vec<GlobalIdentifier>,
}

pub struct DownloadOrchestrator {
    deps: DownloadDependencies,
    restoration: Restoration,
    current_user: User,
    timeouts: Timeouts,
    failed_attempts_threshold: u32,
    delegates: Vec<Arc<dyn DownloadDelegate>>,
    last_fetch: Mutex<Option<DateTime<Utc>>>,
}

impl DownloadOrchestrator {
    pub fn new(
        deps: DownloadDependencies,
        current_user: User,
        timeouts: Timeouts,
        config: &DownloadConfig,
    ) -> Self {
        let restoration = Restoration::new(
            deps.queues.clone(),
            deps.local.clone(),
            timeouts,
            current_user.clone(),
        );
        Self {
            deps,
            restoration,
            current_user,
            timeouts,
            failed_attempts_threshold: config.failed_attempts_threshold.max(1),
            delegates: Vec::new(),
            last_fetch: Mutex::new(None),
        }
    }

    pub fn add_delegate(&mut self, delegate: Arc<dyn DownloadDelegate>) {
        self.delegates.push(delegate);
    }

    pub fn add_restoration_delegate(&mut self, delegate: Arc<dyn RestorationDelegate>) {
        self.restoration.add_delegate(delegate);
    }

    /// Start of the last cycle that completed without failed downloads.
    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        *self.last_fetch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, f: impl Fn(&dyn DownloadDelegate)) {
        for delegate in &self.delegates {
            f(delegate.as_ref());
        }
    }

    /// Run one download cycle.
    pub async fn run(
        &self,
        filter: &DownloadFilter,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport, SyncError> {
        let started_at = Utc::now();
        match self.cycle(filter, cancel).await {
            Ok((report, descriptors)) => {
                // Failed downloads are retried by refetching from the same point.
                if report.failed.is_empty() {
                    *self.last_fetch.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(started_at);
                }
                self.notify(|d| d.did_complete_download_cycle(&descriptors));
                info!(
                    received = report.received.len(),
                    matched = report.matched_locally.len(),
                    restored = report.restored.len(),
                    downloaded = report.downloaded.len(),
                    failed = report.failed.len(),
                    "download cycle complete"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "download cycle failed");
                self.notify(|d| d.did_fail_download_cycle(&e));
                Err(e)
            }
        }
    }

    async fn cycle(
        &self,
        filter: &DownloadFilter,
        cancel: &CancellationToken,
    ) -> Result<(DownloadReport, BTreeMap<GlobalIdentifier, AssetDescriptor>), SyncError> {
        let mut report = DownloadReport::default();

        let descriptors = self.new_remote_descriptors(filter).await?;
        let descriptors = self.drop_blacklisted(descriptors).await?;
        if descriptors.is_empty() {
            debug!("no new descriptors");
            return Ok((report, BTreeMap::new()));
        }

        let (descriptors, users) = self.resolve_users(descriptors).await?;
        if descriptors.is_empty() {
            return Ok((report, BTreeMap::new()));
        }
        report.received = descriptors
            .iter()
            .map(|d| d.global_identifier.clone())
            .collect();
        self.notify(|d| d.did_receive_descriptors(&descriptors, &users));

        let (own, others): (Vec<AssetDescriptor>, Vec<AssetDescriptor>) =
            descriptors.iter().cloned().partition(|d| {
                d.sharing_info.shared_by_user_identifier == self.current_user.identifier
            });

        let (matched, to_restore) = self.match_local_library(own).await?;
        report.matched_locally = matched
            .values()
            .map(|d| d.global_identifier.clone())
            .collect();
        if !matched.is_empty() {
            self.notify(|d| d.did_identify_local_assets(&matched));
        }

        self.deps
            .graph
            .ingest(&descriptors, &self.current_user.identifier)
            .await?;

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let source = RemotePayloadSource::new(self.deps.remote.clone(), self.timeouts);
        match self.restoration.restore(&source, &to_restore, &users).await {
            Ok(restored) => report.restored = restored,
            Err(e) => error!(error = %e, count = to_restore.len(), "restoration failed"),
        }

        for descriptor in &others {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let gid = &descriptor.global_identifier;
            match self.download(descriptor).await {
                Ok(asset) => {
                    if let Err(e) = self
                        .deps
                        .blacklist
                        .clean_entries(std::slice::from_ref(gid))
                        .await
                    {
                        warn!(gid = %gid, error = %e, "failed to clear attempt count");
                    }
                    self.notify(|d| d.did_complete_download(&asset));
                    report.downloaded.push(gid.clone());
                }
                Err(SyncError::AssetBlacklisted(_)) => {
                    debug!(gid = %gid, "skipping blacklisted asset");
                }
                Err(e) => {
                    warn!(gid = %gid, error = %e, "download failed");
                    self.notify(|d| d.did_fail_download(gid, &e));
                    report.failed.push(gid.clone());
                    if self.record_failure(gid).await {
                        report.blacklisted.push(gid.clone());
                    }
                }
            }
        }

        let by_gid = descriptors
            .into_iter()
            .map(|d| (d.global_identifier.clone(), d))
            .collect();
        Ok((report, by_gid))
    }

    /// Remote descriptors matching `filter` that are not in the local store.
    async fn new_remote_descriptors(
        &self,
        filter: &DownloadFilter,
    ) -> Result<Vec<AssetDescriptor>, SyncError> {
        let remote_filter = DescriptorFilter {
            global_identifiers: filter.global_identifiers.clone(),
            group_ids: filter.group_ids.clone(),
            after: filter.since.or_else(|| self.last_fetch()),
        };
        let remote = self
            .timeouts
            .network(self.deps.remote.asset_descriptors(&remote_filter))
            .await?;
        if remote.is_empty() {
            return Ok(remote);
        }

        let gids: Vec<GlobalIdentifier> = remote
            .iter()
            .map(|d| d.global_identifier.clone())
            .collect();
        let present: BTreeSet<GlobalIdentifier> = self
            .timeouts
            .local(self.deps.local.asset_descriptors(Some(&gids)))
            .await?
            .into_iter()
            .map(|d| d.global_identifier)
            .collect();

        Ok(remote
            .into_iter()
            .filter(|d| !present.contains(&d.global_identifier))
            .collect())
    }

    async fn drop_blacklisted(
        &self,
        descriptors: Vec<AssetDescriptor>,
    ) -> Result<Vec<AssetDescriptor>, SyncError> {
        let downloadable: Vec<AssetDescriptor> = descriptors
            .into_iter()
            .filter(|d| d.upload_state.is_downloadable())
            .collect();
        if downloadable.is_empty() {
            return Ok(downloadable);
        }

        let gids: Vec<GlobalIdentifier> = downloadable
            .iter()
            .map(|d| d.global_identifier.clone())
            .collect();
        let blacklisted = self.deps.blacklist.are_blacklisted(&gids).await?;
        let blacklisted_users = self.deps.blacklist.blacklisted_users().await?;

        Ok(downloadable
            .into_iter()
            .filter(|d| {
                if blacklisted
                    .get(&d.global_identifier)
                    .copied()
                    .unwrap_or(false)
                {
                    debug!(gid = %d.global_identifier, "asset is blacklisted");
                    return false;
                }
                let referenced = d.referenced_user_ids();
                if referenced.iter().any(|u| blacklisted_users.contains(u)) {
                    debug!(gid = %d.global_identifier, "asset references a blacklisted user");
                    return false;
                }
                true
            })
            .collect())
    }

    /// Resolve every referenced user and drop descriptors naming an unknown one.
    async fn resolve_users(
        &self,
        descriptors: Vec<AssetDescriptor>,
    ) -> Result<(Vec<AssetDescriptor>, BTreeMap<UserIdentifier, User>), SyncError> {
        let ids: Vec<UserIdentifier> = all_referenced_user_ids(&descriptors).into_iter().collect();
        let users = self
            .timeouts
            .network(self.deps.remote.users(&ids))
            .await?;

        let resolved = descriptors
            .into_iter()
            .filter(|d| {
                let missing: Vec<UserIdentifier> = d
                    .referenced_user_ids()
                    .into_iter()
                    .filter(|u| !users.contains_key(u))
                    .collect();
                if missing.is_empty() {
                    true
                } else {
                    warn!(
                        gid = %d.global_identifier,
                        missing = ?missing,
                        "dropping descriptor with unresolved users"
                    );
                    false
                }
            })
            .collect();
        Ok((resolved, users))
    }

    /// Split own descriptors into those still in the photo library and the rest.
    async fn match_local_library(
        &self,
        own: Vec<AssetDescriptor>,
    ) -> Result<(BTreeMap<LocalIdentifier, AssetDescriptor>, Vec<AssetDescriptor>), SyncError> {
        let local_ids: Vec<LocalIdentifier> = own
            .iter()
            .filter_map(|d| d.local_identifier.clone())
            .collect();
        let in_library = if local_ids.is_empty() {
            BTreeSet::new()
        } else {
            self.timeouts
                .local(self.deps.library.index_matches(&local_ids))
                .await?
        };

        let mut matched = BTreeMap::new();
        let mut rest = Vec::new();
        for descriptor in own {
            match &descriptor.local_identifier {
                Some(local_id) if in_library.contains(local_id) => {
                    matched.insert(local_id.clone(), descriptor);
                }
                _ => rest.push(descriptor),
            }
        }
        Ok((matched, rest))
    }

    async fn download(&self, descriptor: &AssetDescriptor) -> Result<DecryptedAsset, SyncError> {
        let gid = &descriptor.global_identifier;
        if self.deps.blacklist.is_blacklisted(gid).await? {
            return Err(SyncError::AssetBlacklisted(gid.clone()));
        }

        self.notify(|d| d.did_start_download(std::slice::from_ref(gid)));
        let versions = [AssetQuality::Low];
        let mut fetched = self
            .timeouts
            .network(
                self.deps
                    .remote
                    .fetch_assets(std::slice::from_ref(gid), &versions),
            )
            .await?;
        let encrypted = fetched
            .remove(gid)
            .ok_or_else(|| SyncError::NotFound(format!("asset {gid} on remote")))?;

        let decrypted = self
            .timeouts
            .local(self.deps.crypto.decrypt(&encrypted, &versions, descriptor))
            .await?;

        let mut by_gid = BTreeMap::new();
        by_gid.insert(gid.clone(), descriptor.clone());
        self.timeouts
            .local(self.deps.local.create_assets(
                vec![encrypted],
                by_gid,
                UploadState::Completed,
            ))
            .await?;

        debug!(gid = %gid, "downloaded");
        Ok(decrypted)
    }

    /// Count a failed attempt. Returns whether the asset is now blacklisted.
    async fn record_failure(&self, gid: &GlobalIdentifier) -> bool {
        match self.deps.blacklist.record_failed_attempt(gid).await {
            Ok(attempts) if attempts >= self.failed_attempts_threshold => {
                warn!(gid = %gid, attempts, "asset failed repeatedly, blacklisting");
                self.notify(|d| d.did_fail_repeatedly(gid));
                true
            }
            Ok(attempts) => {
                debug!(gid = %gid, attempts, "recorded failed attempt");
                false
            }
            Err(e) => {
                error!(gid = %gid, error = %e, "failed to record failed attempt");
                false
            }
        }
    }

    /// Rebuild history for own assets already in the local store.
    ///
    /// Run at startup, before the first remote cycle.
    pub async fn restore_local(&self) -> Result<Vec<GlobalIdentifier>, SyncError> {
        let own: Vec<AssetDescriptor> = self
            .timeouts
            .local(self.deps.local.asset_descriptors(None))
            .await?
            .into_iter()
            .filter(|d| d.sharing_info.shared_by_user_identifier == self.current_user.identifier)
            .collect();
        if own.is_empty() {
            return Ok(Vec::new());
        }

        let (own, users) = self.resolve_users(own).await?;
        self.deps
            .graph
            .ingest(&own, &self.current_user.identifier)
            .await?;

        let source = LocalPayloadSource::new(self.deps.local.clone(), self.timeouts);
        self.restoration.restore(&source, &own, &users).await
    }
}

#[async_trait]
impl BackgroundOperation for DownloadOrchestrator {
    fn name(&self) -> &str {
        "download"
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        self.run(&DownloadFilter::default(), cancel).await.map(|_| ())
    }
}
