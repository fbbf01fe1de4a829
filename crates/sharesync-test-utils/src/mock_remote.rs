// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock remote authority.
//!
//! Holds descriptors, users, encrypted payloads, threads and interactions in
//! memory. Uploads, group setups and shares are captured for assertions.
//! Individual methods can be made to fail with [`MockRemoteServer::fail`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sharesync_core::types::{
    DescriptorFilter, EncryptedAsset, InteractionAnchor, Interactions, ShareableAsset,
    ThreadSummary,
};
use sharesync_core::{
    AssetDescriptor, AssetQuality, GlobalIdentifier, GroupId, RemoteServer, SyncError, User,
    UserIdentifier,
};

/// A group set up through [`RemoteServer::setup_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSetup {
    pub group_id: GroupId,
    pub recipients: Vec<UserIdentifier>,
    pub encrypted_title: Option<String>,
    pub thread_id: Option<String>,
}

pub struct MockRemoteServer {
    descriptors: Arc<Mutex<BTreeMap<GlobalIdentifier, AssetDescriptor>>>,
    users: Arc<Mutex<BTreeMap<UserIdentifier, User>>>,
    assets: Arc<Mutex<BTreeMap<GlobalIdentifier, EncryptedAsset>>>,
    uploads: Arc<Mutex<Vec<(GlobalIdentifier, Vec<AssetQuality>)>>>,
    groups: Arc<Mutex<Vec<GroupSetup>>>,
    shares: Arc<Mutex<Vec<(ShareableAsset, bool)>>>,
    threads: Arc<Mutex<Vec<ThreadSummary>>>,
    interactions: Arc<Mutex<HashMap<(InteractionAnchor, String), Interactions>>>,
    failing: Arc<Mutex<HashSet<&'static str>>>,
}

impl MockRemoteServer {
    pub fn new() -> Self {
        Self {
            descriptors: Arc::new(Mutex::new(BTreeMap::new())),
            users: Arc::new(Mutex::new(BTreeMap::new())),
            assets: Arc::new(Mutex::new(BTreeMap::new())),
            uploads: Arc::new(Mutex::new(Vec::new())),
            groups: Arc::new(Mutex::new(Vec::new())),
            shares: Arc::new(Mutex::new(Vec::new())),
            threads: Arc::new(Mutex::new(Vec::new())),
            interactions: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Insert or replace a descriptor.
    pub async fn put_descriptor(&self, descriptor: AssetDescriptor) {
        self.descriptors
            .lock()
            .await
            .insert(descriptor.global_identifier.clone(), descriptor);
    }

    pub async fn remove_descriptor(&self, global_identifier: &str) {
        self.descriptors.lock().await.remove(global_identifier);
    }

    pub async fn descriptor(&self, global_identifier: &str) -> Option<AssetDescriptor> {
        self.descriptors.lock().await.get(global_identifier).cloned()
    }

    pub async fn add_user(&self, user: User) {
        self.users.lock().await.insert(user.identifier.clone(), user);
    }

    pub async fn remove_user(&self, identifier: &str) {
        self.users.lock().await.remove(identifier);
    }

    /// Store an encrypted payload served by `fetch_assets`.
    pub async fn put_asset(&self, asset: EncryptedAsset) {
        self.assets
            .lock()
            .await
            .insert(asset.global_identifier.clone(), asset);
    }

    pub async fn add_thread(&self, thread_id: &str, members: &[&str]) {
        self.threads.lock().await.push(ThreadSummary {
            thread_id: thread_id.to_string(),
            member_ids: members.iter().map(|m| m.to_string()).collect(),
        });
    }

    pub async fn set_interactions(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        interactions: Interactions,
    ) {
        self.interactions
            .lock()
            .await
            .insert((anchor, anchor_id.to_string()), interactions);
    }

    /// Make `method` return a remote error until [`MockRemoteServer::recover`].
    pub async fn fail(&self, method: &'static str) {
        self.failing.lock().await.insert(method);
    }

    pub async fn recover(&self, method: &'static str) {
        self.failing.lock().await.remove(method);
    }

    pub async fn uploads(&self) -> Vec<(GlobalIdentifier, Vec<AssetQuality>)> {
        self.uploads.lock().await.clone()
    }

    pub async fn group_setups(&self) -> Vec<GroupSetup> {
        self.groups.lock().await.clone()
    }

    /// Shares sent, with their `suppress_notification` flag.
    pub async fn shares(&self) -> Vec<(ShareableAsset, bool)> {
        self.shares.lock().await.clone()
    }

    async fn check(&self, method: &'static str) -> Result<(), SyncError> {
        if self.failing.lock().await.contains(method) {
            return Err(SyncError::remote(format!("{method} unavailable")));
        }
        Ok(())
    }
}

impl Default for MockRemoteServer {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filter(descriptor: &AssetDescriptor, filter: &DescriptorFilter) -> bool {
    if let Some(gids) = &filter.global_identifiers {
        if !gids.contains(&descriptor.global_identifier) {
            return false;
        }
    }
    if let Some(groups) = &filter.group_ids {
        let in_group = descriptor
            .sharing_info
            .group_info_by_id
            .keys()
            .any(|g| groups.contains(g));
        if !in_group {
            return false;
        }
    }
    match (filter.after, descriptor.creation_date) {
        (Some(after), Some(created)) => created > after,
        _ => true,
    }
}

#[async_trait]
impl RemoteServer for MockRemoteServer {
    async fn asset_descriptors(
        &self,
        filter: &DescriptorFilter,
    ) -> Result<Vec<AssetDescriptor>, SyncError> {
        self.check("asset_descriptors").await?;
        Ok(self
            .descriptors
            .lock()
            .await
            .values()
            .filter(|d| matches_filter(d, filter))
            .cloned()
            .collect())
    }

    async fn users(
        &self,
        identifiers: &[UserIdentifier],
    ) -> Result<BTreeMap<UserIdentifier, User>, SyncError> {
        self.check("users").await?;
        let users = self.users.lock().await;
        Ok(identifiers
            .iter()
            .filter_map(|id| users.get(id).map(|u| (id.clone(), u.clone())))
            .collect())
    }

    async fn fetch_assets(
        &self,
        global_identifiers: &[GlobalIdentifier],
        versions: &[AssetQuality],
    ) -> Result<BTreeMap<GlobalIdentifier, EncryptedAsset>, SyncError> {
        self.check("fetch_assets").await?;
        let assets = self.assets.lock().await;
        Ok(global_identifiers
            .iter()
            .filter_map(|gid| assets.get(gid))
            .map(|asset| {
                let mut asset = asset.clone();
                asset.versions.retain(|q, _| versions.contains(q));
                (asset.global_identifier.clone(), asset)
            })
            .collect())
    }

    async fn upload(
        &self,
        asset: &EncryptedAsset,
        versions: &[AssetQuality],
    ) -> Result<GlobalIdentifier, SyncError> {
        self.check("upload").await?;
        self.uploads
            .lock()
            .await
            .push((asset.global_identifier.clone(), versions.to_vec()));
        let mut assets = self.assets.lock().await;
        let stored = assets
            .entry(asset.global_identifier.clone())
            .or_insert_with(|| EncryptedAsset {
                versions: BTreeMap::new(),
                ..asset.clone()
            });
        for (quality, version) in &asset.versions {
            stored.versions.insert(*quality, version.clone());
        }
        Ok(asset.global_identifier.clone())
    }

    async fn setup_group(
        &self,
        group_id: &GroupId,
        recipients: &[User],
        encrypted_title: Option<&str>,
        thread_id: Option<&str>,
    ) -> Result<(), SyncError> {
        self.check("setup_group").await?;
        self.groups.lock().await.push(GroupSetup {
            group_id: group_id.clone(),
            recipients: recipients.iter().map(|u| u.identifier.clone()).collect(),
            encrypted_title: encrypted_title.map(str::to_string),
            thread_id: thread_id.map(str::to_string),
        });
        Ok(())
    }

    async fn share(
        &self,
        payload: &ShareableAsset,
        suppress_notification: bool,
    ) -> Result<(), SyncError> {
        self.check("share").await?;
        self.shares
            .lock()
            .await
            .push((payload.clone(), suppress_notification));
        Ok(())
    }

    async fn interactions(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
    ) -> Result<Interactions, SyncError> {
        self.check("interactions").await?;
        Ok(self
            .interactions
            .lock()
            .await
            .get(&(anchor, anchor_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn threads(&self) -> Result<Vec<ThreadSummary>, SyncError> {
        self.check("threads").await?;
        Ok(self.threads.lock().await.clone())
    }
}
