// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock local asset cache.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sharesync_core::types::{
    EncryptedAsset, InteractionAnchor, Interactions, Message, Reaction, RecipientRemovals,
    ShareChange, ShareableAsset,
};
use sharesync_core::{
    AssetDescriptor, AssetQuality, GlobalIdentifier, GroupId, GroupInfo, LocalServer, SyncError,
    UploadState, UserIdentifier,
};

type InteractionKey = (InteractionAnchor, String);

/// In-memory [`LocalServer`].
///
/// `create_assets` stores descriptors with the given upload state and
/// `mark_asset` overwrites it, so the descriptor state is always the last
/// one written.
pub struct MockLocalServer {
    descriptors: Arc<Mutex<BTreeMap<GlobalIdentifier, AssetDescriptor>>>,
    assets: Arc<Mutex<BTreeMap<GlobalIdentifier, EncryptedAsset>>>,
    secrets: Arc<Mutex<BTreeMap<GlobalIdentifier, Vec<u8>>>>,
    marks: Arc<Mutex<Vec<(GlobalIdentifier, AssetQuality, UploadState)>>>,
    shareables: Arc<Mutex<Vec<ShareableAsset>>>,
    deleted_users: Arc<Mutex<Vec<UserIdentifier>>>,
    interactions: Arc<Mutex<HashMap<InteractionKey, Interactions>>>,
    failing: Arc<Mutex<HashSet<&'static str>>>,
}

impl MockLocalServer {
    pub fn new() -> Self {
        Self {
            descriptors: Arc::new(Mutex::new(BTreeMap::new())),
            assets: Arc::new(Mutex::new(BTreeMap::new())),
            secrets: Arc::new(Mutex::new(BTreeMap::new())),
            marks: Arc::new(Mutex::new(Vec::new())),
            shareables: Arc::new(Mutex::new(Vec::new())),
            deleted_users: Arc::new(Mutex::new(Vec::new())),
            interactions: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn put_descriptor(&self, descriptor: AssetDescriptor) {
        self.descriptors
            .lock()
            .await
            .insert(descriptor.global_identifier.clone(), descriptor);
    }

    pub async fn descriptor(&self, global_identifier: &str) -> Option<AssetDescriptor> {
        self.descriptors.lock().await.get(global_identifier).cloned()
    }

    pub async fn descriptor_count(&self) -> usize {
        self.descriptors.lock().await.len()
    }

    pub async fn put_asset(&self, asset: EncryptedAsset) {
        self.assets
            .lock()
            .await
            .insert(asset.global_identifier.clone(), asset);
    }

    pub async fn has_asset(&self, global_identifier: &str) -> bool {
        self.assets.lock().await.contains_key(global_identifier)
    }

    pub async fn set_secret(&self, global_identifier: &str, secret: Vec<u8>) {
        self.secrets
            .lock()
            .await
            .insert(global_identifier.to_string(), secret);
    }

    pub async fn marks(&self) -> Vec<(GlobalIdentifier, AssetQuality, UploadState)> {
        self.marks.lock().await.clone()
    }

    pub async fn shareables(&self) -> Vec<ShareableAsset> {
        self.shareables.lock().await.clone()
    }

    pub async fn deleted_users(&self) -> Vec<UserIdentifier> {
        self.deleted_users.lock().await.clone()
    }

    pub async fn stored_interactions(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
    ) -> Interactions {
        self.interactions
            .lock()
            .await
            .get(&(anchor, anchor_id.to_string()))
            .cloned()
            .unwrap_or_default()
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

    /// Make `method` return a local store error until [`MockLocalServer::recover`].
    pub async fn fail(&self, method: &'static str) {
        self.failing.lock().await.insert(method);
    }

    pub async fn recover(&self, method: &'static str) {
        self.failing.lock().await.remove(method);
    }

    async fn check(&self, method: &'static str) -> Result<(), SyncError> {
        if self.failing.lock().await.contains(method) {
            return Err(SyncError::local(format!("{method} unavailable")));
        }
        Ok(())
    }
}

impl Default for MockLocalServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalServer for MockLocalServer {
    async fn asset_descriptors(
        &self,
        global_identifiers: Option<&[GlobalIdentifier]>,
    ) -> Result<Vec<AssetDescriptor>, SyncError> {
        self.check("asset_descriptors").await?;
        let descriptors = self.descriptors.lock().await;
        Ok(match global_identifiers {
            Some(gids) => gids
                .iter()
                .filter_map(|gid| descriptors.get(gid).cloned())
                .collect(),
            None => descriptors.values().cloned().collect(),
        })
    }

    async fn encryption_secret(
        &self,
        global_identifier: &GlobalIdentifier,
    ) -> Result<Option<Vec<u8>>, SyncError> {
        self.check("encryption_secret").await?;
        Ok(self.secrets.lock().await.get(global_identifier).cloned())
    }

    async fn encrypted_asset(
        &self,
        global_identifier: &GlobalIdentifier,
        versions: &[AssetQuality],
    ) -> Result<Option<EncryptedAsset>, SyncError> {
        self.check("encrypted_asset").await?;
        let assets = self.assets.lock().await;
        Ok(assets.get(global_identifier).and_then(|asset| {
            let mut asset = asset.clone();
            asset.versions.retain(|q, _| versions.contains(q));
            (!asset.versions.is_empty()).then_some(asset)
        }))
    }

    async fn create_assets(
        &self,
        assets: Vec<EncryptedAsset>,
        descriptors: BTreeMap<GlobalIdentifier, AssetDescriptor>,
        upload_state: UploadState,
    ) -> Result<(), SyncError> {
        self.check("create_assets").await?;
        {
            let mut stored = self.assets.lock().await;
            let mut secrets = self.secrets.lock().await;
            for asset in assets {
                if let Some(version) = asset.versions.values().next() {
                    secrets
                        .entry(asset.global_identifier.clone())
                        .or_insert_with(|| version.encrypted_secret.clone());
                }
                let entry = stored
                    .entry(asset.global_identifier.clone())
                    .or_insert_with(|| EncryptedAsset {
                        versions: BTreeMap::new(),
                        ..asset.clone()
                    });
                entry.versions.extend(asset.versions);
            }
        }
        let mut stored = self.descriptors.lock().await;
        for (gid, mut descriptor) in descriptors {
            descriptor.upload_state = upload_state;
            stored.insert(gid, descriptor);
        }
        Ok(())
    }

    async fn delete_assets(
        &self,
        global_identifiers: &[GlobalIdentifier],
    ) -> Result<(), SyncError> {
        self.check("delete_assets").await?;
        let mut descriptors = self.descriptors.lock().await;
        let mut assets = self.assets.lock().await;
        for gid in global_identifiers {
            descriptors.remove(gid);
            assets.remove(gid);
        }
        Ok(())
    }

    async fn mark_asset(
        &self,
        global_identifier: &GlobalIdentifier,
        quality: AssetQuality,
        state: UploadState,
    ) -> Result<(), SyncError> {
        self.check("mark_asset").await?;
        self.marks
            .lock()
            .await
            .push((global_identifier.clone(), quality, state));
        if let Some(descriptor) = self.descriptors.lock().await.get_mut(global_identifier) {
            descriptor.upload_state = state;
        }
        Ok(())
    }

    async fn store_shareable(&self, payload: &ShareableAsset) -> Result<(), SyncError> {
        self.check("store_shareable").await?;
        self.shareables.lock().await.push(payload.clone());
        Ok(())
    }

    async fn add_recipients(
        &self,
        changes: &BTreeMap<GlobalIdentifier, ShareChange>,
    ) -> Result<(), SyncError> {
        self.check("add_recipients").await?;
        let mut descriptors = self.descriptors.lock().await;
        for (gid, change) in changes {
            let Some(descriptor) = descriptors.get_mut(gid) else {
                continue;
            };
            let sharing = &mut descriptor.sharing_info;
            for (user, groups) in &change.group_ids_by_recipient {
                sharing
                    .group_ids_by_recipient_user_identifier
                    .insert(user.clone(), groups.clone());
            }
            for (group_id, info) in &change.group_info_by_id {
                sharing
                    .group_info_by_id
                    .insert(group_id.clone(), info.clone());
            }
        }
        Ok(())
    }

    async fn remove_recipients(&self, removals: &RecipientRemovals) -> Result<(), SyncError> {
        self.check("remove_recipients").await?;
        let mut descriptors = self.descriptors.lock().await;
        for (gid, by_user) in removals {
            let Some(descriptor) = descriptors.get_mut(gid) else {
                continue;
            };
            for user in by_user.keys() {
                descriptor
                    .sharing_info
                    .group_ids_by_recipient_user_identifier
                    .remove(user);
            }
        }
        Ok(())
    }

    async fn update_group_info(
        &self,
        group_id: &GroupId,
        info: &GroupInfo,
    ) -> Result<(), SyncError> {
        self.check("update_group_info").await?;
        for descriptor in self.descriptors.lock().await.values_mut() {
            if let Some(existing) = descriptor.sharing_info.group_info_by_id.get_mut(group_id) {
                *existing = info.clone();
            }
        }
        Ok(())
    }

    async fn remove_group_info(&self, group_ids: &[GroupId]) -> Result<(), SyncError> {
        self.check("remove_group_info").await?;
        for descriptor in self.descriptors.lock().await.values_mut() {
            for group_id in group_ids {
                descriptor.sharing_info.group_info_by_id.remove(group_id);
            }
        }
        Ok(())
    }

    async fn delete_users(&self, identifiers: &[UserIdentifier]) -> Result<(), SyncError> {
        self.check("delete_users").await?;
        self.deleted_users
            .lock()
            .await
            .extend(identifiers.iter().cloned());
        Ok(())
    }

    async fn interactions(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
    ) -> Result<Interactions, SyncError> {
        self.check("interactions").await?;
        Ok(self.stored_interactions(anchor, anchor_id).await)
    }

    async fn add_messages(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        messages: Vec<Message>,
    ) -> Result<Vec<Message>, SyncError> {
        self.check("add_messages").await?;
        let mut all = self.interactions.lock().await;
        let stored = all.entry((anchor, anchor_id.to_string())).or_default();
        let mut added = Vec::new();
        for message in messages {
            if stored
                .messages
                .iter()
                .any(|m| m.interaction_id == message.interaction_id)
            {
                continue;
            }
            stored.messages.push(message.clone());
            added.push(message);
        }
        Ok(added)
    }

    async fn add_reactions(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        reactions: Vec<Reaction>,
    ) -> Result<(), SyncError> {
        self.check("add_reactions").await?;
        let mut all = self.interactions.lock().await;
        all.entry((anchor, anchor_id.to_string()))
            .or_default()
            .reactions
            .extend(reactions);
        Ok(())
    }

    async fn remove_reactions(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        reactions: Vec<Reaction>,
    ) -> Result<(), SyncError> {
        self.check("remove_reactions").await?;
        let mut all = self.interactions.lock().await;
        if let Some(stored) = all.get_mut(&(anchor, anchor_id.to_string())) {
            stored
                .reactions
                .retain(|r| !reactions.iter().any(|gone| gone.same_reaction(r)));
        }
        Ok(())
    }
}
