// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local descriptor and asset cache trait.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{
    AssetDescriptor, AssetQuality, EncryptedAsset, GlobalIdentifier, GroupId, GroupInfo,
    InteractionAnchor, Interactions, Message, Reaction, RecipientRemovals, ShareChange,
    ShareableAsset, UploadState, UserIdentifier,
};

/// Device-local cache of descriptors, encrypted assets and interactions.
#[async_trait]
pub trait LocalServer: Send + Sync {
    /// Descriptors in the cache, optionally restricted to a set of assets.
    async fn asset_descriptors(
        &self,
        global_identifiers: Option<&[GlobalIdentifier]>,
    ) -> Result<Vec<AssetDescriptor>, SyncError>;

    /// Symmetric secret previously used for this asset, if any.
    async fn encryption_secret(
        &self,
        global_identifier: &GlobalIdentifier,
    ) -> Result<Option<Vec<u8>>, SyncError>;

    async fn encrypted_asset(
        &self,
        global_identifier: &GlobalIdentifier,
        versions: &[AssetQuality],
    ) -> Result<Option<EncryptedAsset>, SyncError>;

    /// Store encrypted assets along with their descriptors.
    async fn create_assets(
        &self,
        assets: Vec<EncryptedAsset>,
        descriptors: BTreeMap<GlobalIdentifier, AssetDescriptor>,
        upload_state: UploadState,
    ) -> Result<(), SyncError>;

    async fn delete_assets(&self, global_identifiers: &[GlobalIdentifier]) -> Result<(), SyncError>;

    async fn mark_asset(
        &self,
        global_identifier: &GlobalIdentifier,
        quality: AssetQuality,
        state: UploadState,
    ) -> Result<(), SyncError>;

    /// Persist secrets wrapped for recipients.
    async fn store_shareable(&self, payload: &ShareableAsset) -> Result<(), SyncError>;

    async fn add_recipients(
        &self,
        changes: &BTreeMap<GlobalIdentifier, ShareChange>,
    ) -> Result<(), SyncError>;

    async fn remove_recipients(&self, removals: &RecipientRemovals) -> Result<(), SyncError>;

    async fn update_group_info(&self, group_id: &GroupId, info: &GroupInfo)
        -> Result<(), SyncError>;

    async fn remove_group_info(&self, group_ids: &[GroupId]) -> Result<(), SyncError>;

    async fn delete_users(&self, identifiers: &[UserIdentifier]) -> Result<(), SyncError>;

    async fn interactions(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
    ) -> Result<Interactions, SyncError>;

    /// Append messages. Returns the messages actually stored.
    async fn add_messages(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        messages: Vec<Message>,
    ) -> Result<Vec<Message>, SyncError>;

    async fn add_reactions(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        reactions: Vec<Reaction>,
    ) -> Result<(), SyncError>;

    async fn remove_reactions(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        reactions: Vec<Reaction>,
    ) -> Result<(), SyncError>;
}
