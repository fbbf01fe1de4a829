// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote authority trait.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{
    AssetDescriptor, AssetQuality, DescriptorFilter, EncryptedAsset, GlobalIdentifier, GroupId,
    InteractionAnchor, Interactions, ShareableAsset, ThreadSummary, User, UserIdentifier,
};

/// The single authoritative server for an account.
///
/// Every method is a suspension point; callers wrap them in bounded waits.
#[async_trait]
pub trait RemoteServer: Send + Sync {
    /// List descriptors visible to the current user.
    async fn asset_descriptors(
        &self,
        filter: &DescriptorFilter,
    ) -> Result<Vec<AssetDescriptor>, SyncError>;

    /// Resolve user records. Unknown identifiers are absent from the result.
    async fn users(
        &self,
        identifiers: &[UserIdentifier],
    ) -> Result<BTreeMap<UserIdentifier, User>, SyncError>;

    /// Fetch encrypted payloads for the given versions.
    async fn fetch_assets(
        &self,
        global_identifiers: &[GlobalIdentifier],
        versions: &[AssetQuality],
    ) -> Result<BTreeMap<GlobalIdentifier, EncryptedAsset>, SyncError>;

    /// Upload an encrypted asset. Returns the global identifier the server assigned.
    async fn upload(
        &self,
        asset: &EncryptedAsset,
        versions: &[AssetQuality],
    ) -> Result<GlobalIdentifier, SyncError>;

    /// Create or update the group a share is made in.
    async fn setup_group(
        &self,
        group_id: &GroupId,
        recipients: &[User],
        encrypted_title: Option<&str>,
        thread_id: Option<&str>,
    ) -> Result<(), SyncError>;

    /// Submit wrapped secrets to the recipients.
    async fn share(
        &self,
        payload: &ShareableAsset,
        suppress_notification: bool,
    ) -> Result<(), SyncError>;

    /// Messages and reactions anchored to a group or thread.
    async fn interactions(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
    ) -> Result<Interactions, SyncError>;

    async fn threads(&self) -> Result<Vec<ThreadSummary>, SyncError>;
}
