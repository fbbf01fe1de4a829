// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{
    AssetDescriptor, AssetQuality, DecryptedAsset, EncryptedAsset, GroupId, LocalAsset,
    ShareableAsset, User,
};

/// Per-asset symmetric secrets and their asymmetric wrapping.
#[async_trait]
pub trait AssetCrypto: Send + Sync {
    /// Encrypt for the owner, reusing `secret` when the asset was encrypted before.
    async fn encrypt(
        &self,
        asset: &LocalAsset,
        versions: &[AssetQuality],
        secret: Option<Vec<u8>>,
    ) -> Result<EncryptedAsset, SyncError>;

    /// Wrap the asset secret for each recipient.
    async fn shareable_payload(
        &self,
        asset: &EncryptedAsset,
        recipients: &[User],
        group_id: &GroupId,
        thread_id: Option<&str>,
        permissions: i32,
    ) -> Result<ShareableAsset, SyncError>;

    async fn decrypt(
        &self,
        asset: &EncryptedAsset,
        versions: &[AssetQuality],
        descriptor: &AssetDescriptor,
    ) -> Result<DecryptedAsset, SyncError>;
}
