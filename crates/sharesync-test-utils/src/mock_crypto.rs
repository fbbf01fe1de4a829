// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reversible stand-in for the crypto primitives.
//!
//! "Encryption" reverses the payload bytes, so tests can check that a
//! decrypted asset matches what was stored without real keys.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sharesync_core::types::{
    DecryptedAsset, EncryptedAsset, EncryptedAssetVersion, LocalAsset, ShareableAsset,
    SharedVersion,
};
use sharesync_core::{
    AssetCrypto, AssetDescriptor, AssetQuality, GlobalIdentifier, GroupId, SyncError, User,
};

pub struct MockCrypto {
    undecryptable: Arc<Mutex<HashSet<GlobalIdentifier>>>,
}

impl MockCrypto {
    pub fn new() -> Self {
        Self {
            undecryptable: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Fail every decryption of `global_identifier`.
    pub async fn corrupt(&self, global_identifier: &str) {
        self.undecryptable
            .lock()
            .await
            .insert(global_identifier.to_string());
    }

    pub async fn repair(&self, global_identifier: &str) {
        self.undecryptable.lock().await.remove(global_identifier);
    }

    /// Encrypted payload for `global_identifier` holding `data` in every version.
    pub fn sealed(
        global_identifier: &str,
        versions: &[AssetQuality],
        data: &[u8],
    ) -> EncryptedAsset {
        EncryptedAsset {
            global_identifier: global_identifier.to_string(),
            local_identifier: None,
            creation_date: None,
            versions: versions
                .iter()
                .map(|q| (*q, seal(*q, data, b"secret")))
                .collect(),
        }
    }
}

impl Default for MockCrypto {
    fn default() -> Self {
        Self::new()
    }
}

fn seal(quality: AssetQuality, data: &[u8], secret: &[u8]) -> EncryptedAssetVersion {
    EncryptedAssetVersion {
        quality,
        encrypted_data: data.iter().rev().copied().collect(),
        encrypted_secret: secret.to_vec(),
    }
}

#[async_trait]
impl AssetCrypto for MockCrypto {
    async fn encrypt(
        &self,
        asset: &LocalAsset,
        versions: &[AssetQuality],
        secret: Option<Vec<u8>>,
    ) -> Result<EncryptedAsset, SyncError> {
        let secret =
            secret.unwrap_or_else(|| format!("secret-{}", asset.global_identifier).into_bytes());
        let mut encrypted = BTreeMap::new();
        for quality in versions {
            let data = asset.data.get(quality).ok_or_else(|| {
                SyncError::NotFound(format!("{quality} version of {}", asset.local_identifier))
            })?;
            encrypted.insert(*quality, seal(*quality, data, &secret));
        }
        Ok(EncryptedAsset {
            global_identifier: asset.global_identifier.clone(),
            local_identifier: Some(asset.local_identifier.clone()),
            creation_date: asset.creation_date,
            versions: encrypted,
        })
    }

    async fn shareable_payload(
        &self,
        asset: &EncryptedAsset,
        recipients: &[User],
        group_id: &GroupId,
        thread_id: Option<&str>,
        permissions: i32,
    ) -> Result<ShareableAsset, SyncError> {
        let shared_versions = recipients
            .iter()
            .flat_map(|user| {
                asset.versions.values().map(move |v| SharedVersion {
                    user_identifier: user.identifier.clone(),
                    quality: v.quality,
                    encrypted_secret: v.encrypted_secret.clone(),
                })
            })
            .collect();
        Ok(ShareableAsset {
            global_identifier: asset.global_identifier.clone(),
            group_id: group_id.clone(),
            shared_versions,
            as_photo_message_in_thread_id: thread_id.map(str::to_string),
            permissions,
        })
    }

    async fn decrypt(
        &self,
        asset: &EncryptedAsset,
        versions: &[AssetQuality],
        descriptor: &AssetDescriptor,
    ) -> Result<DecryptedAsset, SyncError> {
        if self
            .undecryptable
            .lock()
            .await
            .contains(&asset.global_identifier)
        {
            return Err(SyncError::Internal(format!(
                "cannot decrypt {}",
                asset.global_identifier
            )));
        }
        let mut decrypted = BTreeMap::new();
        for quality in versions {
            let version = asset.versions.get(quality).ok_or_else(|| {
                SyncError::NotFound(format!("{quality} version of {}", asset.global_identifier))
            })?;
            decrypted.insert(*quality, version.encrypted_data.iter().rev().copied().collect());
        }
        Ok(DecryptedAsset {
            global_identifier: asset.global_identifier.clone(),
            local_identifier: descriptor.local_identifier.clone(),
            creation_date: descriptor.creation_date,
            versions: decrypted,
        })
    }
}
