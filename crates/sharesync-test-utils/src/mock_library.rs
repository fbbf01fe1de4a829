// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock photo library.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sharesync_core::types::LocalAsset;
use sharesync_core::{AssetQuality, GlobalIdentifier, LocalIdentifier, PhotoLibrary, SyncError};

/// Library of assets keyed by local identifier.
///
/// Each asset has a fixed global identifier. Retrieved payloads are
/// `"{local_identifier}/{quality}"` as bytes.
pub struct MockPhotoLibrary {
    assets: Arc<Mutex<BTreeMap<LocalIdentifier, GlobalIdentifier>>>,
    unreadable: Arc<Mutex<HashSet<LocalIdentifier>>>,
}

impl MockPhotoLibrary {
    pub fn new() -> Self {
        Self {
            assets: Arc::new(Mutex::new(BTreeMap::new())),
            unreadable: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn add_asset(&self, local_identifier: &str, global_identifier: &str) {
        self.assets
            .lock()
            .await
            .insert(local_identifier.to_string(), global_identifier.to_string());
    }

    pub async fn remove_asset(&self, local_identifier: &str) {
        self.assets.lock().await.remove(local_identifier);
    }

    /// Keep the asset indexed but fail every read of it.
    pub async fn make_unreadable(&self, local_identifier: &str) {
        self.unreadable
            .lock()
            .await
            .insert(local_identifier.to_string());
    }
}

impl Default for MockPhotoLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PhotoLibrary for MockPhotoLibrary {
    async fn retrieve(
        &self,
        local_identifier: &LocalIdentifier,
        versions: &[AssetQuality],
    ) -> Result<LocalAsset, SyncError> {
        if self.unreadable.lock().await.contains(local_identifier) {
            return Err(SyncError::local(format!("cannot read {local_identifier}")));
        }
        let global_identifier = self
            .assets
            .lock()
            .await
            .get(local_identifier)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("library asset {local_identifier}")))?;
        Ok(LocalAsset {
            local_identifier: local_identifier.clone(),
            global_identifier,
            creation_date: None,
            perceptual_hash: None,
            data: versions
                .iter()
                .map(|q| (*q, format!("{local_identifier}/{q}").into_bytes()))
                .collect(),
        })
    }

    async fn index_matches(
        &self,
        local_identifiers: &[LocalIdentifier],
    ) -> Result<BTreeSet<LocalIdentifier>, SyncError> {
        let assets = self.assets.lock().await;
        Ok(local_identifiers
            .iter()
            .filter(|id| assets.contains_key(*id))
            .cloned()
            .collect())
    }
}
