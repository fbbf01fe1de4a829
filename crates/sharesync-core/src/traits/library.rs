// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{AssetQuality, LocalAsset, LocalIdentifier};

/// Device photo library. Decoding, resizing and hashing happen behind this trait.
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// Resolve a local identifier to plaintext renditions and its computed global identifier.
    async fn retrieve(
        &self,
        local_identifier: &LocalIdentifier,
        versions: &[AssetQuality],
    ) -> Result<LocalAsset, SyncError>;

    /// Subset of the given identifiers present in the device's asset index.
    async fn index_matches(
        &self,
        local_identifiers: &[LocalIdentifier],
    ) -> Result<BTreeSet<LocalIdentifier>, SyncError>;
}
