// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use sharesync_core::types::DecryptedAsset;
use sharesync_core::{
    AssetDescriptor, GlobalIdentifier, LocalIdentifier, SyncError, User, UserIdentifier,
};

use crate::restoration::HistoryItems;

/// Observer of download cycles. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait DownloadDelegate: Send + Sync {
    /// Descriptors that passed filtering, with every user they reference.
    fn did_receive_descriptors(
        &self,
        descriptors: &[AssetDescriptor],
        users: &BTreeMap<UserIdentifier, User>,
    ) {
    }

    /// Own assets that are still in the photo library, keyed by local identifier.
    fn did_identify_local_assets(
        &self,
        descriptors_by_local_identifier: &BTreeMap<LocalIdentifier, AssetDescriptor>,
    ) {
    }

    fn did_start_download(&self, global_identifiers: &[GlobalIdentifier]) {}

    fn did_complete_download(&self, asset: &DecryptedAsset) {}

    fn did_fail_download(&self, global_identifier: &GlobalIdentifier, error: &SyncError) {}

    /// The asset reached the failed attempt threshold and is now blacklisted.
    fn did_fail_repeatedly(&self, global_identifier: &GlobalIdentifier) {}

    fn did_complete_download_cycle(
        &self,
        descriptors: &BTreeMap<GlobalIdentifier, AssetDescriptor>,
    ) {
    }

    fn did_fail_download_cycle(&self, error: &SyncError) {}
}

/// Receives history rebuilt from descriptors of assets this user shared.
#[allow(unused_variables)]
pub trait RestorationDelegate: Send + Sync {
    fn restore_upload_history_items(&self, items: &HistoryItems) {}

    fn restore_share_history_items(&self, items: &HistoryItems) {}

    fn did_complete_restoration(&self, user_ids_involved: &BTreeSet<UserIdentifier>) {}
}
