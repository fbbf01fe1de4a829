// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{GlobalIdentifier, UserIdentifier};

/// Assets and users excluded from further download attempts.
#[async_trait]
pub trait DownloadBlacklist: Send + Sync {
    /// Count one more failed attempt. Returns the updated count.
    async fn record_failed_attempt(&self, global_identifier: &GlobalIdentifier)
        -> Result<u32, SyncError>;

    /// Blacklist immediately, regardless of the attempt count.
    async fn blacklist(&self, global_identifier: &GlobalIdentifier) -> Result<(), SyncError>;

    async fn remove_from_blacklist(
        &self,
        global_identifiers: &[GlobalIdentifier],
    ) -> Result<(), SyncError>;

    async fn is_blacklisted(&self, global_identifier: &GlobalIdentifier) -> Result<bool, SyncError>;

    async fn are_blacklisted(
        &self,
        global_identifiers: &[GlobalIdentifier],
    ) -> Result<BTreeMap<GlobalIdentifier, bool>, SyncError>;

    async fn blacklist_users(&self, identifiers: &[UserIdentifier]) -> Result<(), SyncError>;

    async fn remove_users(&self, identifiers: &[UserIdentifier]) -> Result<(), SyncError>;

    /// Drop blacklisted users not in `identifiers`.
    async fn remove_users_if_not_in(
        &self,
        identifiers: &[UserIdentifier],
    ) -> Result<(), SyncError>;

    async fn blacklisted_users(&self) -> Result<BTreeSet<UserIdentifier>, SyncError>;

    /// Forget attempt counts for assets that no longer exist.
    async fn clean_entries(&self, global_identifiers: &[GlobalIdentifier])
        -> Result<(), SyncError>;

    async fn deep_clean(&self) -> Result<(), SyncError>;
}
