// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user sender and recipient cache.
//!
//! An entry for a user is either absent (unknown, must be read from the
//! store) or the complete set of assets for that user. Incremental updates
//! only touch users that already have an entry, so a partial set is never
//! mistaken for a complete one.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sharesync_core::{GlobalIdentifier, UserIdentifier};

#[derive(Debug, Default)]
struct CacheState {
    /// Confirmed shares only.
    shared_by: HashMap<UserIdentifier, BTreeSet<GlobalIdentifier>>,
    /// Includes provisional shares.
    shared_with: HashMap<UserIdentifier, BTreeSet<GlobalIdentifier>>,
}

/// Cache of `sharedBy[user]` and `sharedWith[user]`.
#[derive(Debug, Default)]
pub struct ShareCache {
    state: Mutex<CacheState>,
}

impl ShareCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn shared_by(&self, user: &str) -> Option<BTreeSet<GlobalIdentifier>> {
        self.state().shared_by.get(user).cloned()
    }

    pub fn shared_with(&self, user: &str) -> Option<BTreeSet<GlobalIdentifier>> {
        self.state().shared_with.get(user).cloned()
    }

    pub fn set_shared_by(&self, user: UserIdentifier, assets: BTreeSet<GlobalIdentifier>) {
        self.state().shared_by.insert(user, assets);
    }

    pub fn set_shared_with(&self, user: UserIdentifier, assets: BTreeSet<GlobalIdentifier>) {
        self.state().shared_with.insert(user, assets);
    }

    pub(crate) fn add_shared_by(&self, user: &str, asset: &str) {
        if let Some(assets) = self.state().shared_by.get_mut(user) {
            assets.insert(asset.to_string());
        }
    }

    pub(crate) fn add_shared_with<'a>(
        &self,
        users: impl IntoIterator<Item = &'a str>,
        asset: &str,
    ) {
        let mut state = self.state();
        for user in users {
            if let Some(assets) = state.shared_with.get_mut(user) {
                assets.insert(asset.to_string());
            }
        }
    }

    pub(crate) fn remove_shared_with<'a>(
        &self,
        users: impl IntoIterator<Item = &'a str>,
        asset: &str,
    ) {
        let mut state = self.state();
        for user in users {
            if let Some(assets) = state.shared_with.get_mut(user) {
                assets.remove(asset);
            }
        }
    }

    pub(crate) fn remove_assets(&self, assets: &[GlobalIdentifier]) {
        let mut guard = self.state();
        let state = &mut *guard;
        for set in state
            .shared_by
            .values_mut()
            .chain(state.shared_with.values_mut())
        {
            for asset in assets {
                set.remove(asset);
            }
        }
    }

    pub(crate) fn remove_users(&self, users: &[UserIdentifier]) {
        let mut state = self.state();
        for user in users {
            state.shared_by.remove(user);
            state.shared_with.remove(user);
        }
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.shared_by.clear();
        state.shared_with.clear();
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state();
        state.shared_by.is_empty() && state.shared_with.is_empty()
    }
}
