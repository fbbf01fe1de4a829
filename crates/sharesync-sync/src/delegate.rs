// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use sharesync_core::types::{InteractionAnchor, Message, Reaction, ShareChange};
use sharesync_core::{GlobalIdentifier, GroupId, GroupInfo, UserIdentifier};

use crate::diff::BackedUpAsset;

/// Observer of asset reconciliation. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait AssetSyncingDelegate: Send + Sync {
    fn assets_were_deleted(&self, assets: &[BackedUpAsset]) {}

    fn users_were_added_to_share(
        &self,
        global_identifier: &GlobalIdentifier,
        change: &ShareChange,
    ) {
    }

    fn users_were_removed_from_share(
        &self,
        global_identifier: &GlobalIdentifier,
        group_ids_by_recipient: &BTreeMap<UserIdentifier, Vec<GroupId>>,
    ) {
    }

    fn groups_info_were_updated(&self, info_by_group: &BTreeMap<GroupId, GroupInfo>) {}

    fn groups_were_removed(&self, group_ids: &[GroupId]) {}

    /// Users no longer referenced by any remote descriptor.
    fn users_were_removed(&self, user_identifiers: &[UserIdentifier]) {}
}

/// Observer of interaction reconciliation. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait InteractionsSyncDelegate: Send + Sync {
    fn did_receive_messages(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        messages: &[Message],
    ) {
    }

    fn reactions_did_change(
        &self,
        anchor: InteractionAnchor,
        anchor_id: &str,
        added: &[Reaction],
        removed: &[Reaction],
    ) {
    }
}
