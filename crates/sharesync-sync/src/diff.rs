// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Descriptor diff between the remote authority and the local cache.
//!
//! [`AssetDescriptorsDiff::generate`] is pure. Inputs are indexed into sorted
//! maps first, so the result does not depend on input order.

use std::collections::{BTreeMap, BTreeSet};

use sharesync_config::model::SyncConfig;
use sharesync_core::types::{RecipientRemovals, ShareChange};
use sharesync_core::{
    AssetDescriptor, AssetQuality, GlobalIdentifier, GroupId, GroupInfo, LocalIdentifier,
    UploadState, UserIdentifier,
};

/// An asset known by both identifiers, as far as they are known.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BackedUpAsset {
    pub global_identifier: GlobalIdentifier,
    pub local_identifier: Option<LocalIdentifier>,
}

/// Upload state of one version as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetVersionState {
    pub global_identifier: GlobalIdentifier,
    pub local_identifier: Option<LocalIdentifier>,
    pub quality: AssetQuality,
    pub new_upload_state: UploadState,
}

/// New metadata for a group and the remote descriptors that carry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfoDiff {
    pub group_info: GroupInfo,
    pub descriptor_by_asset_id: BTreeMap<GlobalIdentifier, AssetDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Report upload-state drift in `state_different_on_remote`.
    pub reconcile_upload_states: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            reconcile_upload_states: true,
        }
    }
}

impl From<&SyncConfig> for DiffOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            reconcile_upload_states: config.reconcile_upload_states,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetDescriptorsDiff {
    /// Local assets the remote no longer has, sorted by global identifier.
    pub assets_removed_on_remote: Vec<BackedUpAsset>,
    pub state_different_on_remote: Vec<AssetVersionState>,
    pub group_info_different_on_remote: BTreeMap<GroupId, GroupInfoDiff>,
    pub group_info_removed_on_remote: BTreeSet<GroupId>,
    pub user_ids_added_to_the_share_of_asset_gid: BTreeMap<GlobalIdentifier, ShareChange>,
    pub user_ids_removed_from_the_shares_of_asset_gid: RecipientRemovals,
}

impl AssetDescriptorsDiff {
    /// Diff with upload-state reconciliation enabled.
    pub fn generate(
        remote: &[AssetDescriptor],
        local: &[AssetDescriptor],
        current_user: &UserIdentifier,
    ) -> Self {
        Self::generate_with(remote, local, current_user, DiffOptions::default())
    }

    pub fn generate_with(
        remote: &[AssetDescriptor],
        local: &[AssetDescriptor],
        current_user: &UserIdentifier,
        options: DiffOptions,
    ) -> Self {
        let remote = index(remote);
        let local = index(local);

        let mut diff = AssetDescriptorsDiff {
            assets_removed_on_remote: removed_on_remote(&remote, &local, current_user),
            ..Self::default()
        };

        for (gid, remote_descriptor) in &remote {
            if remote_descriptor.upload_state != UploadState::Completed {
                continue;
            }
            let Some(local_descriptor) = local.get(gid) else {
                continue;
            };
            diff.collect_added_recipients(remote_descriptor, local_descriptor);
            diff.collect_group_info_changes(remote_descriptor, local_descriptor);
        }

        for (gid, local_descriptor) in &local {
            if local_descriptor.upload_state != UploadState::Completed {
                continue;
            }
            let Some(remote_descriptor) = remote.get(gid) else {
                continue;
            };
            diff.collect_removed_recipients(remote_descriptor, local_descriptor);
        }

        if options.reconcile_upload_states {
            diff.state_different_on_remote = state_changes(&remote, &local, current_user);
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.assets_removed_on_remote.is_empty()
            && self.state_different_on_remote.is_empty()
            && self.group_info_different_on_remote.is_empty()
            && self.group_info_removed_on_remote.is_empty()
            && self.user_ids_added_to_the_share_of_asset_gid.is_empty()
            && self.user_ids_removed_from_the_shares_of_asset_gid.is_empty()
    }

    fn collect_added_recipients(&mut self, remote: &AssetDescriptor, local: &AssetDescriptor) {
        let local_groups = &local.sharing_info.group_ids_by_recipient_user_identifier;
        for (user, group_ids) in &remote.sharing_info.group_ids_by_recipient_user_identifier {
            let remote_set: BTreeSet<&GroupId> = group_ids.iter().collect();
            let local_set: BTreeSet<&GroupId> = local_groups
                .get(user)
                .map(|g| g.iter().collect())
                .unwrap_or_default();
            if remote_set == local_set {
                continue;
            }
            let change = self
                .user_ids_added_to_the_share_of_asset_gid
                .entry(remote.global_identifier.clone())
                .or_insert_with(|| ShareChange {
                    from: remote.sharing_info.shared_by_user_identifier.clone(),
                    group_ids_by_recipient: BTreeMap::new(),
                    group_info_by_id: remote.sharing_info.group_info_by_id.clone(),
                });
            change
                .group_ids_by_recipient
                .insert(user.clone(), group_ids.clone());
        }
    }

    fn collect_group_info_changes(&mut self, remote: &AssetDescriptor, local: &AssetDescriptor) {
        for (group_id, info) in &remote.sharing_info.group_info_by_id {
            let changed = match local.sharing_info.group_info_by_id.get(group_id) {
                Some(local_info) => local_info.differs_from(info),
                None => true,
            };
            if !changed {
                continue;
            }
            self.group_info_different_on_remote
                .entry(group_id.clone())
                .or_insert_with(|| GroupInfoDiff {
                    group_info: info.clone(),
                    descriptor_by_asset_id: BTreeMap::new(),
                })
                .descriptor_by_asset_id
                .insert(remote.global_identifier.clone(), remote.clone());
        }
    }

    fn collect_removed_recipients(&mut self, remote: &AssetDescriptor, local: &AssetDescriptor) {
        let remote_recipients = &remote.sharing_info.group_ids_by_recipient_user_identifier;
        for (user, group_ids) in &local.sharing_info.group_ids_by_recipient_user_identifier {
            if remote_recipients.contains_key(user) {
                continue;
            }
            self.user_ids_removed_from_the_shares_of_asset_gid
                .entry(local.global_identifier.clone())
                .or_default()
                .insert(user.clone(), group_ids.clone());
        }

        for group_id in local.sharing_info.group_info_by_id.keys() {
            if !remote.sharing_info.group_info_by_id.contains_key(group_id) {
                self.group_info_removed_on_remote.insert(group_id.clone());
            }
        }
    }
}

fn index(descriptors: &[AssetDescriptor]) -> BTreeMap<&GlobalIdentifier, &AssetDescriptor> {
    descriptors
        .iter()
        .map(|d| (&d.global_identifier, d))
        .collect()
}

/// Local-only assets, except uploads of the current user still in flight.
fn removed_on_remote(
    remote: &BTreeMap<&GlobalIdentifier, &AssetDescriptor>,
    local: &BTreeMap<&GlobalIdentifier, &AssetDescriptor>,
    current_user: &UserIdentifier,
) -> Vec<BackedUpAsset> {
    local
        .iter()
        .filter(|(gid, _)| !remote.contains_key(*gid))
        .filter(|(_, d)| {
            !(d.upload_state.is_in_flight()
                && d.sharing_info.shared_by_user_identifier == *current_user)
        })
        .map(|(_, d)| BackedUpAsset {
            global_identifier: d.global_identifier.clone(),
            local_identifier: d.local_identifier.clone(),
        })
        .collect()
}

/// One entry per quality for assets whose terminal remote state differs
/// from the local one.
fn state_changes(
    remote: &BTreeMap<&GlobalIdentifier, &AssetDescriptor>,
    local: &BTreeMap<&GlobalIdentifier, &AssetDescriptor>,
    current_user: &UserIdentifier,
) -> Vec<AssetVersionState> {
    let mut changes = Vec::new();
    for (gid, remote_descriptor) in remote {
        let Some(local_descriptor) = local.get(gid) else {
            continue;
        };
        let new_state = remote_descriptor.upload_state;
        if !matches!(new_state, UploadState::Completed | UploadState::Failed)
            || new_state == local_descriptor.upload_state
        {
            continue;
        }
        // the local upload may still succeed
        if new_state == UploadState::Failed
            && local_descriptor.upload_state.is_in_flight()
            && local_descriptor.sharing_info.shared_by_user_identifier == *current_user
        {
            continue;
        }
        for quality in AssetQuality::ALL {
            changes.push(AssetVersionState {
                global_identifier: (*gid).clone(),
                local_identifier: local_descriptor.local_identifier.clone(),
                quality,
                new_upload_state: new_state,
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;
    use sharesync_core::SharingInfo;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn options_follow_sync_config() {
        let mut config = SyncConfig::default();
        assert!(DiffOptions::from(&config).reconcile_upload_states);
        config.reconcile_upload_states = false;
        assert!(!DiffOptions::from(&config).reconcile_upload_states);
    }

    fn group(title: &str) -> GroupInfo {
        GroupInfo {
            encrypted_title: Some(title.into()),
            created_at: Some(at(1_000)),
            created_by: Some("alice".into()),
            ..GroupInfo::default()
        }
    }

    fn descriptor(
        gid: &str,
        state: UploadState,
        sender: &str,
        recipients: &[(&str, &[&str])],
    ) -> AssetDescriptor {
        let mut by_recipient = BTreeMap::new();
        let mut infos = BTreeMap::new();
        for (user, groups) in recipients {
            by_recipient.insert(
                user.to_string(),
                groups.iter().map(|g| g.to_string()).collect(),
            );
            for g in *groups {
                infos.insert(g.to_string(), group(g));
            }
        }
        AssetDescriptor {
            global_identifier: gid.into(),
            local_identifier: Some(format!("L-{gid}")),
            creation_date: Some(at(0)),
            upload_state: state,
            sharing_info: SharingInfo {
                shared_by_user_identifier: sender.into(),
                group_ids_by_recipient_user_identifier: by_recipient,
                group_info_by_id: infos,
            },
        }
    }

    fn me() -> UserIdentifier {
        "alice".to_string()
    }

    #[test]
    fn local_only_assets_are_removed_except_own_in_flight() {
        let local = vec![
            descriptor("done", UploadState::Completed, "bob", &[]),
            descriptor("mine-started", UploadState::Started, "alice", &[]),
            descriptor("mine-partial", UploadState::Partial, "alice", &[]),
            descriptor("theirs-started", UploadState::Started, "bob", &[]),
            descriptor("mine-failed", UploadState::Failed, "alice", &[]),
        ];
        let diff = AssetDescriptorsDiff::generate(&[], &local, &me());
        let removed: Vec<&str> = diff
            .assets_removed_on_remote
            .iter()
            .map(|a| a.global_identifier.as_str())
            .collect();
        assert_eq!(removed, vec!["done", "mine-failed", "theirs-started"]);
        assert_eq!(
            diff.assets_removed_on_remote[0].local_identifier.as_deref(),
            Some("L-done")
        );
    }

    #[test]
    fn new_recipient_is_reported_as_added() {
        let local = descriptor("a", UploadState::Completed, "alice", &[("alice", &["g1"])]);
        let remote = descriptor(
            "a",
            UploadState::Completed,
            "alice",
            &[("alice", &["g1"]), ("bob", &["g1"])],
        );
        let diff = AssetDescriptorsDiff::generate(&[remote], &[local], &me());

        let change = &diff.user_ids_added_to_the_share_of_asset_gid["a"];
        assert_eq!(change.from, "alice");
        assert_eq!(change.group_ids_by_recipient.len(), 1);
        assert_eq!(change.group_ids_by_recipient["bob"], vec!["g1".to_string()]);
        assert!(change.group_info_by_id.contains_key("g1"));
        assert!(diff.user_ids_removed_from_the_shares_of_asset_gid.is_empty());
    }

    #[test]
    fn revoked_recipients_accumulate_per_asset() {
        let local = descriptor(
            "a",
            UploadState::Completed,
            "alice",
            &[("alice", &["g1"]), ("bob", &["g1"]), ("carol", &["g2"])],
        );
        let remote = descriptor("a", UploadState::Completed, "alice", &[("alice", &["g1"])]);
        let diff = AssetDescriptorsDiff::generate(&[remote], &[local], &me());

        let removed = &diff.user_ids_removed_from_the_shares_of_asset_gid["a"];
        assert_eq!(removed.len(), 2);
        assert_eq!(removed["bob"], vec!["g1".to_string()]);
        assert_eq!(removed["carol"], vec!["g2".to_string()]);
        assert_eq!(
            diff.group_info_removed_on_remote,
            BTreeSet::from(["g2".to_string()])
        );
        assert!(diff.user_ids_added_to_the_share_of_asset_gid.is_empty());
    }

    #[test]
    fn group_metadata_edit_is_a_group_info_change_only() {
        let local = descriptor(
            "a",
            UploadState::Completed,
            "alice",
            &[("alice", &["g1"]), ("bob", &["g1"])],
        );
        let mut remote = local.clone();
        remote
            .sharing_info
            .group_info_by_id
            .get_mut("g1")
            .unwrap()
            .encrypted_title = Some("renamed".into());

        let diff = AssetDescriptorsDiff::generate(&[remote], &[local], &me());
        let change = &diff.group_info_different_on_remote["g1"];
        assert_eq!(change.group_info.encrypted_title.as_deref(), Some("renamed"));
        assert!(change.descriptor_by_asset_id.contains_key("a"));
        assert!(diff.user_ids_added_to_the_share_of_asset_gid.is_empty());
        assert!(diff.user_ids_removed_from_the_shares_of_asset_gid.is_empty());
        assert!(diff.group_info_removed_on_remote.is_empty());
    }

    #[test]
    fn sub_second_created_at_drift_is_ignored() {
        let local = descriptor("a", UploadState::Completed, "alice", &[("bob", &["g1"])]);
        let mut remote = local.clone();
        remote
            .sharing_info
            .group_info_by_id
            .get_mut("g1")
            .unwrap()
            .created_at = Some(at(1_000) + chrono::Duration::milliseconds(250));
        assert!(AssetDescriptorsDiff::generate(&[remote], &[local], &me()).is_empty());
    }

    #[test]
    fn only_completed_descriptors_are_compared() {
        let local = descriptor("a", UploadState::Partial, "alice", &[("bob", &["g1"])]);
        let remote = descriptor("a", UploadState::Partial, "alice", &[("carol", &["g2"])]);
        let diff = AssetDescriptorsDiff::generate(&[remote], &[local], &me());
        assert!(diff.is_empty());
    }

    #[test]
    fn terminal_remote_state_is_reported_per_quality() {
        let local = descriptor("a", UploadState::Partial, "bob", &[]);
        let remote = descriptor("a", UploadState::Completed, "bob", &[]);
        let diff = AssetDescriptorsDiff::generate(&[remote.clone()], &[local.clone()], &me());
        let qualities: Vec<AssetQuality> = diff
            .state_different_on_remote
            .iter()
            .map(|s| s.quality)
            .collect();
        assert_eq!(qualities, AssetQuality::ALL.to_vec());
        assert!(
            diff.state_different_on_remote
                .iter()
                .all(|s| s.new_upload_state == UploadState::Completed)
        );

        let off = DiffOptions {
            reconcile_upload_states: false,
        };
        let diff = AssetDescriptorsDiff::generate_with(&[remote], &[local], &me(), off);
        assert!(diff.state_different_on_remote.is_empty());
    }

    #[test]
    fn remote_failure_does_not_override_own_upload_in_flight() {
        let local = descriptor("a", UploadState::Started, "alice", &[]);
        let remote = descriptor("a", UploadState::Failed, "alice", &[]);
        let diff = AssetDescriptorsDiff::generate(&[remote], &[local], &me());
        assert!(diff.state_different_on_remote.is_empty());
    }

    fn arb_state() -> impl Strategy<Value = UploadState> {
        prop_oneof![
            Just(UploadState::NotStarted),
            Just(UploadState::Started),
            Just(UploadState::Partial),
            Just(UploadState::Completed),
            Just(UploadState::Failed),
        ]
    }

    fn arb_descriptor() -> impl Strategy<Value = AssetDescriptor> {
        (
            "[a-f]",
            arb_state(),
            prop::sample::select(vec!["alice", "bob"]),
            prop::collection::btree_map(
                prop::sample::select(vec!["alice", "bob", "carol", "dan"]),
                prop::collection::btree_set(prop::sample::select(vec!["g1", "g2", "g3"]), 1..3),
                0..4,
            ),
            "[xy]",
        )
            .prop_map(|(gid, state, sender, recipients, title)| {
                let mut d = descriptor(&gid, state, sender, &[]);
                for (user, groups) in recipients {
                    d.sharing_info.group_ids_by_recipient_user_identifier.insert(
                        user.to_string(),
                        groups.iter().map(|g| g.to_string()).collect(),
                    );
                    for g in groups {
                        d.sharing_info
                            .group_info_by_id
                            .insert(g.to_string(), group(&title));
                    }
                }
                d
            })
    }

    fn unique(descriptors: Vec<AssetDescriptor>) -> Vec<AssetDescriptor> {
        descriptors
            .into_iter()
            .map(|d| (d.global_identifier.clone(), d))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect()
    }

    proptest! {
        #[test]
        fn identical_sides_produce_an_empty_diff(
            descriptors in prop::collection::vec(arb_descriptor(), 0..8)
        ) {
            let diff = AssetDescriptorsDiff::generate(&descriptors, &descriptors, &me());
            prop_assert!(diff.is_empty());
        }

        #[test]
        fn diff_does_not_depend_on_input_order(
            remote in prop::collection::vec(arb_descriptor(), 0..8),
            local in prop::collection::vec(arb_descriptor(), 0..8),
        ) {
            let remote = unique(remote);
            let local = unique(local);
            let forward = AssetDescriptorsDiff::generate(&remote, &local, &me());

            let mut remote_rev = remote.clone();
            remote_rev.reverse();
            let mut local_rev = local.clone();
            local_rev.reverse();
            let backward = AssetDescriptorsDiff::generate(&remote_rev, &local_rev, &me());

            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn removals_are_local_only_and_never_own_in_flight(
            remote in prop::collection::vec(arb_descriptor(), 0..8),
            local in prop::collection::vec(arb_descriptor(), 0..8),
        ) {
            let local = unique(local);
            let diff = AssetDescriptorsDiff::generate(&remote, &local, &me());
            let remote_gids: BTreeSet<&str> =
                remote.iter().map(|d| d.global_identifier.as_str()).collect();

            for removed in &diff.assets_removed_on_remote {
                prop_assert!(!remote_gids.contains(removed.global_identifier.as_str()));
                let d = local
                    .iter()
                    .find(|d| d.global_identifier == removed.global_identifier)
                    .unwrap();
                prop_assert!(
                    !(d.upload_state.is_in_flight()
                        && d.sharing_info.shared_by_user_identifier == me())
                );
            }
        }
    }
}
