// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types shared across sharesync crates.
//!
//! Descriptors, users, asset payloads and interactions. Maps are `BTreeMap`
//! so that anything computed from them is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Content-derived, device-independent asset identifier.
pub type GlobalIdentifier = String;

/// Device-specific reference into the local photo library.
pub type LocalIdentifier = String;

/// Identifier of a user known to the remote authority.
pub type UserIdentifier = String;

/// Identifier of a share group.
pub type GroupId = String;

/// Resolution level of a stored asset version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssetQuality {
    Low,
    Mid,
    Hi,
}

impl AssetQuality {
    /// Every quality, lowest first.
    pub const ALL: [AssetQuality; 3] = [AssetQuality::Low, AssetQuality::Mid, AssetQuality::Hi];
}

/// Upload state of an asset as recorded in a descriptor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UploadState {
    NotStarted,
    Started,
    Partial,
    Completed,
    Failed,
}

impl UploadState {
    /// States of an upload that has not reached a terminal outcome yet.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            UploadState::NotStarted | UploadState::Started | UploadState::Partial
        )
    }

    /// Whether the remote holds enough of the asset to download it.
    pub fn is_downloadable(self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Partial)
    }
}

/// Metadata of a share group as carried in descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub name: Option<String>,
    pub encrypted_title: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserIdentifier>,
    pub permissions: Option<i32>,
    /// Invited phone number -> invitation timestamp.
    pub invited_users_phone_numbers: Option<BTreeMap<String, String>>,
    pub created_from_thread_id: Option<String>,
}

impl GroupInfo {
    /// Field-by-field comparison used by reconciliation.
    ///
    /// Creation dates compare at second precision and invitations compare by
    /// phone number only.
    pub fn differs_from(&self, other: &GroupInfo) -> bool {
        let seconds = |d: &Option<DateTime<Utc>>| d.map(|d| d.timestamp());
        let invited = |g: &GroupInfo| -> BTreeSet<String> {
            g.invited_users_phone_numbers
                .as_ref()
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default()
        };

        seconds(&self.created_at) != seconds(&other.created_at)
            || self.created_by != other.created_by
            || self.encrypted_title != other.encrypted_title
            || self.created_from_thread_id != other.created_from_thread_id
            || self.permissions != other.permissions
            || invited(self) != invited(other)
    }
}

/// Who shared an asset, with whom, and in which groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingInfo {
    pub shared_by_user_identifier: UserIdentifier,
    pub group_ids_by_recipient_user_identifier: BTreeMap<UserIdentifier, Vec<GroupId>>,
    pub group_info_by_id: BTreeMap<GroupId, GroupInfo>,
}

/// Per-asset record describing its upload and sharing state on a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub global_identifier: GlobalIdentifier,
    pub local_identifier: Option<LocalIdentifier>,
    pub creation_date: Option<DateTime<Utc>>,
    pub upload_state: UploadState,
    pub sharing_info: SharingInfo,
}

impl AssetDescriptor {
    /// Sender plus every recipient referenced by this descriptor.
    pub fn referenced_user_ids(&self) -> BTreeSet<UserIdentifier> {
        let mut ids: BTreeSet<UserIdentifier> = self
            .sharing_info
            .group_ids_by_recipient_user_identifier
            .keys()
            .cloned()
            .collect();
        ids.insert(self.sharing_info.shared_by_user_identifier.clone());
        ids
    }

    /// Recipients of this asset, excluding the sender.
    pub fn recipients_other_than_sender(&self) -> Vec<UserIdentifier> {
        self.sharing_info
            .group_ids_by_recipient_user_identifier
            .keys()
            .filter(|id| **id != self.sharing_info.shared_by_user_identifier)
            .cloned()
            .collect()
    }
}

/// Union of the users referenced by a set of descriptors.
pub fn all_referenced_user_ids(descriptors: &[AssetDescriptor]) -> BTreeSet<UserIdentifier> {
    descriptors
        .iter()
        .flat_map(|d| d.referenced_user_ids())
        .collect()
}

/// Filter applied when listing descriptors from a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorFilter {
    pub global_identifiers: Option<Vec<GlobalIdentifier>>,
    pub group_ids: Option<Vec<GroupId>>,
    pub after: Option<DateTime<Utc>>,
}

/// Identity snapshot of a user, as stored in queue items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct User {
    pub identifier: UserIdentifier,
    pub name: String,
}

impl User {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
        }
    }
}

/// Plaintext asset resolved from the photo library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    pub local_identifier: LocalIdentifier,
    /// Identifier computed from the content.
    pub global_identifier: GlobalIdentifier,
    pub creation_date: Option<DateTime<Utc>>,
    pub perceptual_hash: Option<String>,
    pub data: BTreeMap<AssetQuality, Vec<u8>>,
}

/// One encrypted version of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAssetVersion {
    pub quality: AssetQuality,
    pub encrypted_data: Vec<u8>,
    /// Per-asset secret wrapped for the owner.
    pub encrypted_secret: Vec<u8>,
}

/// An asset encrypted for its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAsset {
    pub global_identifier: GlobalIdentifier,
    pub local_identifier: Option<LocalIdentifier>,
    pub creation_date: Option<DateTime<Utc>>,
    pub versions: BTreeMap<AssetQuality, EncryptedAssetVersion>,
}

/// Per-recipient wrapped secret for one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedVersion {
    pub user_identifier: UserIdentifier,
    pub quality: AssetQuality,
    pub encrypted_secret: Vec<u8>,
}

/// Secrets of an asset wrapped for a set of recipients within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareableAsset {
    pub global_identifier: GlobalIdentifier,
    pub group_id: GroupId,
    pub shared_versions: Vec<SharedVersion>,
    pub as_photo_message_in_thread_id: Option<String>,
    pub permissions: i32,
}

/// Decrypted asset handed to download delegates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedAsset {
    pub global_identifier: GlobalIdentifier,
    pub local_identifier: Option<LocalIdentifier>,
    pub creation_date: Option<DateTime<Utc>>,
    pub versions: BTreeMap<AssetQuality, Vec<u8>>,
}

/// Recipients added to the shares of one asset, attributed to a sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareChange {
    pub from: UserIdentifier,
    pub group_ids_by_recipient: BTreeMap<UserIdentifier, Vec<GroupId>>,
    pub group_info_by_id: BTreeMap<GroupId, GroupInfo>,
}

/// Recipient -> group ids removed, keyed by asset.
pub type RecipientRemovals = BTreeMap<GlobalIdentifier, BTreeMap<UserIdentifier, Vec<GroupId>>>;

/// Where conversational interactions are anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InteractionAnchor {
    Group,
    Thread,
}

/// A message posted in a group or thread. Messages are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub interaction_id: String,
    pub sender_user_identifier: UserIdentifier,
    pub in_reply_to_asset_global_identifier: Option<GlobalIdentifier>,
    pub in_reply_to_interaction_id: Option<String>,
    pub encrypted_message: String,
    pub created_at: DateTime<Utc>,
}

/// A reaction to a group, asset or interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub sender_user_identifier: UserIdentifier,
    pub in_reply_to_asset_global_identifier: Option<GlobalIdentifier>,
    pub in_reply_to_interaction_id: Option<String>,
    pub reaction_type: i32,
    pub added_at: DateTime<Utc>,
}

impl Reaction {
    /// Reactions are the same when sender, reply target and type agree.
    pub fn same_reaction(&self, other: &Reaction) -> bool {
        self.sender_user_identifier == other.sender_user_identifier
            && self.in_reply_to_interaction_id == other.in_reply_to_interaction_id
            && self.in_reply_to_asset_global_identifier == other.in_reply_to_asset_global_identifier
            && self.reaction_type == other.reaction_type
    }
}

/// Interactions anchored to one group or thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interactions {
    pub messages: Vec<Message>,
    pub reactions: Vec<Reaction>,
}

/// A conversation thread between users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub member_ids: Vec<UserIdentifier>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn quality_raw_values() {
        assert_eq!(AssetQuality::Low.to_string(), "low");
        assert_eq!(AssetQuality::Hi.to_string(), "hi");
        assert_eq!(AssetQuality::from_str("mid").unwrap(), AssetQuality::Mid);
        assert_eq!(serde_json::to_string(&AssetQuality::Hi).unwrap(), "\"hi\"");
    }

    #[test]
    fn upload_state_raw_values() {
        assert_eq!(UploadState::NotStarted.to_string(), "not_started");
        let parsed: UploadState = serde_json::from_str("\"partial\"").unwrap();
        assert_eq!(parsed, UploadState::Partial);
        assert!(UploadState::Started.is_in_flight());
        assert!(!UploadState::Failed.is_in_flight());
        assert!(UploadState::Partial.is_downloadable());
        assert!(!UploadState::NotStarted.is_downloadable());
    }

    #[test]
    fn group_info_compares_dates_at_second_precision() {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let a = GroupInfo {
            created_at: Some(base),
            ..GroupInfo::default()
        };
        let b = GroupInfo {
            created_at: Some(base + chrono::Duration::milliseconds(400)),
            ..GroupInfo::default()
        };
        assert!(!a.differs_from(&b));

        let c = GroupInfo {
            encrypted_title: Some("t2".into()),
            ..a.clone()
        };
        assert!(a.differs_from(&c));
    }

    #[test]
    fn group_info_compares_invited_phone_numbers_by_key() {
        let mut one = BTreeMap::new();
        one.insert("+15550001".to_string(), "2024-01-01".to_string());
        let mut other = BTreeMap::new();
        other.insert("+15550001".to_string(), "2025-06-01".to_string());

        let a = GroupInfo {
            invited_users_phone_numbers: Some(one),
            ..GroupInfo::default()
        };
        let b = GroupInfo {
            invited_users_phone_numbers: Some(other),
            ..GroupInfo::default()
        };
        assert!(!a.differs_from(&b));
        assert!(a.differs_from(&GroupInfo::default()));
    }

    #[test]
    fn referenced_user_ids_include_sender() {
        let mut recipients = BTreeMap::new();
        recipients.insert("bob".to_string(), vec!["g1".to_string()]);
        let descriptor = AssetDescriptor {
            global_identifier: "a".into(),
            local_identifier: None,
            creation_date: None,
            upload_state: UploadState::Completed,
            sharing_info: SharingInfo {
                shared_by_user_identifier: "alice".into(),
                group_ids_by_recipient_user_identifier: recipients,
                group_info_by_id: BTreeMap::new(),
            },
        };
        let ids = descriptor.referenced_user_ids();
        assert!(ids.contains("alice"));
        assert!(ids.contains("bob"));
        assert_eq!(descriptor.recipients_other_than_sender(), vec!["bob".to_string()]);
    }
}
