// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Descriptor fixtures.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sharesync_core::{AssetDescriptor, GroupInfo, SharingInfo, UploadState};

/// Group metadata created by `creator` at `created_at` (unix seconds).
pub fn group_info(title: &str, creator: &str, created_at: i64) -> GroupInfo {
    GroupInfo {
        name: None,
        encrypted_title: Some(title.to_string()),
        created_at: DateTime::<Utc>::from_timestamp(created_at, 0),
        created_by: Some(creator.to_string()),
        permissions: Some(0),
        invited_users_phone_numbers: None,
        created_from_thread_id: None,
    }
}

/// Builder for [`AssetDescriptor`] values.
///
/// Groups referenced by a recipient get default metadata unless set with
/// [`DescriptorBuilder::group`].
pub struct DescriptorBuilder {
    descriptor: AssetDescriptor,
}

impl DescriptorBuilder {
    /// A completed asset shared by `sender` with nobody.
    pub fn new(global_identifier: &str, sender: &str) -> Self {
        Self {
            descriptor: AssetDescriptor {
                global_identifier: global_identifier.to_string(),
                local_identifier: None,
                creation_date: DateTime::<Utc>::from_timestamp(1_700_000_000, 0),
                upload_state: UploadState::Completed,
                sharing_info: SharingInfo {
                    shared_by_user_identifier: sender.to_string(),
                    group_ids_by_recipient_user_identifier: BTreeMap::new(),
                    group_info_by_id: BTreeMap::new(),
                },
            },
        }
    }

    pub fn local_identifier(mut self, local_identifier: &str) -> Self {
        self.descriptor.local_identifier = Some(local_identifier.to_string());
        self
    }

    pub fn state(mut self, state: UploadState) -> Self {
        self.descriptor.upload_state = state;
        self
    }

    pub fn created(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.descriptor.creation_date = date;
        self
    }

    pub fn recipient(mut self, user: &str, group_ids: &[&str]) -> Self {
        let sharing = &mut self.descriptor.sharing_info;
        let groups = sharing
            .group_ids_by_recipient_user_identifier
            .entry(user.to_string())
            .or_default();
        for group_id in group_ids {
            if !groups.iter().any(|g| g == group_id) {
                groups.push(group_id.to_string());
            }
            let creator = sharing.shared_by_user_identifier.clone();
            sharing
                .group_info_by_id
                .entry(group_id.to_string())
                .or_insert_with(|| group_info(group_id, &creator, 1_700_000_100));
        }
        self
    }

    pub fn group(mut self, group_id: &str, info: GroupInfo) -> Self {
        self.descriptor
            .sharing_info
            .group_info_by_id
            .insert(group_id.to_string(), info);
        self
    }

    pub fn build(self) -> AssetDescriptor {
        self.descriptor
    }
}
