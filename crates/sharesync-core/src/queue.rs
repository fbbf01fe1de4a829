// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue kinds, persisted entries and deterministic item identifiers.
//!
//! An identifier is derived from `(asset key, group id, recipients, versions)`
//! so that enqueueing the same logical request twice lands on the same key:
//!
//! ```text
//! <local id or global id>+<group id>[+<sha256(sorted recipients joined by '+')>][+<low:hi>]
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};

use crate::types::{AssetQuality, GroupId};

/// Every persistent queue the pipeline reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueKind {
    Fetch,
    Encrypt,
    Upload,
    Share,
    UploadHistory,
    ShareHistory,
    FailedUpload,
    FailedShare,
}

impl QueueKind {
    /// Work queues, in stage order.
    pub const WORK: [QueueKind; 4] = [
        QueueKind::Fetch,
        QueueKind::Encrypt,
        QueueKind::Upload,
        QueueKind::Share,
    ];

    pub const ALL: [QueueKind; 8] = [
        QueueKind::Fetch,
        QueueKind::Encrypt,
        QueueKind::Upload,
        QueueKind::Share,
        QueueKind::UploadHistory,
        QueueKind::ShareHistory,
        QueueKind::FailedUpload,
        QueueKind::FailedShare,
    ];
}

/// A persisted queue record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub identifier: QueueItemId,
    /// Serialized queue item.
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// Key predicate used to select queue entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    Exact(String),
    Prefix(String),
}

impl KeyMatch {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatch::Exact(k) => key == k,
            KeyMatch::Prefix(p) => key.starts_with(p.as_str()),
        }
    }
}

const SEPARATOR: char = '+';
const VERSION_SEPARATOR: char = ':';

/// Key of a queue item in every pipeline queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueueItemId(pub String);

impl QueueItemId {
    /// Build the identifier for one logical pipeline request.
    ///
    /// Recipient order and duplicates do not affect the result.
    pub fn new<S: AsRef<str>>(
        asset_key: &str,
        group_id: &str,
        recipient_ids: &[S],
        versions: &[AssetQuality],
    ) -> Self {
        let mut components = vec![asset_key.to_string(), group_id.to_string()];

        if !recipient_ids.is_empty() {
            let mut sorted: Vec<&str> = recipient_ids.iter().map(|s| s.as_ref()).collect();
            sorted.sort_unstable();
            sorted.dedup();
            let digest = Sha256::digest(sorted.join("+").as_bytes());
            components.push(hex::encode(digest));
        }

        if !versions.is_empty() {
            let raw: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
            components.push(raw.join(&VERSION_SEPARATOR.to_string()));
        }

        QueueItemId(components.join(&SEPARATOR.to_string()))
    }

    /// Prefix shared by every request for an asset.
    pub fn asset_prefix(asset_key: &str) -> String {
        format!("{asset_key}{SEPARATOR}")
    }

    /// Prefix shared by every request for an asset within a group.
    pub fn asset_group_prefix(asset_key: &str, group_id: &str) -> String {
        format!("{asset_key}{SEPARATOR}{group_id}{SEPARATOR}")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Asset key component (local identifier, or global identifier when none was known).
    pub fn asset_key(&self) -> Option<&str> {
        self.components().first().copied()
    }

    /// Group id component. Only identifiers with at least three components are parsed.
    pub fn group_id(&self) -> Option<GroupId> {
        let components = self.components();
        if components.len() >= 3 {
            Some(components[1].to_string())
        } else {
            None
        }
    }

    fn components(&self) -> Vec<&str> {
        self.0.split(SEPARATOR).collect()
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueueItemId {
    fn from(value: &str) -> Self {
        QueueItemId(value.to_string())
    }
}
