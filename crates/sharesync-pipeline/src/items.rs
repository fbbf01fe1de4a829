// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue items and their persisted form.
//!
//! Every queue stores a [`QueueItem`] wrapped in a versioned JSON envelope:
//!
//! ```json
//! { "schema_version": 1, "item": { "stage": "fetch", "should_upload": true, ... } }
//! ```

use serde::{Deserialize, Serialize};
use sharesync_core::{
    AssetQuality, GlobalIdentifier, GroupId, LocalIdentifier, QueueItemId, QueueKind, SyncError,
    User, UserIdentifier,
};

/// Envelope version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Fields common to every stage of a pipeline request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRequest {
    pub local_identifier: Option<LocalIdentifier>,
    pub global_identifier: Option<GlobalIdentifier>,
    pub versions: Vec<AssetQuality>,
    pub group_id: GroupId,
    /// User on whose behalf the request runs.
    pub event_originator: User,
    /// Empty for a private backup.
    #[serde(default)]
    pub shared_with: Vec<User>,
    #[serde(default)]
    pub invited_users: Vec<String>,
    #[serde(default)]
    pub group_title: Option<String>,
    #[serde(default)]
    pub as_photo_message_in_thread_id: Option<String>,
    #[serde(default)]
    pub permissions: i32,
    /// Background requests run without user-facing notifications or graph updates.
    #[serde(default)]
    pub is_background: bool,
}

impl AssetRequest {
    /// Local identifier if known, otherwise the global identifier.
    pub fn asset_key(&self) -> Result<&str, SyncError> {
        self.local_identifier
            .as_deref()
            .or(self.global_identifier.as_deref())
            .ok_or_else(|| {
                SyncError::InvalidRequest(
                    "request has neither a local nor a global identifier".into(),
                )
            })
    }

    pub fn queue_item_id(&self) -> Result<QueueItemId, SyncError> {
        let recipients: Vec<&str> = self
            .shared_with
            .iter()
            .map(|u| u.identifier.as_str())
            .collect();
        Ok(QueueItemId::new(
            self.asset_key()?,
            &self.group_id,
            &recipients,
            &self.versions,
        ))
    }

    pub fn global_identifier(&self) -> Result<&GlobalIdentifier, SyncError> {
        self.global_identifier.as_ref().ok_or_else(|| {
            SyncError::Inconsistency(format!(
                "request for {} has no global identifier",
                self.local_identifier.as_deref().unwrap_or("<unknown>")
            ))
        })
    }

    /// Recipients other than the originator.
    pub fn recipients(&self) -> Vec<&User> {
        self.shared_with
            .iter()
            .filter(|u| u.identifier != self.event_originator.identifier)
            .collect()
    }

    pub fn recipient_identifiers(&self) -> Vec<UserIdentifier> {
        self.recipients()
            .into_iter()
            .map(|u| u.identifier.clone())
            .collect()
    }

    pub fn has_recipients(&self) -> bool {
        !self.recipients().is_empty()
    }

    pub fn with_versions(&self, versions: Vec<AssetQuality>) -> Self {
        Self {
            versions,
            ..self.clone()
        }
    }
}

/// Group a request shares into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareTarget {
    pub group_id: GroupId,
    pub shared_with: Vec<User>,
    pub invited_users: Vec<String>,
    pub group_title: Option<String>,
    pub as_photo_message_in_thread_id: Option<String>,
    pub permissions: i32,
}

impl ShareTarget {
    pub fn has_recipients_other_than(&self, user: &User) -> bool {
        self.shared_with
            .iter()
            .any(|u| u.identifier != user.identifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    #[serde(flatten)]
    pub request: AssetRequest,
    /// `false` once the asset is uploaded and is being fetched for sharing.
    pub should_upload: bool,
}

/// Item stored in one of the pipeline queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum QueueItem {
    Fetch(FetchRequest),
    Encrypt(AssetRequest),
    Upload(AssetRequest),
    Share(AssetRequest),
    UploadHistory(AssetRequest),
    ShareHistory(AssetRequest),
    FailedUpload(AssetRequest),
    FailedShare(AssetRequest),
}

impl QueueItem {
    /// Queue this item belongs in.
    pub fn kind(&self) -> QueueKind {
        match self {
            QueueItem::Fetch(_) => QueueKind::Fetch,
            QueueItem::Encrypt(_) => QueueKind::Encrypt,
            QueueItem::Upload(_) => QueueKind::Upload,
            QueueItem::Share(_) => QueueKind::Share,
            QueueItem::UploadHistory(_) => QueueKind::UploadHistory,
            QueueItem::ShareHistory(_) => QueueKind::ShareHistory,
            QueueItem::FailedUpload(_) => QueueKind::FailedUpload,
            QueueItem::FailedShare(_) => QueueKind::FailedShare,
        }
    }

    pub fn request(&self) -> &AssetRequest {
        match self {
            QueueItem::Fetch(fetch) => &fetch.request,
            QueueItem::Encrypt(r)
            | QueueItem::Upload(r)
            | QueueItem::Share(r)
            | QueueItem::UploadHistory(r)
            | QueueItem::ShareHistory(r)
            | QueueItem::FailedUpload(r)
            | QueueItem::FailedShare(r) => r,
        }
    }

    pub fn into_request(self) -> AssetRequest {
        match self {
            QueueItem::Fetch(fetch) => fetch.request,
            QueueItem::Encrypt(r)
            | QueueItem::Upload(r)
            | QueueItem::Share(r)
            | QueueItem::UploadHistory(r)
            | QueueItem::ShareHistory(r)
            | QueueItem::FailedUpload(r)
            | QueueItem::FailedShare(r) => r,
        }
    }

    pub fn encode(&self) -> Result<String, SyncError> {
        serde_json::to_string(&QueueRecord {
            schema_version: SCHEMA_VERSION,
            item: self.clone(),
        })
        .map_err(|e| SyncError::Internal(format!("failed to encode queue item: {e}")))
    }

    /// Decode a stored payload. `identifier` is only used in the error.
    pub fn decode(identifier: &QueueItemId, payload: &str) -> Result<Self, SyncError> {
        let undecodable = |reason: String| SyncError::UndecodablePayload {
            identifier: identifier.to_string(),
            reason,
        };
        let raw: RawRecord = serde_json::from_str(payload).map_err(|e| undecodable(e.to_string()))?;
        if raw.schema_version != SCHEMA_VERSION {
            return Err(undecodable(format!(
                "unsupported schema version {}",
                raw.schema_version
            )));
        }
        serde_json::from_value(raw.item).map_err(|e| undecodable(e.to_string()))
    }
}

/// Persisted envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub schema_version: u32,
    pub item: QueueItem,
}

#[derive(Deserialize)]
struct RawRecord {
    schema_version: u32,
    item: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AssetRequest {
        AssetRequest {
            local_identifier: Some("L1".into()),
            global_identifier: None,
            versions: vec![AssetQuality::Low, AssetQuality::Hi],
            group_id: "G1".into(),
            event_originator: User::new("alice", "Alice"),
            shared_with: vec![User::new("bob", "Bob"), User::new("alice", "Alice")],
            invited_users: vec![],
            group_title: None,
            as_photo_message_in_thread_id: None,
            permissions: 0,
            is_background: false,
        }
    }

    #[test]
    fn fetch_item_encodes_flat_with_stage_tag() {
        let item = QueueItem::Fetch(FetchRequest {
            request: request(),
            should_upload: true,
        });
        let encoded = item.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["item"]["stage"], "fetch");
        assert_eq!(value["item"]["should_upload"], true);
        assert_eq!(value["item"]["group_id"], "G1");

        let id = request().queue_item_id().unwrap();
        assert_eq!(QueueItem::decode(&id, &encoded).unwrap(), item);
    }

    #[test]
    fn unknown_schema_version_is_undecodable() {
        let payload = r#"{"schema_version": 7, "item": {"stage": "share"}}"#;
        let err = QueueItem::decode(&QueueItemId::from("L1+G1"), payload).unwrap_err();
        match err {
            SyncError::UndecodablePayload { identifier, reason } => {
                assert_eq!(identifier, "L1+G1");
                assert!(reason.contains("7"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_is_undecodable() {
        let err = QueueItem::decode(&QueueItemId::from("x"), "not json").unwrap_err();
        assert!(matches!(err, SyncError::UndecodablePayload { .. }));
    }

    #[test]
    fn recipients_exclude_originator() {
        let req = request();
        assert_eq!(req.recipient_identifiers(), vec!["bob".to_string()]);
        assert!(req.has_recipients());

        let private = AssetRequest {
            shared_with: vec![User::new("alice", "Alice")],
            ..request()
        };
        assert!(!private.has_recipients());
    }

    #[test]
    fn asset_key_prefers_local_identifier() {
        let mut req = request();
        req.global_identifier = Some("g1".into());
        assert_eq!(req.asset_key().unwrap(), "L1");
        req.local_identifier = None;
        assert_eq!(req.asset_key().unwrap(), "g1");
        req.global_identifier = None;
        assert!(matches!(req.asset_key(), Err(SyncError::InvalidRequest(_))));
    }

    #[test]
    fn item_kind_matches_variant() {
        let item = QueueItem::FailedShare(request());
        assert_eq!(item.kind(), QueueKind::FailedShare);
        assert_eq!(item.request().group_id, "G1");
    }
}
