// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the sharesync engine.

use std::time::Duration;

use thiserror::Error;

use crate::types::GlobalIdentifier;

/// The primary error type used across all sharesync collaborator traits and engine operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistent store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The backing store has not been opened yet.
    #[error("database not ready")]
    DatabaseNotReady,

    /// Remote authority errors (network failure, rejected request, missing asset).
    #[error("remote error: {message}")]
    Remote {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local descriptor/asset cache errors.
    #[error("local store error: {message}")]
    LocalStore {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A bounded wait on an external call elapsed.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The global identifier computed for an asset disagrees with another source.
    #[error("global identifier disagreement for {local_identifier}: expected {expected}, got {actual}")]
    GlobalIdentifierDisagreement {
        local_identifier: String,
        expected: GlobalIdentifier,
        actual: GlobalIdentifier,
    },

    /// Malformed descriptor or otherwise inconsistent data.
    #[error("data inconsistency: {0}")]
    Inconsistency(String),

    /// A persisted queue item could not be deserialized.
    #[error("undecodable payload for queue item {identifier}: {reason}")]
    UndecodablePayload { identifier: String, reason: String },

    /// A request was rejected by a business rule before any I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The item is already being processed by the same stage.
    #[error("queue item {identifier} is already being processed")]
    AlreadyProcessing { identifier: String },

    /// The asset exceeded the failed download threshold.
    #[error("asset {0} is blacklisted")]
    AssetBlacklisted(GlobalIdentifier),

    /// A requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation observed cooperative cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Build a [`SyncError::Remote`] without an underlying source.
    pub fn remote(message: impl Into<String>) -> Self {
        SyncError::Remote {
            message: message.into(),
            source: None,
        }
    }

    /// Build a [`SyncError::LocalStore`] without an underlying source.
    pub fn local(message: impl Into<String>) -> Self {
        SyncError::LocalStore {
            message: message.into(),
            source: None,
        }
    }

    /// Whether retrying on the next cycle may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Timeout { .. } | SyncError::Remote { .. })
    }

    /// Whether the error is fatal for the item it occurred on and must not be retried.
    pub fn is_fatal_for_item(&self) -> bool {
        matches!(
            self,
            SyncError::GlobalIdentifierDisagreement { .. }
                | SyncError::Inconsistency(_)
                | SyncError::UndecodablePayload { .. }
                | SyncError::InvalidRequest(_)
        )
    }
}
