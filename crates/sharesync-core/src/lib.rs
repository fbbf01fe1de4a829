// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the sharesync engine.
//!
//! This crate provides the error taxonomy, identifiers and domain types, the
//! deterministic queue item identifiers, and the collaborator traits that the
//! pipeline, download and sync crates are written against.

pub mod bounded;
pub mod error;
pub mod queue;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use bounded::{bounded, Timeouts};
pub use error::SyncError;
pub use queue::{KeyMatch, QueueEntry, QueueItemId, QueueKind};
pub use types::{
    AssetDescriptor, AssetQuality, GlobalIdentifier, GroupId, GroupInfo, LocalIdentifier,
    SharingInfo, UploadState, User, UserIdentifier,
};

// Re-export all collaborator traits at crate root.
pub use traits::{
    AssetCrypto, BackgroundOperation, DownloadBlacklist, LocalServer, PhotoLibrary, QueueStore,
    RemoteServer, TripleStore,
};
