// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation between the local cache and the remote authority.
//!
//! - [`AssetDescriptorsDiff`] compares descriptor sets without side effects.
//! - [`AssetsSync`] applies a diff to the local store, the share graph and
//!   the pipeline queues.
//! - [`InteractionsSync`] mirrors messages and reactions.
//! - [`GlobalSync`] runs download, asset sync and interactions sync in turn.

pub mod assets_sync;
pub mod delegate;
pub mod diff;
pub mod global;
pub mod interactions;

pub use assets_sync::{AssetsSync, AssetsSyncReport};
pub use delegate::{AssetSyncingDelegate, InteractionsSyncDelegate};
pub use diff::{AssetDescriptorsDiff, AssetVersionState, BackedUpAsset, DiffOptions, GroupInfoDiff};
pub use global::{GlobalSync, GlobalSyncReport};
pub use interactions::{shared_group_ids, InteractionsSync, InteractionsSyncReport};
