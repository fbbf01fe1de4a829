// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound asset flow for sharesync.
//!
//! [`DownloadOrchestrator`] pulls descriptors the device does not have yet,
//! filters them through the blacklist and user resolution, restores this
//! user's own history and downloads what others shared.

pub mod delegate;
pub mod orchestrator;
pub mod restoration;

pub use delegate::{DownloadDelegate, RestorationDelegate};
pub use orchestrator::{DownloadDependencies, DownloadFilter, DownloadOrchestrator, DownloadReport};
pub use restoration::{
    synthesize_history, AssetPayloadSource, HistoryItems, LocalPayloadSource, RemotePayloadSource,
    Restoration, SynthesizedHistory,
};
