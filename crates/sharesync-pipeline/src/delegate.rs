// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline progress notifications.

use std::sync::Arc;

use sharesync_core::{QueueItemId, SyncError};

use crate::items::AssetRequest;

/// Observer of pipeline stage transitions. Every method defaults to a no-op.
///
/// Methods are called inline from the stage that emits them and must not block.
#[allow(unused_variables)]
pub trait PipelineDelegate: Send + Sync {
    fn did_start_fetching(&self, id: &QueueItemId, request: &AssetRequest) {}
    fn did_complete_fetching(&self, id: &QueueItemId, request: &AssetRequest) {}
    fn did_fail_fetching(&self, id: &QueueItemId, request: &AssetRequest, error: &SyncError) {}

    fn did_start_encryption(&self, id: &QueueItemId, request: &AssetRequest) {}
    fn did_complete_encryption(&self, id: &QueueItemId, request: &AssetRequest) {}
    fn did_fail_encryption(&self, id: &QueueItemId, request: &AssetRequest, error: &SyncError) {}

    fn did_start_upload(&self, id: &QueueItemId, request: &AssetRequest) {}
    fn did_complete_upload(&self, id: &QueueItemId, request: &AssetRequest) {}
    fn did_fail_upload(&self, id: &QueueItemId, request: &AssetRequest, error: &SyncError) {}

    fn did_start_sharing(&self, id: &QueueItemId, request: &AssetRequest) {}
    fn did_complete_sharing(&self, id: &QueueItemId, request: &AssetRequest) {}
    fn did_fail_sharing(&self, id: &QueueItemId, request: &AssetRequest, error: &SyncError) {}
}

/// Fan-out to a set of delegates.
#[derive(Clone, Default)]
pub struct PipelineDelegates {
    delegates: Vec<Arc<dyn PipelineDelegate>>,
}

impl PipelineDelegates {
    pub fn new(delegates: Vec<Arc<dyn PipelineDelegate>>) -> Self {
        Self { delegates }
    }

    pub fn add(&mut self, delegate: Arc<dyn PipelineDelegate>) {
        self.delegates.push(delegate);
    }

    pub fn notify(&self, f: impl Fn(&dyn PipelineDelegate)) {
        for delegate in &self.delegates {
            f(delegate.as_ref());
        }
    }
}

impl std::fmt::Debug for PipelineDelegates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDelegates")
            .field("count", &self.delegates.len())
            .finish()
    }
}
