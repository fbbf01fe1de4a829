// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;

/// A unit of periodic background work.
///
/// Implementations check `cancel` between items and stop admitting new work
/// once it is cancelled.
#[async_trait]
pub trait BackgroundOperation: Send + Sync {
    fn name(&self) -> &str;

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError>;
}
