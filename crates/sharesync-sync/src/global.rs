// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full sync: download, then asset reconciliation, then interactions.

use std::sync::Arc;

use async_trait::async_trait;
use sharesync_core::{BackgroundOperation, SyncError};
use sharesync_download::{DownloadFilter, DownloadOrchestrator, DownloadReport};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::assets_sync::{AssetsSync, AssetsSyncReport};
use crate::interactions::{InteractionsSync, InteractionsSyncReport};

/// Results of the steps that succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalSyncReport {
    pub download: Option<DownloadReport>,
    pub assets: Option<AssetsSyncReport>,
    pub interactions: Option<InteractionsSyncReport>,
}

pub struct GlobalSync {
    download: Arc<DownloadOrchestrator>,
    assets: Arc<AssetsSync>,
    interactions: Arc<InteractionsSync>,
    running: Mutex<()>,
}

impl GlobalSync {
    pub fn new(
        download: Arc<DownloadOrchestrator>,
        assets: Arc<AssetsSync>,
        interactions: Arc<InteractionsSync>,
    ) -> Self {
        Self {
            download,
            assets,
            interactions,
            running: Mutex::new(()),
        }
    }

    /// Run every step once. Returns `None` when a sync is already running.
    ///
    /// A failed step is logged and the next one still runs. The first error
    /// is returned once all steps are done.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<GlobalSyncReport>, SyncError> {
        let Ok(_guard) = self.running.try_lock() else {
            info!("global sync already running, skipping");
            return Ok(None);
        };

        let mut report = GlobalSyncReport::default();
        let mut first_error = None;

        match self.download.run(&DownloadFilter::default(), cancel).await {
            Ok(r) => report.download = Some(r),
            Err(e) => {
                error!(error = %e, "download step failed");
                first_error.get_or_insert(e);
            }
        }

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        match self.assets.run().await {
            Ok(r) => report.assets = Some(r),
            Err(e) => {
                error!(error = %e, "assets sync step failed");
                first_error.get_or_insert(e);
            }
        }

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        match self.interactions.run(cancel).await {
            Ok(r) => report.interactions = Some(r),
            Err(e) => {
                error!(error = %e, "interactions sync step failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(Some(report)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }
}

#[async_trait]
impl BackgroundOperation for GlobalSync {
    fn name(&self) -> &str {
        "global-sync"
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        self.run(cancel).await.map(|_| ())
    }
}
