// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic pipeline cycles.

use std::sync::Arc;

use async_trait::async_trait;
use sharesync_config::model::{PipelineConfig, RunMode};
use sharesync_core::{BackgroundOperation, QueueKind, SyncError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::pipeline::Pipeline;

/// Stage order of one cycle. Fetch runs twice: once for uploads and once
/// for the items fanned out by the upload stage.
const CYCLE: [QueueKind; 5] = [
    QueueKind::Fetch,
    QueueKind::Encrypt,
    QueueKind::Upload,
    QueueKind::Fetch,
    QueueKind::Share,
];

/// Maximum in-flight items per stage in conservative mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageCaps {
    pub fetch: usize,
    pub encrypt: usize,
    pub upload: usize,
    pub share: usize,
}

impl StageCaps {
    pub fn for_stage(&self, kind: QueueKind) -> usize {
        match kind {
            QueueKind::Fetch => self.fetch,
            QueueKind::Encrypt => self.encrypt,
            QueueKind::Upload => self.upload,
            QueueKind::Share => self.share,
            _ => 0,
        }
    }
}

impl Default for StageCaps {
    fn default() -> Self {
        Self {
            fetch: 7,
            encrypt: 5,
            upload: 5,
            share: 10,
        }
    }
}

impl From<&PipelineConfig> for StageCaps {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            fetch: config.fetch_max_in_flight,
            encrypt: config.encrypt_max_in_flight,
            upload: config.upload_max_in_flight,
            share: config.share_max_in_flight,
        }
    }
}

/// Runs pipeline cycles.
pub struct PipelineRunner {
    pipeline: Arc<Pipeline>,
    caps: StageCaps,
    mode: RunMode,
}

impl PipelineRunner {
    pub fn new(pipeline: Arc<Pipeline>, caps: StageCaps, mode: RunMode) -> Self {
        Self {
            pipeline,
            caps,
            mode,
        }
    }

    pub fn from_config(pipeline: Arc<Pipeline>, config: &PipelineConfig) -> Self {
        Self::new(pipeline, StageCaps::from(config), config.mode)
    }

    /// Item limit for the next run of `kind`, or `None` to skip the stage.
    fn limit(&self, mode: RunMode, kind: QueueKind) -> Option<usize> {
        match mode {
            RunMode::Aggressive => Some(0),
            RunMode::Conservative => {
                let in_flight = self.pipeline.context().registry.in_flight(kind);
                let available = self.caps.for_stage(kind).saturating_sub(in_flight);
                (available > 0).then_some(available)
            }
        }
    }

    /// Process up to the admitted number of items of one stage.
    ///
    /// Returns `Ok(0)` when the stage is at capacity.
    pub async fn run_stage(
        &self,
        mode: RunMode,
        kind: QueueKind,
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let Some(limit) = self.limit(mode, kind) else {
            debug!(queue = %kind, "stage at capacity, skipping");
            return Ok(0);
        };
        match self.pipeline.stage(kind) {
            Some(stage) => stage.run(limit, cancel).await,
            None => Ok(0),
        }
    }

    /// One pass over every stage. Returns the number of items processed.
    pub async fn run_cycle(
        &self,
        mode: RunMode,
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let mut processed = 0;
        for kind in CYCLE {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            processed += self.run_stage(mode, kind, cancel).await?;
        }
        debug!(processed, ?mode, "pipeline cycle finished");
        Ok(processed)
    }

    /// One operation per work queue, for stages scheduled independently.
    pub fn stage_drains(self: &Arc<Self>) -> Vec<StageDrain> {
        QueueKind::WORK
            .into_iter()
            .map(|kind| StageDrain {
                runner: Arc::clone(self),
                kind,
                name: format!("pipeline-{kind}"),
            })
            .collect()
    }
}

#[async_trait]
impl BackgroundOperation for PipelineRunner {
    fn name(&self) -> &str {
        "pipeline"
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        PipelineRunner::run_cycle(self, self.mode, cancel).await.map(|_| ())
    }
}

/// Drains a single stage queue with the runner's mode and caps.
pub struct StageDrain {
    runner: Arc<PipelineRunner>,
    kind: QueueKind,
    name: String,
}

impl StageDrain {
    pub fn kind(&self) -> QueueKind {
        self.kind
    }
}

#[async_trait]
impl BackgroundOperation for StageDrain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        let processed = self
            .runner
            .run_stage(self.runner.mode, self.kind, cancel)
            .await?;
        debug!(queue = %self.kind, processed, "stage drain finished");
        Ok(())
    }
}
