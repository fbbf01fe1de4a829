// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine tests.
//!
//! `TestHarness` wires the pipeline, download orchestrator and sync
//! components over the mocks in this crate and SQLite stores in a temporary
//! directory. One [`RecordingDelegate`] is registered with every component.

use std::sync::Arc;

use sharesync_config::model::SharesyncConfig;
use sharesync_core::{DownloadBlacklist, QueueStore, SyncError, User};
use sharesync_download::{DownloadDependencies, DownloadOrchestrator};
use sharesync_graph::{ShareCache, ShareGraph};
use sharesync_pipeline::{
    Pipeline, PipelineDelegate, PipelineDelegates, PipelineRunner, ProcessingRegistry,
    StageContext,
};
use sharesync_storage::{Database, SqliteDownloadBlacklist, SqliteQueueStore, SqliteTripleStore};
use sharesync_sync::{AssetsSync, DiffOptions, GlobalSync, InteractionsSync};
use tokio_util::sync::CancellationToken;

use crate::mock_crypto::MockCrypto;
use crate::mock_library::MockPhotoLibrary;
use crate::mock_local::MockLocalServer;
use crate::mock_remote::MockRemoteServer;
use crate::recorder::RecordingDelegate;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    user: User,
    config: SharesyncConfig,
    pipeline_delegates: Vec<Arc<dyn PipelineDelegate>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            user: User::new("alice", "Alice"),
            config: SharesyncConfig::default(),
            pipeline_delegates: Vec::new(),
        }
    }

    /// Account owner. Defaults to `alice`.
    pub fn with_user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    /// Register an extra pipeline delegate after the recorder.
    pub fn with_pipeline_delegate(mut self, delegate: Arc<dyn PipelineDelegate>) -> Self {
        self.pipeline_delegates.push(delegate);
        self
    }

    pub fn with_surrogate_resolution(mut self, enabled: bool) -> Self {
        self.config.pipeline.surrogate_resolution = enabled;
        self
    }

    pub fn with_failed_attempts_threshold(mut self, threshold: u32) -> Self {
        self.config.download.failed_attempts_threshold = threshold;
        self
    }

    pub fn with_reconcile_upload_states(mut self, enabled: bool) -> Self {
        self.config.sync.reconcile_upload_states = enabled;
        self
    }

    /// Build the harness, creating the database in a fresh temp directory.
    pub async fn build(mut self) -> Result<TestHarness, SyncError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| SyncError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("sharesync.db");
        self.config.storage.database_path = db_path.to_string_lossy().to_string();
        self.config.engine.user_identifier = Some(self.user.identifier.clone());

        let db = Database::open_from_config(&self.config.storage).await?;
        let timeouts = self.config.sync.timeouts();

        let remote = Arc::new(MockRemoteServer::new());
        let local = Arc::new(MockLocalServer::new());
        let library = Arc::new(MockPhotoLibrary::new());
        let crypto = Arc::new(MockCrypto::new());
        let recorder = Arc::new(RecordingDelegate::new());

        let queues: Arc<dyn QueueStore> = Arc::new(SqliteQueueStore::new(db.clone()));
        let blacklist: Arc<dyn DownloadBlacklist> = Arc::new(SqliteDownloadBlacklist::new(
            db.clone(),
            self.config.download.failed_attempts_threshold,
        ));
        let graph = Arc::new(ShareGraph::new(
            Arc::new(SqliteTripleStore::with_database(db)),
            Arc::new(ShareCache::new()),
        ));

        let mut delegates = PipelineDelegates::new(vec![recorder.clone()]);
        for delegate in self.pipeline_delegates.drain(..) {
            delegates.add(delegate);
        }

        let ctx = StageContext {
            queues: queues.clone(),
            local: local.clone(),
            remote: remote.clone(),
            library: library.clone(),
            crypto: crypto.clone(),
            graph: graph.clone(),
            delegates,
            registry: ProcessingRegistry::new(),
            timeouts,
            surrogate_resolution: self.config.pipeline.surrogate_resolution,
            current_user: self.user.clone(),
        };
        let pipeline = Arc::new(Pipeline::new(ctx));
        let runner = Arc::new(PipelineRunner::from_config(
            pipeline.clone(),
            &self.config.pipeline,
        ));

        let mut download = DownloadOrchestrator::new(
            DownloadDependencies {
                remote: remote.clone(),
                local: local.clone(),
                library: library.clone(),
                crypto: crypto.clone(),
                blacklist: blacklist.clone(),
                queues: queues.clone(),
                graph: graph.clone(),
            },
            self.user.clone(),
            timeouts,
            &self.config.download,
        );
        download.add_delegate(recorder.clone());
        download.add_restoration_delegate(recorder.clone());
        let download = Arc::new(download);

        let mut assets_sync = AssetsSync::new(
            remote.clone(),
            local.clone(),
            blacklist.clone(),
            graph.clone(),
            pipeline.clone(),
            self.user.identifier.clone(),
            timeouts,
            DiffOptions::from(&self.config.sync),
        );
        assets_sync.add_delegate(recorder.clone());
        let assets_sync = Arc::new(assets_sync);

        let mut interactions = InteractionsSync::new(remote.clone(), local.clone(), timeouts);
        interactions.add_delegate(recorder.clone());
        let interactions = Arc::new(interactions);

        let global = GlobalSync::new(download.clone(), assets_sync.clone(), interactions.clone());

        Ok(TestHarness {
            remote,
            local,
            library,
            crypto,
            recorder,
            queues,
            blacklist,
            graph,
            pipeline,
            runner,
            download,
            assets_sync,
            interactions,
            global,
            current_user: self.user,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete engine over mocks and temp storage.
pub struct TestHarness {
    pub remote: Arc<MockRemoteServer>,
    pub local: Arc<MockLocalServer>,
    pub library: Arc<MockPhotoLibrary>,
    pub crypto: Arc<MockCrypto>,
    pub recorder: Arc<RecordingDelegate>,
    pub queues: Arc<dyn QueueStore>,
    pub blacklist: Arc<dyn DownloadBlacklist>,
    pub graph: Arc<ShareGraph>,
    pub pipeline: Arc<Pipeline>,
    pub runner: Arc<PipelineRunner>,
    pub download: Arc<DownloadOrchestrator>,
    pub assets_sync: Arc<AssetsSync>,
    pub interactions: Arc<InteractionsSync>,
    pub global: GlobalSync,
    pub current_user: User,
    pub config: SharesyncConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a builder with default settings.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Run pipeline cycles until one processes nothing. Returns the total
    /// number of items processed.
    pub async fn drain_pipeline(&self) -> Result<usize, SyncError> {
        let cancel = CancellationToken::new();
        let mut total = 0;
        loop {
            let processed = self
                .runner
                .run_cycle(self.config.pipeline.mode, &cancel)
                .await?;
            if processed == 0 {
                return Ok(total);
            }
            total += processed;
        }
    }
}
