// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opens the persistent stores named by the configuration.

use std::sync::Arc;

use sharesync_config::SharesyncConfig;
use sharesync_core::SyncError;
use sharesync_graph::{ShareCache, ShareGraph};
use sharesync_storage::{Database, SqliteDownloadBlacklist, SqliteQueueStore, SqliteTripleStore};

/// Every store backed by the engine database.
pub struct Stores {
    pub db: Database,
    pub queues: SqliteQueueStore,
    pub blacklist: SqliteDownloadBlacklist,
    pub graph: ShareGraph,
}

impl Stores {
    pub async fn open(config: &SharesyncConfig) -> Result<Self, SyncError> {
        let db = Database::open_from_config(&config.storage).await?;
        let triples = Arc::new(SqliteTripleStore::with_database(db.clone()));
        Ok(Self {
            queues: SqliteQueueStore::new(db.clone()),
            blacklist: SqliteDownloadBlacklist::new(
                db.clone(),
                config.download.failed_attempts_threshold,
            ),
            graph: ShareGraph::new(triples, Arc::new(ShareCache::new())),
            db,
        })
    }

    /// Checkpoint and close the database.
    pub async fn close(self) -> Result<(), SyncError> {
        self.db.close().await
    }
}
