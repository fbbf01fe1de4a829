// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sharesync clean` maintenance commands.

use clap::Subcommand;
use sharesync_config::SharesyncConfig;
use sharesync_core::{DownloadBlacklist, QueueKind, QueueStore, SyncError};
use tracing::info;

use crate::stores::Stores;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanCommand {
    /// Remove every share graph fact.
    Graph,
    /// Forget failed download attempts and blacklisted users.
    Blacklist,
    /// Empty the failed upload and failed share queues.
    Failed,
    /// Empty one queue.
    Queue {
        /// Queue name, e.g. `fetch` or `upload_history`.
        kind: QueueKind,
    },
    /// Everything above, for every queue.
    All,
}

/// Apply `command`. Returns a one-line summary per step.
pub async fn clean(stores: &Stores, command: CleanCommand) -> Result<Vec<String>, SyncError> {
    let mut done = Vec::new();
    match command {
        CleanCommand::Graph => {
            stores.graph.deep_clean().await?;
            done.push("share graph cleared".to_string());
        }
        CleanCommand::Blacklist => {
            stores.blacklist.deep_clean().await?;
            done.push("download blacklist cleared".to_string());
        }
        CleanCommand::Failed => {
            for kind in [QueueKind::FailedUpload, QueueKind::FailedShare] {
                done.push(clear_queue(stores, kind).await?);
            }
        }
        CleanCommand::Queue { kind } => {
            done.push(clear_queue(stores, kind).await?);
        }
        CleanCommand::All => {
            stores.graph.deep_clean().await?;
            done.push("share graph cleared".to_string());
            stores.blacklist.deep_clean().await?;
            done.push("download blacklist cleared".to_string());
            for kind in QueueKind::ALL {
                done.push(clear_queue(stores, kind).await?);
            }
        }
    }
    Ok(done)
}

async fn clear_queue(stores: &Stores, kind: QueueKind) -> Result<String, SyncError> {
    let count = stores.queues.count(kind).await?;
    stores.queues.clear(kind).await?;
    info!(queue = %kind, removed = count, "queue cleared");
    Ok(format!("{kind}: {count} removed"))
}

/// Run a `sharesync clean` subcommand.
pub async fn run_clean(config: &SharesyncConfig, command: CleanCommand) -> Result<(), SyncError> {
    let stores = Stores::open(config).await?;
    let result = clean(&stores, command).await;
    stores.close().await?;
    for line in result? {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharesync_core::QueueItemId;

    async fn open(dir: &tempfile::TempDir) -> Stores {
        let mut config = SharesyncConfig::default();
        config.storage.database_path = dir
            .path()
            .join("clean.db")
            .to_string_lossy()
            .into_owned();
        Stores::open(&config).await.unwrap()
    }

    #[tokio::test]
    async fn failed_clean_leaves_work_queues() {
        let dir = tempfile::tempdir().unwrap();
        let stores = open(&dir).await;
        let id = QueueItemId::new("L1", "G1", &["bob"], &[]);
        for kind in [QueueKind::Share, QueueKind::FailedShare, QueueKind::FailedUpload] {
            stores.queues.enqueue(kind, &id, "{}").await.unwrap();
        }

        let done = clean(&stores, CleanCommand::Failed).await.unwrap();

        assert_eq!(done, vec!["failed_upload: 1 removed", "failed_share: 1 removed"]);
        assert_eq!(stores.queues.count(QueueKind::Share).await.unwrap(), 1);
        assert_eq!(stores.queues.count(QueueKind::FailedShare).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn graph_clean_removes_shares() {
        let dir = tempfile::tempdir().unwrap();
        let stores = open(&dir).await;
        stores
            .graph
            .ingest_share(&"g1".into(), &"alice".into(), &["bob".into()])
            .await
            .unwrap();

        clean(&stores, CleanCommand::Graph).await.unwrap();

        let shared = stores
            .graph
            .asset_global_identifiers_shared_by(&["alice".into()], None, false)
            .await
            .unwrap();
        assert!(shared.is_empty());
    }

    #[tokio::test]
    async fn blacklist_clean_forgets_users() {
        let dir = tempfile::tempdir().unwrap();
        let stores = open(&dir).await;
        stores
            .blacklist
            .blacklist_users(&["mallory".into()])
            .await
            .unwrap();
        stores.blacklist.blacklist(&"g9".into()).await.unwrap();

        clean(&stores, CleanCommand::Blacklist).await.unwrap();

        assert!(stores.blacklist.blacklisted_users().await.unwrap().is_empty());
        assert!(!stores.blacklist.is_blacklisted(&"g9".into()).await.unwrap());
    }
}
