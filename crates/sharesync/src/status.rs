// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sharesync status` command implementation.
//!
//! Reports the number of entries in every queue and the blacklisted users.
//! With `--json` the report is printed as a single JSON object for scripting.

use std::collections::BTreeMap;
use std::io::IsTerminal;

use serde::Serialize;
use sharesync_config::SharesyncConfig;
use sharesync_core::{DownloadBlacklist, QueueKind, QueueStore, SyncError};

use crate::stores::Stores;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub database_path: String,
    pub user_identifier: Option<String>,
    pub queues: BTreeMap<String, usize>,
    pub blacklisted_users: Vec<String>,
}

impl StatusReport {
    /// Entries waiting in the work queues.
    pub fn pending(&self) -> usize {
        QueueKind::WORK
            .iter()
            .filter_map(|kind| self.queues.get(&kind.to_string()))
            .sum()
    }

    /// Entries in the failed queues.
    pub fn failed(&self) -> usize {
        [QueueKind::FailedUpload, QueueKind::FailedShare]
            .iter()
            .filter_map(|kind| self.queues.get(&kind.to_string()))
            .sum()
    }
}

pub async fn collect_status(
    config: &SharesyncConfig,
    stores: &Stores,
) -> Result<StatusReport, SyncError> {
    let mut queues = BTreeMap::new();
    for kind in QueueKind::ALL {
        queues.insert(kind.to_string(), stores.queues.count(kind).await?);
    }
    let blacklisted_users = stores.blacklist.blacklisted_users().await?;

    Ok(StatusReport {
        database_path: config.storage.database_path.clone(),
        user_identifier: config.engine.user_identifier.clone(),
        queues,
        blacklisted_users: blacklisted_users.into_iter().collect(),
    })
}

/// Run the `sharesync status` command.
pub async fn run_status(
    config: &SharesyncConfig,
    json: bool,
    plain: bool,
) -> Result<(), SyncError> {
    let stores = Stores::open(config).await?;
    let report = collect_status(config, &stores).await?;
    stores.close().await?;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| SyncError::Internal(format!("failed to serialize status: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    println!();
    println!("  sharesync status");
    println!("  {}", "-".repeat(50));
    println!("    {:<20} {}", "database", report.database_path);
    println!(
        "    {:<20} {}",
        "user",
        report.user_identifier.as_deref().unwrap_or("(not set)")
    );
    println!();

    for kind in QueueKind::ALL {
        let name = kind.to_string();
        let count = report.queues.get(&name).copied().unwrap_or(0);
        let is_failed = matches!(kind, QueueKind::FailedUpload | QueueKind::FailedShare);
        let value = if use_color && is_failed && count > 0 {
            use colored::Colorize;
            count.to_string().red().to_string()
        } else {
            count.to_string()
        };
        println!("    {name:<20} {value}");
    }

    println!();
    if report.blacklisted_users.is_empty() {
        println!("    no blacklisted users");
    } else {
        println!(
            "    blacklisted users: {}",
            report.blacklisted_users.join(", ")
        );
    }
    println!();
    println!(
        "  {} pending, {} failed.",
        report.pending(),
        report.failed()
    );
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharesync_core::QueueItemId;

    fn test_config(dir: &tempfile::TempDir) -> SharesyncConfig {
        let mut config = SharesyncConfig::default();
        config.storage.database_path = dir
            .path()
            .join("sharesync.db")
            .to_string_lossy()
            .into_owned();
        config.engine.user_identifier = Some("alice".into());
        config
    }

    #[tokio::test]
    async fn status_counts_every_queue() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let stores = Stores::open(&config).await.unwrap();

        let id = QueueItemId::new("L1", "G1", &["bob"], &[]);
        stores
            .queues
            .enqueue(QueueKind::Fetch, &id, "{}")
            .await
            .unwrap();
        stores
            .queues
            .enqueue(QueueKind::FailedShare, &id, "{}")
            .await
            .unwrap();
        stores
            .blacklist
            .blacklist_users(&["mallory".to_string()])
            .await
            .unwrap();

        let report = collect_status(&config, &stores).await.unwrap();
        assert_eq!(report.queues.len(), QueueKind::ALL.len());
        assert_eq!(report.queues["fetch"], 1);
        assert_eq!(report.queues["failed_share"], 1);
        assert_eq!(report.pending(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.blacklisted_users, vec!["mallory".to_string()]);
        assert_eq!(report.user_identifier.as_deref(), Some("alice"));
    }

    #[test]
    fn status_report_serializes_queue_names() {
        let report = StatusReport {
            database_path: "/tmp/s.db".into(),
            user_identifier: None,
            queues: BTreeMap::from([("upload_history".to_string(), 3)]),
            blacklisted_users: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["queues"]["upload_history"], 3);
        assert!(json["user_identifier"].is_null());
    }
}
