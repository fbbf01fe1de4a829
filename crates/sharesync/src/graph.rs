// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sharesync graph` queries against the persisted share graph.

use std::collections::{BTreeMap, BTreeSet};

use clap::Subcommand;
use serde::Serialize;
use sharesync_config::SharesyncConfig;
use sharesync_core::{GlobalIdentifier, SyncError, UserIdentifier};
use sharesync_graph::ShareGraph;

use crate::stores::Stores;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum GraphCommand {
    /// Assets shared by the given users.
    SharedBy {
        #[arg(required = true)]
        users: Vec<String>,
        /// Keep only assets shared with one of these recipients.
        #[arg(long = "with")]
        with: Vec<String>,
        /// Skip shares not yet confirmed by the remote.
        #[arg(long)]
        confirmed: bool,
    },
    /// Assets shared with the given users.
    SharedWith {
        #[arg(required = true)]
        users: Vec<String>,
        /// Keep only assets shared by this sender.
        #[arg(long)]
        by: Option<String>,
    },
    /// Assets exchanged between the given users and one other.
    Amongst {
        #[arg(required = true)]
        users: Vec<String>,
        #[arg(long)]
        with: String,
    },
    /// Senders and recipients of the given assets.
    Connected {
        #[arg(required = true)]
        assets: Vec<String>,
        #[arg(long)]
        confirmed: bool,
    },
    /// Global identifiers recorded for local identifiers.
    Local {
        #[arg(required = true)]
        local_identifiers: Vec<String>,
    },
}

/// Query output, keyed by global identifier.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum GraphAnswer {
    Senders(BTreeMap<GlobalIdentifier, UserIdentifier>),
    Users(BTreeMap<GlobalIdentifier, BTreeSet<UserIdentifier>>),
    Assets(BTreeSet<GlobalIdentifier>),
    Connections(BTreeMap<GlobalIdentifier, Vec<String>>),
    Identifiers(BTreeMap<String, GlobalIdentifier>),
}

impl GraphAnswer {
    pub fn len(&self) -> usize {
        match self {
            GraphAnswer::Senders(m) => m.len(),
            GraphAnswer::Users(m) => m.len(),
            GraphAnswer::Assets(s) => s.len(),
            GraphAnswer::Connections(m) => m.len(),
            GraphAnswer::Identifiers(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lines(&self) -> Vec<String> {
        match self {
            GraphAnswer::Senders(m) => m.iter().map(|(gid, by)| format!("{gid}  {by}")).collect(),
            GraphAnswer::Users(m) => m
                .iter()
                .map(|(gid, users)| {
                    let users: Vec<&str> = users.iter().map(String::as_str).collect();
                    format!("{gid}  {}", users.join(", "))
                })
                .collect(),
            GraphAnswer::Assets(s) => s.iter().cloned().collect(),
            GraphAnswer::Connections(m) => m
                .iter()
                .map(|(gid, users)| format!("{gid}  {}", users.join(", ")))
                .collect(),
            GraphAnswer::Identifiers(m) => m
                .iter()
                .map(|(lid, gid)| format!("{lid}  {gid}"))
                .collect(),
        }
    }
}

pub async fn query(graph: &ShareGraph, command: &GraphCommand) -> Result<GraphAnswer, SyncError> {
    match command {
        GraphCommand::SharedBy {
            users,
            with,
            confirmed,
        } => {
            let with = (!with.is_empty()).then_some(with.as_slice());
            graph
                .asset_global_identifiers_shared_by(users, with, *confirmed)
                .await
                .map(GraphAnswer::Senders)
        }
        GraphCommand::SharedWith { users, by } => graph
            .asset_global_identifiers_shared_with(users, by.as_ref())
            .await
            .map(GraphAnswer::Users),
        GraphCommand::Amongst { users, with } => graph
            .asset_global_identifiers_amongst(users, with)
            .await
            .map(GraphAnswer::Assets),
        GraphCommand::Connected { assets, confirmed } => {
            let connected = graph.users_connected_to(assets, *confirmed).await?;
            Ok(GraphAnswer::Connections(
                connected
                    .into_iter()
                    .map(|(gid, users)| {
                        let users = users
                            .into_iter()
                            .map(|u| format!("{} ({})", u.user_identifier, u.predicate))
                            .collect();
                        (gid, users)
                    })
                    .collect(),
            ))
        }
        GraphCommand::Local { local_identifiers } => graph
            .asset_global_identifiers_for_local_identifiers(local_identifiers)
            .await
            .map(GraphAnswer::Identifiers),
    }
}

/// Run a `sharesync graph` subcommand.
pub async fn run_graph(
    config: &SharesyncConfig,
    command: &GraphCommand,
    json: bool,
) -> Result<(), SyncError> {
    let stores = Stores::open(config).await?;
    let answer = query(&stores.graph, command).await;
    stores.close().await?;
    let answer = answer?;

    if json {
        let out = serde_json::to_string_pretty(&answer)
            .map_err(|e| SyncError::Internal(format!("failed to serialize answer: {e}")))?;
        println!("{out}");
    } else if answer.is_empty() {
        println!("no matching assets");
    } else {
        for line in answer.lines() {
            println!("{line}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(dir: &tempfile::TempDir) -> Stores {
        let mut config = SharesyncConfig::default();
        config.storage.database_path = dir
            .path()
            .join("graph.db")
            .to_string_lossy()
            .into_owned();
        let stores = Stores::open(&config).await.unwrap();
        stores
            .graph
            .ingest_share(&"g1".into(), &"alice".into(), &["bob".into()])
            .await
            .unwrap();
        stores
            .graph
            .ingest_share(&"g2".into(), &"carol".into(), &["alice".into()])
            .await
            .unwrap();
        stores
    }

    #[tokio::test]
    async fn shared_by_lists_senders() {
        let dir = tempfile::tempdir().unwrap();
        let stores = seeded(&dir).await;

        let answer = query(
            &stores.graph,
            &GraphCommand::SharedBy {
                users: vec!["alice".into(), "carol".into()],
                with: vec![],
                confirmed: true,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            answer,
            GraphAnswer::Senders(BTreeMap::from([
                ("g1".to_string(), "alice".to_string()),
                ("g2".to_string(), "carol".to_string()),
            ]))
        );
    }

    #[tokio::test]
    async fn shared_with_filters_by_sender() {
        let dir = tempfile::tempdir().unwrap();
        let stores = seeded(&dir).await;

        let answer = query(
            &stores.graph,
            &GraphCommand::SharedWith {
                users: vec!["alice".into(), "bob".into()],
                by: Some("carol".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(answer.len(), 1);
        assert_eq!(answer.lines(), vec!["g2  alice".to_string()]);
    }

    #[tokio::test]
    async fn unknown_assets_have_no_connections() {
        let dir = tempfile::tempdir().unwrap();
        let stores = seeded(&dir).await;

        let answer = query(
            &stores.graph,
            &GraphCommand::Connected {
                assets: vec!["missing".into()],
                confirmed: false,
            },
        )
        .await
        .unwrap();
        assert!(answer.is_empty());
    }
}
