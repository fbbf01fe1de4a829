// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The share graph.
//!
//! Facts stored:
//! - `shares(sender, asset)`: the remote confirmed the share
//! - `attemptedShare(sender, asset)`: a share was started on this device
//! - `sharedWith(asset, recipient)`
//! - `localAssetIdEquivalent(asset, local id)`
//!
//! All mutations go through a single write gate which is held across the
//! store call and the cache update, so the cache never drifts from the store.
//! A store failure other than [`SyncError::DatabaseNotReady`] wipes both.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use sharesync_core::traits::triple_store::{Predicate, Triple, TripleOp, TriplePattern};
use sharesync_core::types::ShareChange;
use sharesync_core::{
    AssetDescriptor, GlobalIdentifier, LocalIdentifier, SyncError, TripleStore, UserIdentifier,
};
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::cache::ShareCache;

/// A user linked to an asset, and how.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConnectedUser {
    pub predicate: Predicate,
    pub user_identifier: UserIdentifier,
}

enum Mutation {
    Apply(Vec<TripleOp>),
    RemoveEntities(Vec<String>),
}

/// Triple-backed record of sharing relationships.
pub struct ShareGraph {
    store: Arc<dyn TripleStore>,
    cache: Arc<ShareCache>,
    gate: RwLock<()>,
}

impl ShareGraph {
    pub fn new(store: Arc<dyn TripleStore>, cache: Arc<ShareCache>) -> Self {
        Self {
            store,
            cache,
            gate: RwLock::new(()),
        }
    }

    pub fn cache(&self) -> &Arc<ShareCache> {
        &self.cache
    }

    /// Run a mutation with the write gate held; update the cache only on success.
    async fn mutate(
        &self,
        mutation: Mutation,
        update_cache: impl FnOnce(&ShareCache),
    ) -> Result<(), SyncError> {
        let _gate = self.gate.write().await;
        let result = match mutation {
            Mutation::Apply(ops) => self.store.apply(ops).await,
            Mutation::RemoveEntities(entities) => self.store.remove_entities(&entities).await,
        };
        match result {
            Ok(()) => {
                update_cache(&self.cache);
                Ok(())
            }
            Err(SyncError::DatabaseNotReady) => Err(SyncError::DatabaseNotReady),
            Err(e) => {
                error!(error = %e, "share graph write failed, wiping graph");
                self.wipe().await;
                Err(e)
            }
        }
    }

    /// Requires the write gate.
    async fn wipe(&self) {
        if let Err(e) = self.store.remove_all().await {
            error!(error = %e, "failed to wipe share graph store");
        }
        self.cache.clear();
    }

    /// Record a confirmed share from `from` to each of `to`.
    ///
    /// Supersedes any `attemptedShare` for the same sender and asset.
    pub async fn ingest_share(
        &self,
        asset: &GlobalIdentifier,
        from: &UserIdentifier,
        to: &[UserIdentifier],
    ) -> Result<(), SyncError> {
        let recipients = other_recipients(from, to);
        let ops = share_ops(asset, from, &recipients);
        debug!(asset = %asset, from = %from, recipients = recipients.len(), "ingesting share");
        self.mutate(Mutation::Apply(ops), |cache| {
            cache.add_shared_by(from, asset);
            cache.add_shared_with(recipients.iter().map(String::as_str), asset);
        })
        .await
    }

    /// Ingest remote descriptors received by `receiver`.
    ///
    /// Every descriptor is attempted; the first error is returned.
    pub async fn ingest(
        &self,
        descriptors: &[AssetDescriptor],
        receiver: &UserIdentifier,
    ) -> Result<(), SyncError> {
        let mut first_error = None;
        for descriptor in descriptors {
            let info = &descriptor.sharing_info;
            let mut recipients: Vec<UserIdentifier> = info
                .group_ids_by_recipient_user_identifier
                .keys()
                .cloned()
                .collect();
            recipients.push(receiver.clone());
            if let Err(e) = self
                .ingest_share(
                    &descriptor.global_identifier,
                    &info.shared_by_user_identifier,
                    &recipients,
                )
                .await
            {
                warn!(
                    asset = %descriptor.global_identifier,
                    error = %e,
                    "failed to ingest descriptor"
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Record a share that was started on this device but not yet confirmed.
    pub async fn ingest_provisional_share(
        &self,
        asset: &GlobalIdentifier,
        local_identifier: Option<&LocalIdentifier>,
        from: &UserIdentifier,
        to: &[UserIdentifier],
    ) -> Result<(), SyncError> {
        let recipients = other_recipients(from, to);
        let mut ops = vec![TripleOp::Insert(Triple::new(
            from.as_str(),
            Predicate::AttemptedShare,
            asset.as_str(),
        ))];
        if let Some(local_id) = local_identifier {
            ops.push(TripleOp::Insert(Triple::new(
                asset.as_str(),
                Predicate::LocalAssetIdEquivalent,
                local_id.as_str(),
            )));
        }
        ops.extend(recipients.iter().map(|r| {
            TripleOp::Insert(Triple::new(asset.as_str(), Predicate::SharedWith, r.as_str()))
        }));
        self.mutate(Mutation::Apply(ops), |cache| {
            cache.add_shared_with(recipients.iter().map(String::as_str), asset);
        })
        .await
    }

    /// Replace the listed recipients of each asset and re-ingest per sender.
    pub async fn ingest_share_changes(
        &self,
        changes: &BTreeMap<GlobalIdentifier, ShareChange>,
    ) -> Result<(), SyncError> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut ops = Vec::new();
        let mut touched: Vec<(GlobalIdentifier, UserIdentifier, Vec<UserIdentifier>)> = Vec::new();
        for (asset, change) in changes {
            let listed: Vec<UserIdentifier> =
                change.group_ids_by_recipient.keys().cloned().collect();
            ops.push(TripleOp::Remove(
                TriplePattern::new()
                    .subject(asset.as_str())
                    .predicate(Predicate::SharedWith)
                    .objects(listed.iter().cloned()),
            ));
            let recipients = other_recipients(&change.from, &listed);
            ops.extend(share_ops(asset, &change.from, &recipients));
            touched.push((asset.clone(), change.from.clone(), recipients));
        }
        self.mutate(Mutation::Apply(ops), |cache| {
            for (asset, from, recipients) in &touched {
                cache.add_shared_by(from, asset);
                cache.add_shared_with(recipients.iter().map(String::as_str), asset);
            }
        })
        .await
    }

    /// Remove every fact about the given assets.
    pub async fn remove_assets(&self, assets: &[GlobalIdentifier]) -> Result<(), SyncError> {
        if assets.is_empty() {
            return Ok(());
        }
        self.mutate(Mutation::RemoveEntities(assets.to_vec()), |cache| {
            cache.remove_assets(assets)
        })
        .await
    }

    /// Remove every fact about the given users.
    pub async fn remove_users(&self, users: &[UserIdentifier]) -> Result<(), SyncError> {
        if users.is_empty() {
            return Ok(());
        }
        self.mutate(Mutation::RemoveEntities(users.to_vec()), |cache| {
            cache.remove_users(users)
        })
        .await
    }

    /// Remove `sharedWith(asset, recipient)` for each listed pair.
    pub async fn remove_sharing_information(
        &self,
        recipients_by_asset: &BTreeMap<GlobalIdentifier, BTreeSet<UserIdentifier>>,
    ) -> Result<(), SyncError> {
        let ops: Vec<TripleOp> = recipients_by_asset
            .iter()
            .filter(|(_, recipients)| !recipients.is_empty())
            .map(|(asset, recipients)| {
                TripleOp::Remove(
                    TriplePattern::new()
                        .subject(asset.as_str())
                        .predicate(Predicate::SharedWith)
                        .objects(recipients.iter().cloned()),
                )
            })
            .collect();
        if ops.is_empty() {
            return Ok(());
        }
        self.mutate(Mutation::Apply(ops), |cache| {
            for (asset, recipients) in recipients_by_asset {
                cache.remove_shared_with(recipients.iter().map(String::as_str), asset);
            }
        })
        .await
    }

    /// Remove every fact and empty the cache.
    pub async fn deep_clean(&self) -> Result<(), SyncError> {
        let _gate = self.gate.write().await;
        let result = self.store.remove_all().await;
        self.cache.clear();
        result
    }

    /// Assets shared by any of `users`, mapped to their sender.
    ///
    /// With `shared_with`, only assets shared with at least one of those
    /// recipients are kept. Unless `filter_out_in_progress` is set, shares
    /// started on this device but not yet confirmed are included.
    pub async fn asset_global_identifiers_shared_by(
        &self,
        users: &[UserIdentifier],
        shared_with: Option<&[UserIdentifier]>,
        filter_out_in_progress: bool,
    ) -> Result<BTreeMap<GlobalIdentifier, UserIdentifier>, SyncError> {
        let _gate = self.gate.read().await;

        let mut result: BTreeMap<GlobalIdentifier, UserIdentifier> = BTreeMap::new();
        let mut missing = Vec::new();
        for user in users {
            match self.cache.shared_by(user) {
                Some(assets) => {
                    for asset in assets {
                        result.insert(asset, user.clone());
                    }
                }
                None => missing.push(user.clone()),
            }
        }

        if !missing.is_empty() {
            let triples = self
                .store
                .matching(
                    &TriplePattern::new()
                        .subjects(missing.iter().cloned())
                        .predicate(Predicate::Shares),
                )
                .await?;
            let mut fetched: BTreeMap<UserIdentifier, BTreeSet<GlobalIdentifier>> = missing
                .iter()
                .map(|u| (u.clone(), BTreeSet::new()))
                .collect();
            for triple in triples {
                fetched
                    .entry(triple.subject.clone())
                    .or_default()
                    .insert(triple.object.clone());
                result.insert(triple.object, triple.subject);
            }
            for (user, assets) in fetched {
                self.cache.set_shared_by(user, assets);
            }
        }

        if !filter_out_in_progress && !users.is_empty() {
            let attempted = self
                .store
                .matching(
                    &TriplePattern::new()
                        .subjects(users.iter().cloned())
                        .predicate(Predicate::AttemptedShare),
                )
                .await?;
            for triple in attempted {
                result.entry(triple.object).or_insert(triple.subject);
            }
        }

        if let Some(recipients) = shared_with {
            if result.is_empty() {
                return Ok(result);
            }
            let kept: BTreeSet<GlobalIdentifier> = self
                .store
                .matching(
                    &TriplePattern::new()
                        .subjects(result.keys().cloned())
                        .predicate(Predicate::SharedWith)
                        .objects(recipients.iter().cloned()),
                )
                .await?
                .into_iter()
                .map(|t| t.subject)
                .collect();
            result.retain(|asset, _| kept.contains(asset));
        }

        Ok(result)
    }

    /// Assets shared with any of `users`, mapped to those recipients.
    ///
    /// With `shared_by`, only assets shared (or being shared) by that sender
    /// are kept.
    pub async fn asset_global_identifiers_shared_with(
        &self,
        users: &[UserIdentifier],
        shared_by: Option<&UserIdentifier>,
    ) -> Result<BTreeMap<GlobalIdentifier, BTreeSet<UserIdentifier>>, SyncError> {
        let _gate = self.gate.read().await;

        let mut result: BTreeMap<GlobalIdentifier, BTreeSet<UserIdentifier>> = BTreeMap::new();
        let mut missing = Vec::new();
        for user in users {
            match self.cache.shared_with(user) {
                Some(assets) => {
                    for asset in assets {
                        result.entry(asset).or_default().insert(user.clone());
                    }
                }
                None => missing.push(user.clone()),
            }
        }

        if !missing.is_empty() {
            let triples = self
                .store
                .matching(
                    &TriplePattern::new()
                        .predicate(Predicate::SharedWith)
                        .objects(missing.iter().cloned()),
                )
                .await?;
            let mut fetched: BTreeMap<UserIdentifier, BTreeSet<GlobalIdentifier>> = missing
                .iter()
                .map(|u| (u.clone(), BTreeSet::new()))
                .collect();
            for triple in triples {
                fetched
                    .entry(triple.object.clone())
                    .or_default()
                    .insert(triple.subject.clone());
                result.entry(triple.subject).or_default().insert(triple.object);
            }
            for (user, assets) in fetched {
                self.cache.set_shared_with(user, assets);
            }
        }

        if let Some(sender) = shared_by {
            if result.is_empty() {
                return Ok(result);
            }
            let kept: BTreeSet<GlobalIdentifier> = self
                .store
                .matching(
                    &TriplePattern::new()
                        .subject(sender.as_str())
                        .predicates(vec![Predicate::Shares, Predicate::AttemptedShare])
                        .objects(result.keys().cloned()),
                )
                .await?
                .into_iter()
                .map(|t| t.object)
                .collect();
            result.retain(|asset, _| kept.contains(asset));
        }

        Ok(result)
    }

    /// Assets exchanged in either direction between `requesting_user` and any of `users`.
    pub async fn asset_global_identifiers_amongst(
        &self,
        users: &[UserIdentifier],
        requesting_user: &UserIdentifier,
    ) -> Result<BTreeSet<GlobalIdentifier>, SyncError> {
        let outgoing = self
            .asset_global_identifiers_shared_by(
                std::slice::from_ref(requesting_user),
                Some(users),
                true,
            )
            .await?;
        let incoming = self
            .asset_global_identifiers_shared_by(
                users,
                Some(std::slice::from_ref(requesting_user)),
                true,
            )
            .await?;
        Ok(outgoing.into_keys().chain(incoming.into_keys()).collect())
    }

    /// Senders and recipients of each asset.
    pub async fn users_connected_to(
        &self,
        assets: &[GlobalIdentifier],
        filter_out_in_progress: bool,
    ) -> Result<BTreeMap<GlobalIdentifier, Vec<ConnectedUser>>, SyncError> {
        if assets.is_empty() {
            return Ok(BTreeMap::new());
        }
        let _gate = self.gate.read().await;

        let sender_predicates = if filter_out_in_progress {
            vec![Predicate::Shares]
        } else {
            vec![Predicate::Shares, Predicate::AttemptedShare]
        };
        let senders = self
            .store
            .matching(
                &TriplePattern::new()
                    .predicates(sender_predicates)
                    .objects(assets.iter().cloned()),
            )
            .await?;
        let recipients = self
            .store
            .matching(
                &TriplePattern::new()
                    .subjects(assets.iter().cloned())
                    .predicate(Predicate::SharedWith),
            )
            .await?;

        let mut result: BTreeMap<GlobalIdentifier, BTreeSet<ConnectedUser>> = BTreeMap::new();
        for triple in senders {
            result.entry(triple.object).or_default().insert(ConnectedUser {
                predicate: triple.predicate,
                user_identifier: triple.subject,
            });
        }
        for triple in recipients {
            result.entry(triple.subject).or_default().insert(ConnectedUser {
                predicate: triple.predicate,
                user_identifier: triple.object,
            });
        }
        Ok(result
            .into_iter()
            .map(|(asset, users)| (asset, users.into_iter().collect()))
            .collect())
    }

    /// Global identifiers recorded for each local identifier.
    pub async fn asset_global_identifiers_for_local_identifiers(
        &self,
        local_identifiers: &[LocalIdentifier],
    ) -> Result<BTreeMap<LocalIdentifier, GlobalIdentifier>, SyncError> {
        if local_identifiers.is_empty() {
            return Ok(BTreeMap::new());
        }
        let _gate = self.gate.read().await;
        let triples = self
            .store
            .matching(
                &TriplePattern::new()
                    .predicate(Predicate::LocalAssetIdEquivalent)
                    .objects(local_identifiers.iter().cloned()),
            )
            .await?;
        Ok(triples.into_iter().map(|t| (t.object, t.subject)).collect())
    }
}

/// Deduplicated recipients, excluding the sender.
fn other_recipients(from: &str, to: &[UserIdentifier]) -> Vec<UserIdentifier> {
    to.iter()
        .filter(|r| r.as_str() != from)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn share_ops(asset: &str, from: &str, recipients: &[UserIdentifier]) -> Vec<TripleOp> {
    let mut ops = vec![
        TripleOp::Remove(
            TriplePattern::new()
                .subject(from)
                .predicate(Predicate::AttemptedShare)
                .object(asset),
        ),
        TripleOp::Insert(Triple::new(from, Predicate::Shares, asset)),
    ];
    ops.extend(
        recipients
            .iter()
            .map(|r| TripleOp::Insert(Triple::new(asset, Predicate::SharedWith, r.as_str()))),
    );
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sharesync_core::types::SharingInfo;
    use sharesync_core::UploadState;
    use sharesync_storage::{Database, SqliteTripleStore};
    use tempfile::TempDir;
    use tracing_test::traced_test;

    async fn graph() -> (ShareGraph, Arc<SqliteTripleStore>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let store = Arc::new(SqliteTripleStore::with_database(db));
        let graph = ShareGraph::new(store.clone(), Arc::new(ShareCache::new()));
        (graph, store, dir)
    }

    fn users(ids: &[&str]) -> Vec<UserIdentifier> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn descriptor(gid: &str, from: &str, to: &[&str]) -> AssetDescriptor {
        AssetDescriptor {
            global_identifier: gid.into(),
            local_identifier: None,
            creation_date: None,
            upload_state: UploadState::Completed,
            sharing_info: SharingInfo {
                shared_by_user_identifier: from.into(),
                group_ids_by_recipient_user_identifier: to
                    .iter()
                    .map(|u| (u.to_string(), vec!["grp".to_string()]))
                    .collect(),
                group_info_by_id: BTreeMap::new(),
            },
        }
    }

    #[tokio::test]
    async fn ingest_share_is_idempotent() {
        let (graph, store, _dir) = graph().await;
        let asset = "g1".to_string();
        let from = "alice".to_string();
        let to = users(&["bob", "carol", "bob", "alice"]);

        graph.ingest_share(&asset, &from, &to).await.unwrap();
        let once = store.matching(&TriplePattern::new()).await.unwrap();
        graph.ingest_share(&asset, &from, &to).await.unwrap();
        let twice = store.matching(&TriplePattern::new()).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
        assert!(!once.contains(&Triple::new("g1", Predicate::SharedWith, "alice")));
    }

    #[tokio::test]
    async fn confirmed_share_supersedes_attempt() {
        let (graph, store, _dir) = graph().await;
        let asset = "g1".to_string();
        let from = "alice".to_string();
        let local = "L1".to_string();

        graph
            .ingest_provisional_share(&asset, Some(&local), &from, &users(&["bob"]))
            .await
            .unwrap();
        let in_progress = graph
            .asset_global_identifiers_shared_by(&users(&["alice"]), None, false)
            .await
            .unwrap();
        assert_eq!(in_progress.get("g1"), Some(&from));
        let confirmed_only = graph
            .asset_global_identifiers_shared_by(&users(&["alice"]), None, true)
            .await
            .unwrap();
        assert!(confirmed_only.is_empty());

        graph.ingest_share(&asset, &from, &users(&["bob"])).await.unwrap();
        let attempted = store
            .matching(&TriplePattern::new().predicate(Predicate::AttemptedShare))
            .await
            .unwrap();
        assert!(attempted.is_empty());

        let confirmed = graph
            .asset_global_identifiers_shared_by(&users(&["alice"]), None, true)
            .await
            .unwrap();
        assert_eq!(confirmed.get("g1"), Some(&from));

        let by_local = graph
            .asset_global_identifiers_for_local_identifiers(&["L1".to_string()])
            .await
            .unwrap();
        assert_eq!(by_local.get("L1"), Some(&asset));
    }

    #[tokio::test]
    async fn cache_tracks_store_after_writes() {
        let (graph, _store, _dir) = graph().await;
        let alice = "alice".to_string();
        graph
            .ingest_share(&"g1".to_string(), &alice, &users(&["bob"]))
            .await
            .unwrap();

        // Populate the cache.
        graph
            .asset_global_identifiers_shared_by(&users(&["alice"]), None, true)
            .await
            .unwrap();
        graph
            .asset_global_identifiers_shared_with(&users(&["bob"]), None)
            .await
            .unwrap();
        assert!(graph.cache().shared_by("alice").is_some());

        graph
            .ingest_share(&"g2".to_string(), &alice, &users(&["bob"]))
            .await
            .unwrap();
        assert_eq!(
            graph.cache().shared_by("alice"),
            Some(BTreeSet::from(["g1".to_string(), "g2".to_string()]))
        );

        graph.remove_assets(&["g1".to_string()]).await.unwrap();
        assert_eq!(
            graph.cache().shared_with("bob"),
            Some(BTreeSet::from(["g2".to_string()]))
        );

        let removals = BTreeMap::from([("g2".to_string(), BTreeSet::from(["bob".to_string()]))]);
        graph.remove_sharing_information(&removals).await.unwrap();
        assert_eq!(graph.cache().shared_with("bob"), Some(BTreeSet::new()));
        let with_bob = graph
            .asset_global_identifiers_shared_with(&users(&["bob"]), None)
            .await
            .unwrap();
        assert!(with_bob.is_empty());
    }

    #[tokio::test]
    async fn ingest_adds_receiver_and_filters_by_sender() {
        let (graph, _store, _dir) = graph().await;
        let descriptors = vec![
            descriptor("g1", "alice", &["carol"]),
            descriptor("g2", "dave", &[]),
        ];
        graph.ingest(&descriptors, &"bob".to_string()).await.unwrap();

        let with_bob = graph
            .asset_global_identifiers_shared_with(&users(&["bob"]), None)
            .await
            .unwrap();
        assert_eq!(with_bob.keys().cloned().collect::<Vec<_>>(), users(&["g1", "g2"]));

        let from_alice = graph
            .asset_global_identifiers_shared_with(&users(&["bob"]), Some(&"alice".to_string()))
            .await
            .unwrap();
        assert_eq!(from_alice.keys().cloned().collect::<Vec<_>>(), users(&["g1"]));

        let amongst = graph
            .asset_global_identifiers_amongst(&users(&["alice", "dave"]), &"bob".to_string())
            .await
            .unwrap();
        assert_eq!(amongst, BTreeSet::from(["g1".to_string(), "g2".to_string()]));

        let connected = graph
            .users_connected_to(&["g1".to_string()], true)
            .await
            .unwrap();
        let g1 = &connected["g1"];
        assert!(g1.contains(&ConnectedUser {
            predicate: Predicate::Shares,
            user_identifier: "alice".into()
        }));
        assert_eq!(g1.len(), 3);
    }

    #[tokio::test]
    async fn share_changes_replace_listed_recipients() {
        let (graph, store, _dir) = graph().await;
        graph
            .ingest_share(&"g1".to_string(), &"alice".to_string(), &users(&["bob"]))
            .await
            .unwrap();

        let change = ShareChange {
            from: "alice".into(),
            group_ids_by_recipient: BTreeMap::from([("carol".to_string(), vec!["grp".into()])]),
            group_info_by_id: BTreeMap::new(),
        };
        graph
            .ingest_share_changes(&BTreeMap::from([("g1".to_string(), change)]))
            .await
            .unwrap();

        let recipients: Vec<String> = store
            .matching(&TriplePattern::new().predicate(Predicate::SharedWith))
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.object)
            .collect();
        assert_eq!(recipients, users(&["bob", "carol"]));
    }

    #[tokio::test]
    async fn uninitialized_store_reports_not_ready() {
        let graph = ShareGraph::new(
            Arc::new(SqliteTripleStore::new()),
            Arc::new(ShareCache::new()),
        );
        let err = graph
            .ingest_share(&"g1".to_string(), &"alice".to_string(), &users(&["bob"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::DatabaseNotReady));
    }

    struct FailingStore {
        inner: Arc<SqliteTripleStore>,
    }

    #[async_trait]
    impl TripleStore for FailingStore {
        async fn apply(&self, _ops: Vec<TripleOp>) -> Result<(), SyncError> {
            Err(SyncError::Internal("disk full".into()))
        }

        async fn matching(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, SyncError> {
            self.inner.matching(pattern).await
        }

        async fn remove_entities(&self, entities: &[String]) -> Result<(), SyncError> {
            self.inner.remove_entities(entities).await
        }

        async fn remove_all(&self) -> Result<(), SyncError> {
            self.inner.remove_all().await
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn write_failure_wipes_graph() {
        let (healthy, store, _dir) = graph().await;
        healthy
            .ingest_share(&"g1".to_string(), &"alice".to_string(), &users(&["bob"]))
            .await
            .unwrap();

        let cache = Arc::new(ShareCache::new());
        cache.set_shared_by("alice".into(), BTreeSet::from(["g1".to_string()]));
        let failing = ShareGraph::new(Arc::new(FailingStore { inner: store.clone() }), cache);

        let err = failing
            .ingest_share(&"g2".to_string(), &"alice".to_string(), &users(&["bob"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Internal(_)));
        assert!(store.matching(&TriplePattern::new()).await.unwrap().is_empty());
        assert!(failing.cache().is_empty());
        assert!(logs_contain("share graph write failed"));
    }
}
