// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subject-predicate-object fact store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::SyncError;

/// Relationship between a user and an asset (or an asset and its local twin).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Predicate {
    /// `shares(user, asset)`: confirmed share by the sender.
    Shares,
    /// `sharedWith(asset, user)`: asset visible to a recipient.
    SharedWith,
    /// `attemptedShare(user, asset)`: share initiated but not confirmed by the remote.
    AttemptedShare,
    /// `localAssetIdEquivalent(asset, local id)`.
    LocalAssetIdEquivalent,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub subject: String,
    pub predicate: Predicate,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: Predicate,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
        }
    }
}

/// Pattern over triples. `None` matches anything; `Some` matches any listed value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriplePattern {
    pub subjects: Option<Vec<String>>,
    pub predicates: Option<Vec<Predicate>>,
    pub objects: Option<Vec<String>>,
}

impl TriplePattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subjects = Some(vec![subject.into()]);
        self
    }

    pub fn subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = Some(subjects.into_iter().map(Into::into).collect());
        self
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates = Some(vec![predicate]);
        self
    }

    pub fn predicates(mut self, predicates: Vec<Predicate>) -> Self {
        self.predicates = Some(predicates);
        self
    }

    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.objects = Some(vec![object.into()]);
        self
    }

    pub fn objects<I, S>(mut self, objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.objects = Some(objects.into_iter().map(Into::into).collect());
        self
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        self.subjects
            .as_ref()
            .is_none_or(|s| s.contains(&triple.subject))
            && self
                .predicates
                .as_ref()
                .is_none_or(|p| p.contains(&triple.predicate))
            && self.objects.as_ref().is_none_or(|o| o.contains(&triple.object))
    }
}

/// One mutation in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripleOp {
    Insert(Triple),
    Remove(TriplePattern),
}

/// Set-semantics triple store. Batches passed to [`apply`](TripleStore::apply) are atomic.
#[async_trait]
pub trait TripleStore: Send + Sync {
    async fn apply(&self, ops: Vec<TripleOp>) -> Result<(), SyncError>;

    async fn matching(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, SyncError>;

    /// Remove every triple whose subject or object is one of `entities`.
    async fn remove_entities(&self, entities: &[String]) -> Result<(), SyncError>;

    async fn remove_all(&self) -> Result<(), SyncError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_raw_values() {
        assert_eq!(Predicate::SharedWith.to_string(), "sharedWith");
        assert_eq!(
            "localAssetIdEquivalent".parse::<Predicate>().unwrap(),
            Predicate::LocalAssetIdEquivalent
        );
    }

    #[test]
    fn pattern_matching() {
        let t = Triple::new("alice", Predicate::Shares, "a1");
        assert!(TriplePattern::new().matches(&t));
        assert!(TriplePattern::new()
            .subjects(["bob", "alice"])
            .predicate(Predicate::Shares)
            .matches(&t));
        assert!(!TriplePattern::new().object("a2").matches(&t));
    }
}
