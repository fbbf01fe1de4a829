// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Share graph fact table.
//!
//! The store is created detached and attached to a [`Database`] once the
//! database is open. Every operation before that fails with
//! [`SyncError::DatabaseNotReady`].

use std::str::FromStr;

use async_trait::async_trait;
use rusqlite::params_from_iter;
use sharesync_core::traits::triple_store::{Predicate, Triple, TripleOp, TriplePattern};
use sharesync_core::{SyncError, TripleStore};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::database::{map_tr_err, placeholders, Database};

/// SQLite implementation of [`TripleStore`].
#[derive(Default)]
pub struct SqliteTripleStore {
    db: OnceCell<Database>,
}

impl SqliteTripleStore {
    /// Create a store that is not yet backed by a database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already attached to `db`.
    pub fn with_database(db: Database) -> Self {
        Self {
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Attach the database. Later calls are ignored.
    pub fn initialize(&self, db: Database) {
        if self.db.set(db).is_err() {
            debug!("triple store already initialized");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.db.initialized()
    }

    fn db(&self) -> Result<&Database, SyncError> {
        self.db.get().ok_or(SyncError::DatabaseNotReady)
    }
}

/// `WHERE` clause for a pattern, with positional parameters starting at `?1`.
fn pattern_clause(pattern: &TriplePattern) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut params: Vec<String> = Vec::new();

    let mut push = |column: &str, values: Vec<String>| {
        if values.is_empty() {
            conditions.push("0".to_string());
            return;
        }
        conditions.push(format!(
            "{column} IN ({})",
            placeholders(params.len() + 1, values.len())
        ));
        params.extend(values);
    };

    if let Some(subjects) = &pattern.subjects {
        push("subject", subjects.clone());
    }
    if let Some(predicates) = &pattern.predicates {
        push("predicate", predicates.iter().map(|p| p.to_string()).collect());
    }
    if let Some(objects) = &pattern.objects {
        push("object", objects.clone());
    }

    if conditions.is_empty() {
        ("1".to_string(), params)
    } else {
        (conditions.join(" AND "), params)
    }
}

fn row_to_triple(row: &rusqlite::Row<'_>) -> Result<Triple, rusqlite::Error> {
    let subject: String = row.get(0)?;
    let predicate: String = row.get(1)?;
    let object: String = row.get(2)?;
    let predicate = Predicate::from_str(&predicate).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Triple {
        subject,
        predicate,
        object,
    })
}

#[async_trait]
impl TripleStore for SqliteTripleStore {
    async fn apply(&self, ops: Vec<TripleOp>) -> Result<(), SyncError> {
        if ops.is_empty() {
            return Ok(());
        }
        self.db()?
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                for op in &ops {
                    match op {
                        TripleOp::Insert(t) => {
                            tx.execute(
                                "INSERT OR IGNORE INTO triples (subject, predicate, object)
                                 VALUES (?1, ?2, ?3)",
                                rusqlite::params![t.subject, t.predicate.to_string(), t.object],
                            )?;
                        }
                        TripleOp::Remove(pattern) => {
                            let (clause, params) = pattern_clause(pattern);
                            tx.execute(
                                &format!("DELETE FROM triples WHERE {clause}"),
                                params_from_iter(params.iter()),
                            )?;
                        }
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn matching(&self, pattern: &TriplePattern) -> Result<Vec<Triple>, SyncError> {
        let (clause, params) = pattern_clause(pattern);
        let sql = format!(
            "SELECT subject, predicate, object FROM triples WHERE {clause}
             ORDER BY subject, predicate, object"
        );
        self.db()?
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(params.iter()), row_to_triple)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove_entities(&self, entities: &[String]) -> Result<(), SyncError> {
        if entities.is_empty() {
            return Ok(());
        }
        let list = placeholders(1, entities.len());
        let sql = format!("DELETE FROM triples WHERE subject IN ({list}) OR object IN ({list})");
        let params = entities.to_vec();
        self.db()?
            .connection()
            .call(move |conn| {
                conn.execute(&sql, params_from_iter(params.iter()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove_all(&self) -> Result<(), SyncError> {
        self.db()?
            .connection()
            .call(|conn| {
                conn.execute("DELETE FROM triples", [])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
