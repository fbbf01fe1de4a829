// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failed download counts and blacklisted users.
//!
//! An asset is blacklisted once its attempt count reaches the configured
//! threshold.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params_from_iter;
use sharesync_core::{DownloadBlacklist, GlobalIdentifier, SyncError, UserIdentifier};

use crate::database::{format_ts, map_tr_err, placeholders, Database};

/// SQLite implementation of [`DownloadBlacklist`].
#[derive(Clone)]
pub struct SqliteDownloadBlacklist {
    db: Database,
    threshold: u32,
}

impl SqliteDownloadBlacklist {
    pub fn new(db: Database, threshold: u32) -> Self {
        Self {
            db,
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    async fn delete_in(
        &self,
        table: &'static str,
        column: &'static str,
        keys: &[String],
    ) -> Result<(), SyncError> {
        if keys.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "DELETE FROM {table} WHERE {column} IN ({})",
            placeholders(1, keys.len())
        );
        let keys = keys.to_vec();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(&sql, params_from_iter(keys.iter()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl DownloadBlacklist for SqliteDownloadBlacklist {
    async fn record_failed_attempt(
        &self,
        global_identifier: &GlobalIdentifier,
    ) -> Result<u32, SyncError> {
        let gid = global_identifier.clone();
        let threshold = self.threshold;
        let now = format_ts(Utc::now());
        self.db
            .connection()
            .call(move |conn| {
                let attempts: i64 = conn.query_row(
                    "INSERT INTO download_attempts (global_identifier, attempts, updated_at)
                     VALUES (?1, 1, ?2)
                     ON CONFLICT (global_identifier)
                     DO UPDATE SET attempts = MIN(attempts + 1, ?3), updated_at = excluded.updated_at
                     RETURNING attempts",
                    rusqlite::params![gid, now, threshold],
                    |row| row.get(0),
                )?;
                Ok(attempts as u32)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn blacklist(&self, global_identifier: &GlobalIdentifier) -> Result<(), SyncError> {
        let gid = global_identifier.clone();
        let threshold = self.threshold;
        let now = format_ts(Utc::now());
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO download_attempts (global_identifier, attempts, updated_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT (global_identifier)
                     DO UPDATE SET attempts = excluded.attempts, updated_at = excluded.updated_at",
                    rusqlite::params![gid, threshold, now],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove_from_blacklist(
        &self,
        global_identifiers: &[GlobalIdentifier],
    ) -> Result<(), SyncError> {
        self.delete_in("download_attempts", "global_identifier", global_identifiers)
            .await
    }

    async fn is_blacklisted(
        &self,
        global_identifier: &GlobalIdentifier,
    ) -> Result<bool, SyncError> {
        let map = self
            .are_blacklisted(std::slice::from_ref(global_identifier))
            .await?;
        Ok(map.get(global_identifier).copied().unwrap_or(false))
    }

    async fn are_blacklisted(
        &self,
        global_identifiers: &[GlobalIdentifier],
    ) -> Result<BTreeMap<GlobalIdentifier, bool>, SyncError> {
        let mut result: BTreeMap<GlobalIdentifier, bool> = global_identifiers
            .iter()
            .map(|gid| (gid.clone(), false))
            .collect();
        if global_identifiers.is_empty() {
            return Ok(result);
        }

        let sql = format!(
            "SELECT global_identifier FROM download_attempts
             WHERE attempts >= {} AND global_identifier IN ({})",
            self.threshold,
            placeholders(1, global_identifiers.len())
        );
        let params = global_identifiers.to_vec();
        let blacklisted: Vec<String> = self
            .db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?;

        for gid in blacklisted {
            result.insert(gid, true);
        }
        Ok(result)
    }

    async fn blacklist_users(&self, identifiers: &[UserIdentifier]) -> Result<(), SyncError> {
        if identifiers.is_empty() {
            return Ok(());
        }
        let identifiers = identifiers.to_vec();
        let now = format_ts(Utc::now());
        self.db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                for id in &identifiers {
                    tx.execute(
                        "INSERT OR IGNORE INTO blacklisted_users (user_identifier, added_at)
                         VALUES (?1, ?2)",
                        rusqlite::params![id, now],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove_users(&self, identifiers: &[UserIdentifier]) -> Result<(), SyncError> {
        self.delete_in("blacklisted_users", "user_identifier", identifiers)
            .await
    }

    async fn remove_users_if_not_in(
        &self,
        identifiers: &[UserIdentifier],
    ) -> Result<(), SyncError> {
        let sql = if identifiers.is_empty() {
            "DELETE FROM blacklisted_users".to_string()
        } else {
            format!(
                "DELETE FROM blacklisted_users WHERE user_identifier NOT IN ({})",
                placeholders(1, identifiers.len())
            )
        };
        let keys = identifiers.to_vec();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(&sql, params_from_iter(keys.iter()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn blacklisted_users(&self) -> Result<BTreeSet<UserIdentifier>, SyncError> {
        self.db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT user_identifier FROM blacklisted_users")?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<BTreeSet<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn clean_entries(
        &self,
        global_identifiers: &[GlobalIdentifier],
    ) -> Result<(), SyncError> {
        self.delete_in("download_attempts", "global_identifier", global_identifiers)
            .await
    }

    async fn deep_clean(&self) -> Result<(), SyncError> {
        self.db
            .connection()
            .call(|conn| {
                conn.execute_batch(
                    "DELETE FROM download_attempts;
                     DELETE FROM blacklisted_users;",
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn blacklist(threshold: u32) -> (SqliteDownloadBlacklist, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blacklist.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (SqliteDownloadBlacklist::new(db, threshold), dir)
    }

    #[tokio::test]
    async fn reaching_threshold_blacklists() {
        let (bl, _dir) = blacklist(3).await;
        let gid = "g1".to_string();
        assert_eq!(bl.record_failed_attempt(&gid).await.unwrap(), 1);
        assert_eq!(bl.record_failed_attempt(&gid).await.unwrap(), 2);
        assert!(!bl.is_blacklisted(&gid).await.unwrap());
        assert_eq!(bl.record_failed_attempt(&gid).await.unwrap(), 3);
        assert!(bl.is_blacklisted(&gid).await.unwrap());
        // Saturates at the threshold.
        assert_eq!(bl.record_failed_attempt(&gid).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn explicit_blacklist_and_removal() {
        let (bl, _dir) = blacklist(6).await;
        bl.blacklist(&"g1".to_string()).await.unwrap();
        bl.record_failed_attempt(&"g2".to_string()).await.unwrap();

        let map = bl
            .are_blacklisted(&["g1".into(), "g2".into(), "g3".into()])
            .await
            .unwrap();
        assert_eq!(map.get("g1"), Some(&true));
        assert_eq!(map.get("g2"), Some(&false));
        assert_eq!(map.get("g3"), Some(&false));

        bl.remove_from_blacklist(&["g1".into()]).await.unwrap();
        assert!(!bl.is_blacklisted(&"g1".to_string()).await.unwrap());
    }

    #[tokio::test]
    async fn clean_entries_resets_counts() {
        let (bl, _dir) = blacklist(2).await;
        let gid = "g1".to_string();
        bl.record_failed_attempt(&gid).await.unwrap();
        bl.clean_entries(std::slice::from_ref(&gid)).await.unwrap();
        assert_eq!(bl.record_failed_attempt(&gid).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn user_blacklist_lifecycle() {
        let (bl, _dir) = blacklist(6).await;
        bl.blacklist_users(&["u1".into(), "u2".into(), "u3".into()])
            .await
            .unwrap();
        bl.remove_users(&["u1".into()]).await.unwrap();
        assert_eq!(
            bl.blacklisted_users().await.unwrap(),
            BTreeSet::from(["u2".to_string(), "u3".to_string()])
        );

        bl.remove_users_if_not_in(&["u3".into(), "u9".into()])
            .await
            .unwrap();
        assert_eq!(
            bl.blacklisted_users().await.unwrap(),
            BTreeSet::from(["u3".to_string()])
        );

        bl.remove_users_if_not_in(&[]).await.unwrap();
        assert!(bl.blacklisted_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deep_clean_empties_everything() {
        let (bl, _dir) = blacklist(1).await;
        bl.blacklist(&"g1".to_string()).await.unwrap();
        bl.blacklist_users(&["u1".into()]).await.unwrap();
        bl.deep_clean().await.unwrap();
        assert!(!bl.is_blacklisted(&"g1".to_string()).await.unwrap());
        assert!(bl.blacklisted_users().await.unwrap().is_empty());
    }
}
