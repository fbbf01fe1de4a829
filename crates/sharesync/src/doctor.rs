// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sharesync doctor` command implementation.
//!
//! Checks that the configuration names an account and that the engine
//! database can be opened. With `--deep`, also runs SQLite's integrity check.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use sharesync_config::SharesyncConfig;
use sharesync_core::SyncError;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `sharesync doctor` command.
///
/// Returns an error when any check fails, so the exit status can be scripted.
pub async fn run_doctor(
    config: &SharesyncConfig,
    deep: bool,
    plain: bool,
) -> Result<(), SyncError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let mut results = vec![
        check_user(config),
        check_database(&config.storage.database_path).await,
    ];
    if deep {
        results.push(check_db_integrity(&config.storage.database_path).await);
    }

    println!();
    println!("  sharesync doctor");
    println!("  {}", "-".repeat(50));

    for result in &results {
        let duration_ms = result.duration.as_millis();
        let tag = match (result.status, use_color) {
            (CheckStatus::Pass, true) => {
                use colored::Colorize;
                "[OK]  ".green().to_string()
            }
            (CheckStatus::Warn, true) => {
                use colored::Colorize;
                "[WARN]".yellow().to_string()
            }
            (CheckStatus::Fail, true) => {
                use colored::Colorize;
                "[FAIL]".red().to_string()
            }
            (CheckStatus::Pass, false) => "[OK]  ".to_string(),
            (CheckStatus::Warn, false) => "[WARN]".to_string(),
            (CheckStatus::Fail, false) => "[FAIL]".to_string(),
        };
        println!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        );
    }
    println!();

    let failed = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    let warned = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warn)
        .count();
    if failed + warned == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {failed} failed, {warned} warning(s).");
    }
    println!();

    if failed > 0 {
        return Err(SyncError::Internal(format!("{failed} check(s) failed")));
    }
    Ok(())
}

fn check_user(config: &SharesyncConfig) -> CheckResult {
    let start = Instant::now();
    match &config.engine.user_identifier {
        Some(user) => CheckResult::new("Account", CheckStatus::Pass, user.as_str(), start),
        None => CheckResult::new(
            "Account",
            CheckStatus::Warn,
            "engine.user_identifier is not set",
            start,
        ),
    }
}

/// Check the database exists and carries the engine schema.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new(
                "Database",
                CheckStatus::Fail,
                format!("open failed: {e}"),
                start,
            );
        }
    };
    let tables: Result<i64, tokio_rusqlite::Error<rusqlite::Error>> = conn
        .call(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('queue_items', 'triples', 'download_attempts', 'blacklisted_users')",
                [],
                |row| row.get(0),
            )
        })
        .await;

    match tables {
        Ok(4) => CheckResult::new("Database", CheckStatus::Pass, "schema present", start),
        Ok(n) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("{n} of 4 tables present"),
            start,
        ),
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    }
}

async fn check_db_integrity(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "DB integrity",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new(
                "DB integrity",
                CheckStatus::Fail,
                format!("open failed: {e}"),
                start,
            );
        }
    };
    let rows: Result<Vec<String>, tokio_rusqlite::Error<rusqlite::Error>> = conn
        .call(|conn| {
            let mut stmt = conn.prepare("PRAGMA integrity_check")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
        .await;

    match rows {
        Ok(rows) if rows.len() == 1 && rows[0] == "ok" => {
            CheckResult::new("DB integrity", CheckStatus::Pass, "ok", start)
        }
        Ok(rows) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("{} issue(s) found", rows.len()),
            start,
        ),
        Err(e) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("check failed: {e}"),
            start,
        ),
    }
}
