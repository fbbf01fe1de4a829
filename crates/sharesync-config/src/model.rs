// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the sharesync engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so that a misspelled key
//! fails at startup instead of silently falling back to a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sharesync_core::Timeouts;

/// Top-level sharesync configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SharesyncConfig {
    /// Engine identity and logging.
    #[serde(default)]
    pub engine: EngineConfig,

    /// SQLite store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pipeline queue engine settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Reconciliation settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Download orchestrator settings.
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Engine identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Identifier of the account owner on this device.
    #[serde(default)]
    pub user_identifier: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_identifier: None,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the database holding queues, share graph and blacklist.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("sharesync").join("sharesync.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("sharesync.db"))
        .display()
        .to_string()
}

fn default_true() -> bool {
    true
}

/// How the pipeline runner admits work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Cap each stage by its in-flight maximum.
    #[default]
    Conservative,
    /// No caps.
    Aggressive,
}

/// Pipeline queue engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default = "default_fetch_max")]
    pub fetch_max_in_flight: usize,

    #[serde(default = "default_encrypt_max")]
    pub encrypt_max_in_flight: usize,

    #[serde(default = "default_upload_max")]
    pub upload_max_in_flight: usize,

    #[serde(default = "default_share_max")]
    pub share_max_in_flight: usize,

    #[serde(default)]
    pub mode: RunMode,

    /// Upload mid resolution in place of hi when sharing, then backfill hi in the background.
    #[serde(default = "default_true")]
    pub surrogate_resolution: bool,

    /// Delay before the first scheduled pipeline cycle.
    #[serde(default = "default_scheduler_delay_ms")]
    pub scheduler_delay_ms: u64,

    /// Interval between scheduled pipeline cycles.
    #[serde(default = "default_scheduler_interval_ms")]
    pub scheduler_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_max_in_flight: default_fetch_max(),
            encrypt_max_in_flight: default_encrypt_max(),
            upload_max_in_flight: default_upload_max(),
            share_max_in_flight: default_share_max(),
            mode: RunMode::default(),
            surrogate_resolution: true,
            scheduler_delay_ms: default_scheduler_delay_ms(),
            scheduler_interval_ms: default_scheduler_interval_ms(),
        }
    }
}

impl PipelineConfig {
    pub fn scheduler_delay(&self) -> Duration {
        Duration::from_millis(self.scheduler_delay_ms)
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler_interval_ms)
    }
}

fn default_fetch_max() -> usize {
    7
}

fn default_encrypt_max() -> usize {
    5
}

fn default_upload_max() -> usize {
    5
}

fn default_share_max() -> usize {
    10
}

fn default_scheduler_delay_ms() -> u64 {
    1_000
}

fn default_scheduler_interval_ms() -> u64 {
    5_000
}

/// Reconciliation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Wait limit for calls to the remote authority.
    #[serde(default = "default_network_timeout_secs")]
    pub network_timeout_secs: u64,

    /// Wait limit for calls to local stores.
    #[serde(default = "default_local_timeout_secs")]
    pub local_timeout_secs: u64,

    /// Interval between sync passes.
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,

    /// Reconcile upload-state drift between local and remote descriptors.
    #[serde(default = "default_true")]
    pub reconcile_upload_states: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            network_timeout_secs: default_network_timeout_secs(),
            local_timeout_secs: default_local_timeout_secs(),
            interval_secs: default_sync_interval_secs(),
            reconcile_upload_states: true,
        }
    }
}

impl SyncConfig {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            network: Duration::from_secs(self.network_timeout_secs),
            local: Duration::from_secs(self.local_timeout_secs),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_network_timeout_secs() -> u64 {
    30
}

fn default_local_timeout_secs() -> u64 {
    15
}

fn default_sync_interval_secs() -> u64 {
    60
}

/// Download orchestrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadConfig {
    /// Failed attempts after which an asset is blacklisted.
    #[serde(default = "default_failed_attempts_threshold")]
    pub failed_attempts_threshold: u32,

    /// Interval between new-item polls.
    #[serde(default = "default_download_interval_secs")]
    pub interval_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            failed_attempts_threshold: default_failed_attempts_threshold(),
            interval_secs: default_download_interval_secs(),
        }
    }
}

impl DownloadConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_failed_attempts_threshold() -> u32 {
    6
}

fn default_download_interval_secs() -> u64 {
    30
}
