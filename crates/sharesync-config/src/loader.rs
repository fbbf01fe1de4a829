// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order, later wins: compiled defaults, `/etc/sharesync/sharesync.toml`,
//! `~/.config/sharesync/sharesync.toml`, `./sharesync.toml`, then `SHARESYNC_*`
//! environment variables.

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SharesyncConfig;

const SYSTEM_CONFIG: &str = "/etc/sharesync/sharesync.toml";
const LOCAL_CONFIG: &str = "sharesync.toml";

/// Config files in merge order.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("sharesync").join(LOCAL_CONFIG));
    }
    paths.push(PathBuf::from(LOCAL_CONFIG));
    paths
}

/// Build the full Figment before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(SharesyncConfig::default()));
    for path in config_file_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<SharesyncConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SharesyncConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SharesyncConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SharesyncConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SharesyncConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Map `SHARESYNC_SECTION_KEY` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")`: keys such as
/// `fetch_max_in_flight` contain underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("SHARESYNC_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("engine_", "engine.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("pipeline_", "pipeline.", 1)
            .replacen("sync_", "sync.", 1)
            .replacen("download_", "download.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_file_is_merged_last() {
        let paths = config_file_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from(SYSTEM_CONFIG)));
        assert_eq!(paths.last(), Some(&PathBuf::from(LOCAL_CONFIG)));
    }

    #[test]
    fn env_override_maps_to_nested_key() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHARESYNC_PIPELINE_FETCH_MAX_IN_FLIGHT", "3");
            jail.set_env("SHARESYNC_SYNC_NETWORK_TIMEOUT_SECS", "9");
            let config: SharesyncConfig = Figment::new()
                .merge(Serialized::defaults(SharesyncConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.pipeline.fetch_max_in_flight, 3);
            assert_eq!(config.sync.network_timeout_secs, 9);
            Ok(())
        });
    }
}
