// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::SharesyncConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of failing on the first one.
pub fn validate_config(config: &SharesyncConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.engine.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.log_level `{}` must be one of {}",
                config.engine.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if let Some(user) = &config.engine.user_identifier
        && user.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "engine.user_identifier must not be empty when set".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let caps = [
        ("fetch_max_in_flight", config.pipeline.fetch_max_in_flight),
        ("encrypt_max_in_flight", config.pipeline.encrypt_max_in_flight),
        ("upload_max_in_flight", config.pipeline.upload_max_in_flight),
        ("share_max_in_flight", config.pipeline.share_max_in_flight),
    ];
    for (key, value) in caps {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("pipeline.{key} must be at least 1"),
            });
        }
    }

    if config.pipeline.scheduler_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "pipeline.scheduler_interval_ms must be positive".to_string(),
        });
    }

    if config.sync.network_timeout_secs == 0 || config.sync.local_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "sync timeouts must be positive, got network={} local={}",
                config.sync.network_timeout_secs, config.sync.local_timeout_secs
            ),
        });
    }

    if config.sync.interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.interval_secs must be positive".to_string(),
        });
    }

    if config.download.failed_attempts_threshold == 0 {
        errors.push(ConfigError::Validation {
            message: "download.failed_attempts_threshold must be at least 1".to_string(),
        });
    }

    if config.download.interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "download.interval_secs must be positive".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
