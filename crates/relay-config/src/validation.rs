// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde cannot express, such as
//! non-zero intervals and a usable bind address.

use crate::diagnostic::ConfigError;
use crate::model::RelayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const PROVIDERS: &[&str] = &["echo", "none"];

/// Longest retention accepted for logs, job records and cancellation flags.
pub const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;
/// Longest accepted timer period, in milliseconds.
pub const MAX_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

/// Validate a deserialized configuration.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else {
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_ip && !is_hostname {
            errors.push(ConfigError::validation(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "log.level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.log.level
        )));
    }

    let non_zero = [
        ("server.sweep_interval_secs", config.server.sweep_interval_secs),
        ("event_log.max_entries", config.event_log.max_entries as u64),
        ("event_log.ttl_secs", config.event_log.ttl_secs),
        ("jobs.metadata_ttl_secs", config.jobs.metadata_ttl_secs),
        ("jobs.cancellation_ttl_secs", config.jobs.cancellation_ttl_secs),
        ("jobs.cancel_poll_interval_ms", config.jobs.cancel_poll_interval_ms),
        ("subscribe.poll_interval_ms", config.subscribe.poll_interval_ms),
        ("subscribe.batch_size", config.subscribe.batch_size as u64),
    ];
    for (key, value) in non_zero {
        if value == 0 {
            errors.push(ConfigError::validation(format!("{key} must be greater than 0")));
        }
    }

    let ttls = [
        ("event_log.ttl_secs", config.event_log.ttl_secs),
        ("jobs.metadata_ttl_secs", config.jobs.metadata_ttl_secs),
        ("jobs.cancellation_ttl_secs", config.jobs.cancellation_ttl_secs),
    ];
    for (key, value) in ttls {
        if value > MAX_TTL_SECS {
            errors.push(ConfigError::validation(format!(
                "{key} must be at most {MAX_TTL_SECS} (30 days), got {value}"
            )));
        }
    }

    let intervals_ms = [
        (
            "server.sweep_interval_secs",
            config.server.sweep_interval_secs.saturating_mul(1000),
        ),
        ("jobs.cancel_poll_interval_ms", config.jobs.cancel_poll_interval_ms),
        ("subscribe.poll_interval_ms", config.subscribe.poll_interval_ms),
        (
            "subscribe.keep_alive_secs",
            config.subscribe.keep_alive_secs.saturating_mul(1000),
        ),
    ];
    for (key, value) in intervals_ms {
        if value > MAX_INTERVAL_MS {
            errors.push(ConfigError::validation(format!("{key} must be at most one day")));
        }
    }

    // A cancellation flag that expires before the producer's next poll is never seen.
    if config.jobs.cancellation_ttl_secs.saturating_mul(1000) < config.jobs.cancel_poll_interval_ms {
        errors.push(ConfigError::validation(format!(
            "jobs.cancellation_ttl_secs ({}s) must outlast jobs.cancel_poll_interval_ms ({}ms)",
            config.jobs.cancellation_ttl_secs, config.jobs.cancel_poll_interval_ms
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation("storage.database_path must not be empty"));
    }

    if !PROVIDERS.contains(&config.generation.provider.as_str()) {
        errors.push(ConfigError::validation(format!(
            "generation.provider must be one of {}, got `{}`",
            PROVIDERS.join(", "),
            config.generation.provider
        )));
    }

    if config.generation.default_model.trim().is_empty() {
        errors.push(ConfigError::validation("generation.default_model must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
