// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./relay.toml` > `~/.config/relay/relay.toml` > `/etc/relay/relay.toml`
//! with environment variable overrides via `RELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RelayConfig;

/// Section names, longest first so `event_log_*` never matches `log_*`.
const SECTIONS: &[&str] = &[
    "generation",
    "event_log",
    "subscribe",
    "storage",
    "server",
    "jobs",
    "log",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/relay/relay.toml` (system-wide)
/// 3. `~/.config/relay/relay.toml` (user XDG config)
/// 4. `./relay.toml` (local directory)
/// 5. `RELAY_*` environment variables
pub fn load_config() -> Result<RelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file("/etc/relay/relay.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("relay/relay.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("relay.toml"))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
///
/// `event_log_max_entries` -> `event_log.max_entries`. Keys without a known
/// section prefix are passed through unchanged (and rejected by
/// `deny_unknown_fields`).
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because both section and
/// key names contain underscores.
fn env_provider() -> Env {
    // figment strips the prefix but keeps the variable's original case.
    Env::prefixed("RELAY_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}
