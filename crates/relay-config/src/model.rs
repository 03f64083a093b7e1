// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Relay streaming layer.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Relay configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Event log retention settings.
    #[serde(default)]
    pub event_log: EventLogConfig,

    /// Job metadata and cancellation settings.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Subscriber delivery settings.
    #[serde(default)]
    pub subscribe: SubscribeConfig,

    /// Durable conversation store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Generation provider settings.
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the gateway to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the gateway to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// How often the background sweeper drops expired logs and records.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl ServerConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3080
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Event log retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventLogConfig {
    /// Approximate number of latest entries kept per job.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Seconds a job's log is retained after its last append.
    #[serde(default = "default_retention_secs")]
    pub ttl_secs: u64,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_retention_secs(),
        }
    }
}

impl EventLogConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_max_entries() -> usize {
    1000
}

fn default_retention_secs() -> u64 {
    3600
}

/// Job metadata and cancellation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    /// Seconds a job record is retained after its last update.
    #[serde(default = "default_retention_secs")]
    pub metadata_ttl_secs: u64,

    /// Seconds a cancellation request stays visible to the producer.
    #[serde(default = "default_cancellation_ttl_secs")]
    pub cancellation_ttl_secs: u64,

    /// Interval at which the producer polls for cancellation.
    #[serde(default = "default_cancel_poll_ms")]
    pub cancel_poll_interval_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            metadata_ttl_secs: default_retention_secs(),
            cancellation_ttl_secs: default_cancellation_ttl_secs(),
            cancel_poll_interval_ms: default_cancel_poll_ms(),
        }
    }
}

impl JobsConfig {
    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata_ttl_secs)
    }

    pub fn cancellation_ttl(&self) -> Duration {
        Duration::from_secs(self.cancellation_ttl_secs)
    }

    pub fn cancel_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cancel_poll_interval_ms)
    }
}

fn default_cancellation_ttl_secs() -> u64 {
    60
}

fn default_cancel_poll_ms() -> u64 {
    500
}

/// Subscriber delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubscribeConfig {
    /// Interval between live-tail polls.
    #[serde(default = "default_subscribe_poll_ms")]
    pub poll_interval_ms: u64,

    /// Maximum entries fetched per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// SSE keep-alive comment interval.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl Default for SubscribeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_subscribe_poll_ms(),
            batch_size: default_batch_size(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl SubscribeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

fn default_subscribe_poll_ms() -> u64 {
    100
}

fn default_batch_size() -> usize {
    100
}

fn default_keep_alive_secs() -> u64 {
    15
}

/// Durable conversation store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("relay").join("relay.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("relay.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Generation provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Provider backend. `echo` replays the user's message; `none` disables `/stream/start`.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name recorded on jobs that do not specify one.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Delay between fragments emitted by the echo provider.
    #[serde(default = "default_echo_delay_ms")]
    pub echo_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            default_model: default_model(),
            echo_delay_ms: default_echo_delay_ms(),
        }
    }
}

fn default_provider() -> String {
    "echo".to_string()
}

fn default_model() -> String {
    "echo-1".to_string()
}

fn default_echo_delay_ms() -> u64 {
    50
}
