// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Relay configuration system.

use relay_config::diagnostic::ConfigError;
use relay_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with every section deserializes successfully.
#[test]
fn full_toml_deserializes_into_relay_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
sweep_interval_secs = 30

[log]
level = "debug"

[event_log]
max_entries = 500
ttl_secs = 1800

[jobs]
metadata_ttl_secs = 7200
cancellation_ttl_secs = 30
cancel_poll_interval_ms = 250

[subscribe]
poll_interval_ms = 50
batch_size = 20
keep_alive_secs = 5

[storage]
database_path = "/tmp/relay-test.db"
wal_mode = false

[generation]
provider = "none"
default_model = "test-model"
echo_delay_ms = 0
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.event_log.max_entries, 500);
    assert_eq!(config.event_log.ttl_secs, 1800);
    assert_eq!(config.jobs.metadata_ttl_secs, 7200);
    assert_eq!(config.jobs.cancel_poll_interval_ms, 250);
    assert_eq!(config.subscribe.batch_size, 20);
    assert_eq!(config.storage.database_path, "/tmp/relay-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.generation.provider, "none");
}

/// An empty document yields the compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.server.port, 3080);
    assert_eq!(config.subscribe.poll_interval_ms, 100);
    assert_eq!(config.jobs.cancel_poll_interval_ms, 500);
}

/// A misspelled key produces an UnknownKey diagnostic with a suggestion.
#[test]
fn typo_produces_unknown_key_with_suggestion() {
    let toml = r#"
[event_log]
max_entrie = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "max_entrie" && s == "max_entries"
        )
    });
    assert!(found, "expected suggestion for max_entries, got: {errors:?}");
}

/// A value of the wrong type produces an InvalidType diagnostic.
#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[server]
port = "eighty"
"#;

    let errors = load_and_validate_str(toml).expect_err("string port should be rejected");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "got: {errors:?}"
    );
}

/// Semantically invalid values pass deserialization but fail validation.
#[test]
fn zero_batch_size_fails_validation() {
    let toml = r#"
[subscribe]
batch_size = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero batch should be rejected");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("batch_size"))
    ));
}

/// An explicit config path that does not exist is an error, not a silent default.
#[test]
fn explicit_missing_path_is_rejected() {
    let path = std::path::Path::new("/nonexistent/relay/relay.toml");
    let errors = load_and_validate_path(path).expect_err("missing file should be rejected");
    assert!(matches!(&errors[0], ConfigError::Other(msg) if msg.contains("does not exist")));
}

/// `RELAY_*` variables override file values through the validated entry point.
#[test]
fn env_overrides_apply_through_validated_path() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("relay.toml", "[server]\nport = 4000\n[event_log]\nmax_entries = 10\n")?;
        jail.set_env("RELAY_SERVER_PORT", "5000");
        jail.set_env("RELAY_EVENT_LOG_MAX_ENTRIES", "250");
        jail.set_env("RELAY_LOG_LEVEL", "debug");
        jail.set_env("RELAY_GENERATION_DEFAULT_MODEL", "env-model");

        let config = load_and_validate_path(std::path::Path::new("relay.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.event_log.max_entries, 250);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.generation.default_model, "env-model");
        Ok(())
    });
}

/// Oversized retention values are reported, not accepted or overflowed.
#[test]
fn oversized_ttls_fail_validation() {
    for toml in [
        "[jobs]\ncancellation_ttl_secs = 9223372036854775807\n",
        "[event_log]\nttl_secs = 9223372036854775807\n",
    ] {
        let errors = load_and_validate_str(toml).expect_err("huge TTL should be rejected");
        assert!(
            errors.iter().any(
                |e| matches!(e, ConfigError::Validation { message } if message.contains("at most"))
            ),
            "got: {errors:?}"
        );
    }
}
