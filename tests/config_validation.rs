//! Integration tests for configuration loading and validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use hexabus::config::{
    HexabusConfig, LoggingConfig, OverflowPolicy, ServerConfig, TransportConfig, HEXABUS_PORT,
};
use hexabus::HexabusError;
use std::time::Duration;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = HexabusConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_defaults_match_protocol_constants() {
    let config = HexabusConfig::default();
    assert_eq!(config.transport.response_timeout, Duration::from_secs(10));
    assert_eq!(config.transport.peer_queue_capacity, 32);
    assert_eq!(config.transport.queue_capacity, 128);
    assert!(config.server.bind_address.ends_with(&HEXABUS_PORT.to_string()));
    assert_eq!(config.server.overflow_policy, OverflowPolicy::DropOldest);
}

#[test]
fn test_invalid_transport_address() {
    let mut config = HexabusConfig::default();
    config.transport.bind_address = "not an address".to_string();

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Invalid Transport address")));
}

#[test]
fn test_empty_server_address() {
    let mut config = HexabusConfig::default();
    config.server.bind_address = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_zero_response_timeout() {
    let config = TransportConfig {
        response_timeout: Duration::ZERO,
        ..TransportConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Response timeout must be greater than 0")));
}

#[test]
fn test_peer_capacity_above_total() {
    let config = TransportConfig {
        peer_queue_capacity: 200,
        queue_capacity: 100,
        ..TransportConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("cannot exceed queue capacity")));
}

#[test]
fn test_zero_capacities() {
    let transport = TransportConfig {
        peer_queue_capacity: 0,
        queue_capacity: 0,
        ..TransportConfig::default()
    };
    assert_eq!(transport.validate().len(), 2);

    let server = ServerConfig {
        decode_queue_capacity: 0,
        listener_queue_capacity: 0,
        ..ServerConfig::default()
    };
    assert_eq!(server.validate().len(), 2);
}

#[test]
fn test_poll_interval_bounds() {
    let zero = ServerConfig {
        poll_interval: Duration::ZERO,
        ..ServerConfig::default()
    };
    assert!(zero
        .validate()
        .iter()
        .any(|e| e.contains("poll interval must be greater than 0")));

    let long = TransportConfig {
        poll_interval: Duration::from_secs(60),
        ..TransportConfig::default()
    };
    assert!(long
        .validate()
        .iter()
        .any(|e| e.contains("poll interval too long")));
}

#[test]
fn test_log_to_file_without_path() {
    let config = LoggingConfig {
        log_to_file: true,
        log_file_path: None,
        ..LoggingConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("log_file_path must be specified")));
}

#[test]
fn test_no_logging_outputs() {
    let config = LoggingConfig {
        log_to_console: false,
        log_to_file: false,
        ..LoggingConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("At least one logging output")));
}

#[test]
fn test_validate_strict_with_invalid_config() {
    let mut config = HexabusConfig::default();
    config.transport.queue_capacity = 0;
    config.logging.app_name = String::new();

    match config.validate_strict() {
        Err(HexabusError::ConfigError(msg)) => {
            assert!(msg.contains("Queue capacity"));
            assert!(msg.contains("Application name"));
        }
        other => panic!("Expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_from_toml_partial_sections() {
    let config = HexabusConfig::from_toml(
        r#"
        [transport]
        response_timeout = 2500

        [server]
        bind_address = "127.0.0.1:61616"
        overflow_policy = "disconnect"

        [logging]
        log_level = "debug"
        "#,
    )
    .expect("valid TOML");

    assert_eq!(config.transport.response_timeout, Duration::from_millis(2500));
    assert_eq!(config.transport.queue_capacity, 128);
    assert_eq!(config.server.overflow_policy, OverflowPolicy::Disconnect);
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.validate().is_empty());
}

#[test]
fn test_from_toml_rejects_bad_level() {
    let result = HexabusConfig::from_toml("[logging]\nlog_level = \"loud\"\n");
    assert!(matches!(result, Err(HexabusError::ConfigError(_))));
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hexabus.toml");

    let config = HexabusConfig::default_with_overrides(|c| {
        c.transport.poll_interval = Duration::from_millis(25);
        c.server.listener_queue_capacity = 8;
    });
    config.save_to_file(&path).unwrap();

    let loaded = HexabusConfig::from_file(&path).unwrap();
    assert_eq!(loaded.transport.poll_interval, Duration::from_millis(25));
    assert_eq!(loaded.server.listener_queue_capacity, 8);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = HexabusConfig::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(HexabusError::ConfigError(_))));
}

#[test]
fn test_example_config_parses() {
    let example = HexabusConfig::example_config();
    assert!(example.contains("[transport]"));
    let parsed = HexabusConfig::from_toml(&example).unwrap();
    assert!(parsed.validate().is_empty());
}
