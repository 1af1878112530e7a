//! Integration tests for configuration sources.
//!
//! These tests verify that overrides loaded from TOML or the environment
//! merge with a URI exactly like programmatic ones.

use std::path::PathBuf;
use std::time::Duration;

use mongo_uri::prelude::*;
use mongo_uri::{init_logging, logging};
use pretty_assertions::assert_eq;

/// Test minimal configuration
#[test]
fn test_config_minimal() {
    let options = ClientOptions::from_toml_str(r#"appName = "worker""#).unwrap();
    assert_eq!(options.app_name.as_deref(), Some("worker"));
    assert_eq!(options.replica_set, None);
}

/// Test full configuration with all options
#[test]
fn test_config_full() {
    let config_str = r#"
        appName = "inventory"
        replicaSet = "rs0"
        heartbeatFrequencyMS = 1000
        serverSelectionTimeoutMS = 5000
        connectTimeoutMS = 2000
        maxPoolSize = 50
        tls = true
        tlsCAFile = "/etc/ssl/ca.pem"
        retryWrites = false
        readPreference = "secondaryPreferred"
        maxStalenessSeconds = 90

        [[compressors]]
        name = "zstd"

        [[compressors]]
        name = "zlib"
        level = 4

        [credential]
        username = "svc"
        password = "secret"
        mechanism = "SCRAM-SHA-256"
        source = "admin"
    "#;

    let options = ClientOptions::from_toml_str(config_str).expect("Failed to parse config");
    assert_eq!(options.heartbeat_frequency, Some(Duration::from_secs(1)));
    assert_eq!(options.max_staleness, Some(Duration::from_secs(90)));
    assert_eq!(options.tls_ca_file, Some(PathBuf::from("/etc/ssl/ca.pem")));
    assert_eq!(options.read_preference, Some(ReadPreference::SecondaryPreferred));
    options.validate().unwrap();

    let conn = ConnectionString::parse_with("mongodb://db1,db2/inventory", &options).unwrap();
    assert_eq!(conn.app_name(), Some("inventory"));
    assert_eq!(conn.replica_set(), Some("rs0"));
    assert_eq!(conn.server_selection_timeout(), Some(Duration::from_secs(5)));
    assert_eq!(conn.max_pool_size(), Some(50));
    assert!(conn.tls_enabled());
    assert_eq!(conn.retry_writes(), Some(false));
    assert_eq!(
        conn.compressors(),
        &[CompressorSpec::new("zstd"), CompressorSpec::zlib(4)]
    );
    let credential = conn.credential().unwrap();
    assert_eq!(credential.mechanism, Some(AuthMechanism::ScramSha256));
    assert!(!format!("{:?}", credential).contains("secret"));
}

/// Test that config errors are reported as invalid arguments
#[test]
fn test_config_errors() {
    let err = ClientOptions::from_toml_str("appName = 5").unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(err.to_string().starts_with("invalid argument: invalid client options:"));

    assert!(ClientOptions::from_toml_str("minPoolSize = 1").is_err());
    assert!(ClientOptions::from_toml_str("appName = ").is_err());
}

/// Test that values loaded from TOML are checked like URI values
#[test]
fn test_config_values_checked_on_merge() {
    let options = ClientOptions::from_toml_str("heartbeatFrequencyMS = 100").unwrap();
    let err = ConnectionString::parse_with("mongodb://a", &options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid argument: option 'heartbeatFrequencyMS' must be at least 500, got 100"
    );
    assert!(options.validate().is_err());

    let options = ClientOptions::from_toml_str("loadBalanced = true").unwrap();
    let err = ConnectionString::parse_with("mongodb://a/?replicaSet=xyz", &options).unwrap_err();
    assert_eq!(err.invalid_argument_kind(), Some(InvalidArgumentKind::Conflict));
}

/// Test the TOML rendering of a patch
#[test]
fn test_config_to_toml() {
    let options = ClientOptions::builder()
        .app_name("svc")
        .connect_timeout(Duration::from_millis(1500))
        .direct_connection(true)
        .build()
        .unwrap();
    let rendered = options.to_toml_string().unwrap();
    assert!(rendered.contains("appName = \"svc\""), "{rendered}");
    assert!(rendered.contains("connectTimeoutMS = 1500"), "{rendered}");
    assert!(!rendered.contains("replicaSet"), "{rendered}");
    assert_eq!(ClientOptions::from_toml_str(&rendered).unwrap(), options);
}

/// Test reading the URI from a missing environment variable
#[test]
fn test_from_env_missing() {
    let err = ConnectionString::from_env("MONGO_URI_INTEGRATION_UNSET").unwrap_err();
    assert_eq!(
        err.to_string(),
        "environment variable not found: MONGO_URI_INTEGRATION_UNSET"
    );
    assert!(!err.is_invalid_argument());
}

/// Test that logging setup never interferes with parsing
#[test]
fn test_logging_init_is_safe() {
    init_logging();
    logging::init_with_level("debug");
    assert!(["trace", "debug", "info", "warn", "error"].contains(&logging::log_level()));
    assert!(["json", "pretty", "compact"].contains(&logging::log_format()));
    assert!(ConnectionString::parse("mongodb://localhost").is_ok());
}
