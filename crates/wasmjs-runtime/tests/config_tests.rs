//! Integration tests for runtime configuration.
//!
//! Tests validate:
//! - Defaults match the stock host (argv ["js"], empty env, exiting)
//! - Partial JSON keeps defaults for missing fields
//! - Invalid JSON and unknown stdio modes are rejected
//! - Configuration reaches the context

use wasmjs_runtime::{Context, RuntimeConfig, RuntimeError, StdioMode};

#[test]
fn test_defaults() {
    let config = RuntimeConfig::default();
    assert_eq!(config.argv, ["js"]);
    assert!(config.env.is_empty());
    assert!(config.exit_process);
    assert_eq!(config.stdio, StdioMode::Inherit);
}

#[test]
fn test_empty_object_is_default() {
    assert_eq!(RuntimeConfig::from_json("{}").unwrap(), RuntimeConfig::default());
}

#[test]
fn test_partial_json() {
    let config = RuntimeConfig::from_json(
        r#"{"exit_process": false, "stdio": "capture", "env": {"B": "2", "A": "1"}}"#,
    )
    .unwrap();
    assert_eq!(config.argv, ["js"]);
    assert!(!config.exit_process);
    assert_eq!(config.stdio, StdioMode::Capture);
    assert_eq!(config.env_strings(), ["A=1", "B=2"]);
}

#[test]
fn test_invalid_json_is_config_error() {
    let err = RuntimeConfig::from_json("{\"argv\": 3}").unwrap_err();
    assert!(matches!(err, RuntimeError::Config(_)));

    let err = RuntimeConfig::from_json("{\"stdio\": \"pipe\"}").unwrap_err();
    assert!(matches!(err, RuntimeError::Config(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = RuntimeConfig::from_path("/nonexistent/wasmjs.json").unwrap_err();
    assert!(matches!(err, RuntimeError::Io(_)));
}

#[test]
fn test_context_keeps_config() {
    let config = RuntimeConfig {
        argv: vec!["prog".to_string()],
        ..RuntimeConfig::default()
    };
    let ctx = Context::new(config.clone());
    assert_eq!(ctx.config(), &config);
}
