//! Configuration resolution tests for aims-gen
//!
//! Priority: CLI → ENV → TOML → built-in default
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Every test parses `Args`, which reads the environment, so all of them
//! are marked with #[serial].

use std::io::Write;
use std::path::PathBuf;

use aims_common::config::TomlConfig;
use aims_gen::config::{Args, ServiceConfig};
use clap::Parser;
use serial_test::serial;
use tempfile::NamedTempFile;

const ENV_VARS: &[&str] = &[
    "PORT",
    "AIMS_HOST",
    "AIMS_CONFIG",
    "AIMS_OUTPUT_DIR",
    "CORS_ORIGINS",
    "AIMS_MUSIC_ENDPOINT",
    "AIMS_CAPTION_ENDPOINT",
    "AIMS_LOG_LEVEL",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

fn write_toml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_defaults_without_args_or_toml() {
    clear_env();
    let args = Args::try_parse_from(["aims-gen"]).unwrap();
    let config = ServiceConfig::from_parts(args, TomlConfig::default());

    assert_eq!(config.port, 5000);
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.bind_address(), "0.0.0.0:5000");
    assert_eq!(config.output_dir, PathBuf::from("generated_music"));
    assert_eq!(
        config.cors_origins,
        vec!["http://localhost:3000", "http://127.0.0.1:3000"]
    );
    assert_eq!(config.log_level, "info");
    assert_eq!(config.generation.max_duration_secs, 30.0);
    assert!(config.music_backend.endpoint.is_none());
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    std::env::set_var("PORT", "8080");
    std::env::set_var("CORS_ORIGINS", "https://music.example, https://app.example");
    std::env::set_var("AIMS_MUSIC_ENDPOINT", "http://gpu-box:9000");

    let args = Args::try_parse_from(["aims-gen"]).unwrap();
    let toml = TomlConfig {
        port: 7000,
        ..TomlConfig::default()
    };
    let config = ServiceConfig::from_parts(args, toml);

    assert_eq!(config.port, 8080);
    assert_eq!(
        config.cors_origins,
        vec!["https://music.example", "https://app.example"]
    );
    assert_eq!(
        config.music_backend.endpoint.as_deref(),
        Some("http://gpu-box:9000")
    );

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    std::env::set_var("PORT", "8080");
    std::env::set_var("AIMS_LOG_LEVEL", "warn");

    let args =
        Args::try_parse_from(["aims-gen", "--port", "9090", "--log-level", "debug"]).unwrap();
    let config = ServiceConfig::from_parts(args, TomlConfig::default());

    assert_eq!(config.port, 9090);
    assert_eq!(config.log_level, "debug");

    clear_env();
}

#[test]
#[serial]
fn test_toml_used_when_cli_and_env_unset() {
    clear_env();
    let file = write_toml(
        r#"
port = 6100
output_dir = "/var/lib/aims/out"

[generation]
max_duration_secs = 20.0

[music_backend]
endpoint = "http://localhost:9000"
timeout_secs = 60
device = "cuda"
"#,
    );

    let config_path = file.path().to_str().unwrap();
    let args = Args::try_parse_from(["aims-gen", "--config", config_path]).unwrap();
    let config = ServiceConfig::resolve(args).unwrap();

    assert_eq!(config.port, 6100);
    assert_eq!(config.output_dir, PathBuf::from("/var/lib/aims/out"));
    assert_eq!(config.generation.max_duration_secs, 20.0);
    assert_eq!(config.generation.default_duration_secs, 10.0);
    assert_eq!(config.music_backend.timeout_secs, 60);
    assert_eq!(config.music_backend.device.as_deref(), Some("cuda"));
    // Caption backend keeps its defaults
    assert!(config.caption_backend.endpoint.is_none());
    assert_eq!(config.caption_backend.timeout_secs, 300);
}

#[test]
#[serial]
fn test_cli_endpoint_keeps_toml_backend_settings() {
    clear_env();
    let file = write_toml(
        r#"
[caption_backend]
endpoint = "http://old-host:9001"
timeout_secs = 15
"#,
    );

    let args = Args::try_parse_from([
        "aims-gen",
        "-c",
        file.path().to_str().unwrap(),
        "--caption-endpoint",
        "http://new-host:9001",
    ])
    .unwrap();
    let config = ServiceConfig::resolve(args).unwrap();

    assert_eq!(
        config.caption_backend.endpoint.as_deref(),
        Some("http://new-host:9001")
    );
    assert_eq!(config.caption_backend.timeout_secs, 15);
}

#[test]
#[serial]
fn test_explicit_missing_config_is_error() {
    clear_env();
    let args =
        Args::try_parse_from(["aims-gen", "--config", "/nonexistent/aims-gen.toml"]).unwrap();
    assert!(ServiceConfig::resolve(args).is_err());
}

#[test]
#[serial]
fn test_invalid_port_rejected_by_parser() {
    clear_env();
    assert!(Args::try_parse_from(["aims-gen", "--port", "not-a-port"]).is_err());
    assert!(Args::try_parse_from(["aims-gen", "--port", "70000"]).is_err());
}
