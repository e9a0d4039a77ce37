// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use qrscan::decoder::{DecodeEffort, Symbology};
use qrscan::{ConfigError, ScanConfig};

#[test]
fn test_config_default() {
    // Test that default config can be created
    let config = ScanConfig::default();

    // Check sensible defaults
    assert!(!config.continuous, "Single-shot should be the default");
    assert_eq!(config.decoder.formats, vec![Symbology::QrCode]);
    assert!(config.decoder.auto_rotate);
    assert_eq!(config.decoder.effort, DecodeEffort::Thorough);
    assert_eq!(config.decode_timeout(), None);
}

#[test]
fn test_config_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = ScanConfig {
        continuous: true,
        interval_ms: 100,
        device_path: Some("/dev/video2".to_string()),
        decode_timeout_ms: Some(500),
        ..Default::default()
    };
    config.save(&path).unwrap();

    let loaded = ScanConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_load_rejects_invalid_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "framerate": 0 }"#).unwrap();

    assert_eq!(ScanConfig::load(&path), Err(ConfigError::ZeroFramerate));
}

#[test]
fn test_config_load_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(matches!(ScanConfig::load(&path), Err(ConfigError::Parse(_))));
}

#[test]
fn test_config_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = ScanConfig::load(&dir.path().join("absent.json"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_config_empty_symbologies_rejected() {
    let config: ScanConfig =
        serde_json::from_str(r#"{ "decoder": { "formats": [] } }"#).unwrap();
    assert_eq!(config.validate(), Err(ConfigError::EmptySymbologies));
}

#[test]
fn test_config_decoder_effort_from_json() {
    let config: ScanConfig =
        serde_json::from_str(r#"{ "decoder": { "effort": "Fast", "auto_rotate": false } }"#)
            .unwrap();
    assert_eq!(config.decoder.effort, DecodeEffort::Fast);
    assert!(!config.decoder.auto_rotate);
    assert_eq!(config.decoder.formats, vec![Symbology::QrCode]);
}

#[test]
fn test_config_zero_decode_timeout_rejected() {
    let config = ScanConfig {
        decode_timeout_ms: Some(0),
        ..Default::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::ZeroDecodeTimeout));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "decode_timeout_ms": 0 }"#).unwrap();
    assert_eq!(ScanConfig::load(&path), Err(ConfigError::ZeroDecodeTimeout));

    let config = ScanConfig {
        decode_timeout_ms: Some(1),
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}
