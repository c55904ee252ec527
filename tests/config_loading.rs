// tests/config_loading.rs
//! Configuration files feeding the decoder and engine

use std::io::Write;
use strobe_core::config::{ConfigError, ConfigLoader, SystemConfig};
use strobe_core::protocol::PacketDecoder;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn isolated_loader(file: &NamedTempFile) -> ConfigLoader {
    ConfigLoader::with_paths(vec![file.path().to_path_buf()]).with_env_prefix("STROBE_CONFIG_IT_")
}

#[test]
fn test_geometry_from_file_drives_decoder() {
    let file = write_config(
        r#"
[link]
channel_count = 4
read_timeout_ms = 250

[engine]
max_errors = 3
"#,
    );

    let config = isolated_loader(&file).load().unwrap();
    assert_eq!(config.link.channel_count, 4);
    assert_eq!(config.link.bytes_per_channel, 20);
    assert_eq!(config.engine.max_errors, 3);
    assert_eq!(config.engine.retry_error_count(), 1);

    let decoder = PacketDecoder::new(&config.link);
    assert_eq!(decoder.packet_size(), 80);
    let sample = decoder.decode(&decoder.frame(vec![0u8; 80]).unwrap());
    assert_eq!(sample.left.len(), 4);
}

#[test]
fn test_invalid_geometry_rejected() {
    let file = write_config(
        r#"
[link]
bytes_per_channel = 4
"#,
    );

    match isolated_loader(&file).load() {
        Err(ConfigError::Invalid(errors)) => assert!(!errors.is_empty()),
        other => panic!("Expected validation failure, got {:?}", other),
    }
}

#[test]
fn test_export_then_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strobe.toml");

    let mut config = SystemConfig::default();
    config.synthetic.interval_ms = 250;
    config.link.write_timeout_ms = 1000;
    ConfigLoader::export_config(&config, &path).unwrap();

    let loaded = ConfigLoader::with_paths(vec![path])
        .with_env_prefix("STROBE_CONFIG_IT_")
        .load()
        .unwrap();
    assert_eq!(loaded, config);
}
