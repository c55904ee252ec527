// src/config/loader.rs
//! Layered configuration loader
//!
//! Defaults, then each existing file in discovery order, then `STROBE_` environment
//! overrides. The merged document is validated before it is handed out.

use crate::config::{constants::paths, SystemConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration validation errors: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl ConfigLoader {
    /// Create loader over the standard search paths
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths
    pub fn with_paths(config_paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths,
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    /// Append a path that takes precedence over every path already registered
    pub fn add_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_paths.push(path.into());
        self
    }

    /// Override the environment variable prefix
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate the system configuration
    pub fn load(&self) -> Result<SystemConfig, ConfigError> {
        let mut merged = toml::Value::try_from(SystemConfig::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        for config_path in &self.config_paths {
            match Self::load_config_file(config_path) {
                Ok(file_config) => {
                    debug!(path = %config_path.display(), "merging configuration file");
                    merge_toml_values(&mut merged, file_config);
                }
                Err(ConfigError::FileNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        self.apply_environment_overrides(&mut merged, std::env::vars());

        let config: SystemConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(format!("Failed to deserialize config: {}", e)))?;

        config.validate().map_err(ConfigError::Invalid)?;

        info!(
            channels = config.link.channel_count,
            packet_size = config.link.packet_size(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Validate a single file without merging it
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<SystemConfig, ConfigError> {
        let value = Self::load_config_file(path)?;
        let config: SystemConfig = value.try_into()?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Write a configuration out as pretty TOML
    pub fn export_config<P: AsRef<Path>>(config: &SystemConfig, path: P) -> Result<(), ConfigError> {
        let toml_content =
            toml::to_string_pretty(config).map_err(|e| ConfigError::Parse(e.to_string()))?;

        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_config_file<P: AsRef<Path>>(path: P) -> Result<toml::Value, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: toml::Value = toml::from_str(&content)?;

        Ok(config)
    }

    /// `STROBE_LINK__READ_TIMEOUT_MS=250` sets `link.read_timeout_ms`
    fn apply_environment_overrides<I>(&self, config: &mut toml::Value, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix(&self.env_prefix) else {
                continue;
            };
            let Some((section, field)) = stripped.split_once(paths::ENV_SECTION_SEPARATOR) else {
                continue;
            };

            let section = section.to_lowercase();
            let field = field.to_lowercase();
            debug!(section = %section, field = %field, "applying environment override");
            set_nested_value(config, &section, &field, parse_env_value(&value));
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut search_paths = vec![PathBuf::from(paths::SYSTEM_CONFIG_PATH)];

        if let Some(home_dir) = dirs::home_dir() {
            search_paths.push(home_dir.join(paths::USER_CONFIG_DIR).join("config.toml"));
        }

        // Local configurations (in order of precedence)
        search_paths.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        search_paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));

        search_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, section: &str, field: &str, value: toml::Value) {
    if let toml::Value::Table(root) = config {
        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        if let toml::Value::Table(table) = entry {
            table.insert(field.to_string(), value);
        }
    }
}

// Cross-platform directory discovery
mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("USERPROFILE").map(PathBuf::from)
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var_os("HOME").map(PathBuf::from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn isolated_loader(paths: Vec<PathBuf>) -> ConfigLoader {
        ConfigLoader::with_paths(paths).with_env_prefix("STROBE_LOADER_TEST_")
    }

    #[test]
    fn test_config_loader_creation() {
        let loader = ConfigLoader::new();
        assert!(!loader.config_paths().is_empty());
    }

    #[test]
    fn test_load_defaults_when_no_files_exist() {
        let loader = isolated_loader(vec![PathBuf::from("/nonexistent/strobe.toml")]);
        let config = loader.load().unwrap();
        assert_eq!(config, SystemConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[link]
channel_count = 4
read_timeout_ms = 250

[engine]
max_errors = 7
        "#
        )
        .unwrap();

        let loader = isolated_loader(vec![temp_file.path().to_path_buf()]);
        let config = loader.load().unwrap();

        assert_eq!(config.link.channel_count, 4);
        assert_eq!(config.link.read_timeout_ms, 250);
        assert_eq!(config.link.bytes_per_channel, crate::config::device::DEFAULT_BYTES_PER_CHANNEL);
        assert_eq!(config.engine.max_errors, 7);
    }

    #[test]
    fn test_later_files_take_precedence() {
        let mut first = NamedTempFile::new().unwrap();
        writeln!(first, "[engine]\nmax_errors = 3\nfault_backoff_ms = 100").unwrap();
        let mut second = NamedTempFile::new().unwrap();
        writeln!(second, "[engine]\nmax_errors = 9").unwrap();

        let loader = isolated_loader(vec![first.path().to_path_buf()]).add_path(second.path());
        let config = loader.load().unwrap();

        assert_eq!(config.engine.max_errors, 9);
        assert_eq!(config.engine.fault_backoff_ms, 100);
    }

    #[test]
    fn test_invalid_config_validation() {
        let loader = isolated_loader(Vec::new());

        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[link]\nbytes_per_channel = 4").unwrap();

        let result = loader.validate_config_file(temp_file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[link\nchannel_count = ").unwrap();

        let loader = isolated_loader(vec![temp_file.path().to_path_buf()]);
        assert!(matches!(loader.load(), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_environment_override_parsing() {
        let loader = isolated_loader(Vec::new());
        let mut merged = toml::Value::try_from(SystemConfig::default()).unwrap();

        loader.apply_environment_overrides(
            &mut merged,
            vec![
                ("STROBE_LOADER_TEST_LINK__READ_TIMEOUT_MS".to_string(), "750".to_string()),
                ("STROBE_LOADER_TEST_SYNTHETIC__LEFT_THRESHOLD".to_string(), "1500.5".to_string()),
                ("STROBE_LOADER_TEST_NOSECTION".to_string(), "1".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ],
        );

        let config: SystemConfig = merged.try_into().unwrap();
        assert_eq!(config.link.read_timeout_ms, 750);
        assert_eq!(config.synthetic.left_threshold, 1500.5);
    }

    #[test]
    #[serial]
    fn test_environment_override_from_process() {
        unsafe {
            std::env::set_var("STROBE_PROCESS_TEST_ENGINE__MAX_ERRORS", "11");
        }

        let config = ConfigLoader::with_paths(Vec::new())
            .with_env_prefix("STROBE_PROCESS_TEST_")
            .load();

        unsafe {
            std::env::remove_var("STROBE_PROCESS_TEST_ENGINE__MAX_ERRORS");
        }

        assert_eq!(config.unwrap().engine.max_errors, 11);
    }

    #[test]
    fn test_config_export() {
        let temp_file = NamedTempFile::new().unwrap();

        ConfigLoader::export_config(&SystemConfig::default(), temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("[link]"));
        assert!(content.contains("[engine]"));

        let reloaded = isolated_loader(Vec::new()).validate_config_file(temp_file.path()).unwrap();
        assert_eq!(reloaded, SystemConfig::default());
    }
}
