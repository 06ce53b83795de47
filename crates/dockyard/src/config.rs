//! Configuration loading and types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "DOCKYARD_CONFIG";

/// Top-level configuration for dockyard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where machine records are kept
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
    /// Defaults for `dockyard provision`
    #[serde(default)]
    pub provision: ProvisionConfig,
}

/// Machine store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store root; records live under `<path>/machines`
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Provisioning defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Packages installed on every provision unless `--package` is given
    #[serde(default)]
    pub packages: Vec<String>,
}

fn default_storage_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".dockyard"))
        .unwrap_or_else(|| PathBuf::from(".dockyard"))
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("failed to read {}: {e}", path.display()))?;
        Self::parse(&content).map_err(|e| eyre::eyre!("invalid config {}: {e}", path.display()))
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this schema
    pub fn parse(content: &str) -> eyre::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from an explicit path, the environment, default paths, or use defaults
    ///
    /// An explicit path or `DOCKYARD_CONFIG` must exist; the default
    /// locations are only used when present.
    ///
    /// # Errors
    /// Returns error if the chosen file cannot be read or parsed
    pub fn load_default(explicit: Option<&Path>) -> eyre::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }

        for path in Self::search_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(&path);
            }
        }

        Ok(Config::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("dockyard.toml"),
            PathBuf::from("/etc/dockyard/dockyard.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("dockyard/dockyard.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Text);
        assert!(config.storage.path.ends_with(".dockyard"));
        assert!(config.provision.packages.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
[storage]
path = "/var/lib/dockyard"

[log]
level = "debug"
format = "json"

[provision]
packages = ["docker", "console"]
"#,
        )
        .unwrap();

        assert_eq!(config.storage.path, PathBuf::from("/var/lib/dockyard"));
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.provision.packages, vec!["docker", "console"]);
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let config = Config::parse("[log]\nformat = \"json\"\n").unwrap();

        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Config::parse("[log]\nformat = \"xml\"\n").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dockyard.toml");
        std::fs::write(&path, "[storage]\npath = \"/srv/machines\"\n").unwrap();

        let config = Config::load_default(Some(&path)).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/srv/machines"));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_default(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
