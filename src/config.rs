use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// Sync-related constants
// =============================================================================

/// Default base URL of the official piece catalog
pub const DEFAULT_CATALOG_URL: &str = "https://cloud.activepieces.com/api";

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Default log filter when RUST_LOG is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Registry configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    pub log_level: String,
    pub sync: SyncConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            sync: SyncConfig::default(),
        }
    }
}

/// Official catalog sync configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Host release announced to the catalog; unset fetches every release
    pub release: Option<semver::Version>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_CATALOG_URL.to_string(),
            release: None,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Returns the path to the data directory for piece-registry.
/// Uses $XDG_DATA_HOME/piece-registry if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/piece-registry,
/// or ./piece-registry if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("pieces.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("piece-registry.log")
}

/// Returns the path to the default config file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("piece-registry")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn registry_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<RegistryConfig>(json!({
            "sync": {
                "enabled": false
            }
        }))
        .unwrap();

        assert!(!result.sync.enabled);
        assert_eq!(result.sync.base_url, DEFAULT_CATALOG_URL);
        assert_eq!(result.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn registry_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<RegistryConfig>(json!({
            "logLevel": "debug",
            "sync": {
                "enabled": true,
                "baseUrl": "http://localhost:3000",
                "release": "0.45.0"
            }
        }))
        .unwrap();

        assert_eq!(
            result,
            RegistryConfig {
                log_level: "debug".to_string(),
                sync: SyncConfig {
                    enabled: true,
                    base_url: "http://localhost:3000".to_string(),
                    release: Some(semver::Version::new(0, 45, 0)),
                }
            }
        );
    }

    #[test]
    fn load_returns_defaults_for_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = RegistryConfig::load(&temp_dir.path().join("missing.json")).unwrap();
        assert_eq!(result, RegistryConfig::default());
    }

    #[test]
    fn load_reports_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = RegistryConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"logLevel": "warn"}"#).unwrap();

        let result = RegistryConfig::load(&path).unwrap();
        assert_eq!(result.log_level, "warn");
        assert!(result.sync.enabled);
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/piece-registry"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/piece-registry"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./piece-registry"));
    }

    #[test]
    #[serial]
    fn db_path_follows_xdg_data_home() {
        let previous = std::env::var("XDG_DATA_HOME").ok();
        // SAFETY: serialized with every other test touching the environment
        unsafe { std::env::set_var("XDG_DATA_HOME", "/tmp/xdg-test") };

        let path = db_path();

        match previous {
            Some(value) => unsafe { std::env::set_var("XDG_DATA_HOME", value) },
            None => unsafe { std::env::remove_var("XDG_DATA_HOME") },
        }
        assert_eq!(path, PathBuf::from("/tmp/xdg-test/piece-registry/pieces.db"));
    }
}
