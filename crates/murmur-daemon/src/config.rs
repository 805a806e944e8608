//! Configuration file management.
//!
//! Read from `$MURMUR_DATA_DIR/config.toml` (or the platform default data
//! directory). Every field has a default; a missing file is not an error.

use std::path::PathBuf;

use murmur_signal::ExternalNullifier;
use murmur_types::{DEFAULT_ROOT_HISTORY, DEFAULT_TREE_DEPTH};
use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub round: RoundConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Membership registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Merkle tree depth (1..=32). Must match the key files.
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Number of recent roots accepted.
    #[serde(default = "default_root_history")]
    pub root_history: usize,
    /// Commitment list imported on first start. Empty = none.
    #[serde(default)]
    pub snapshot_path: String,
}

/// Initial round. `topic` wins over `number` when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundConfig {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub number: u64,
}

/// Circuit key configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Directory holding `signal_<depth>.vk`. Empty = `$data_dir/keys/`.
    #[serde(default)]
    pub dir: String,
    /// Generate throwaway keys when none are found. Development only.
    #[serde(default)]
    pub dev_setup: bool,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

fn default_depth() -> usize {
    DEFAULT_TREE_DEPTH
}

fn default_root_history() -> usize {
    DEFAULT_ROOT_HISTORY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            root_history: default_root_history(),
            snapshot_path: String::new(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl RoundConfig {
    pub fn external_nullifier(&self) -> ExternalNullifier {
        if self.topic.is_empty() {
            ExternalNullifier::from_round(self.number)
        } else {
            ExternalNullifier::from_topic(&self.topic)
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        if config.registry.depth == 0 || config.registry.depth > murmur_types::MAX_TREE_DEPTH {
            anyhow::bail!("registry.depth must be between 1 and 32, got {}", config.registry.depth);
        }
        Ok(config)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    pub fn keys_dir(&self) -> PathBuf {
        if self.keys.dir.is_empty() {
            self.data_dir().join("keys")
        } else {
            PathBuf::from(&self.keys.dir)
        }
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        (!self.registry.snapshot_path.is_empty())
            .then(|| PathBuf::from(&self.registry.snapshot_path))
    }

    pub fn socket_path(&self) -> PathBuf {
        self.data_dir().join("murmur.sock")
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("murmur.db")
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("MURMUR_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Murmur")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".murmur")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/murmur"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.registry.depth, 20);
        assert_eq!(config.registry.root_history, 32);
        assert!(config.snapshot_path().is_none());
        assert!(!config.keys.dev_setup);
        assert_eq!(config.advanced.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed = DaemonConfig::parse(&toml_str).expect("parse");
        assert_eq!(parsed.registry.depth, config.registry.depth);
    }

    #[test]
    fn test_partial_file() {
        let config = DaemonConfig::parse(
            r#"
            [registry]
            depth = 4
            snapshot_path = "/srv/identityCommitments.json"

            [round]
            topic = "greetings"

            [storage]
            data_dir = "/srv/murmur"
            "#,
        )
        .expect("parse");
        assert_eq!(config.registry.depth, 4);
        assert_eq!(config.registry.root_history, 32);
        assert_eq!(
            config.snapshot_path(),
            Some(PathBuf::from("/srv/identityCommitments.json"))
        );
        assert_eq!(config.keys_dir(), PathBuf::from("/srv/murmur/keys"));
        assert_eq!(config.socket_path(), PathBuf::from("/srv/murmur/murmur.sock"));
        assert_eq!(
            config.round.external_nullifier(),
            ExternalNullifier::from_topic("greetings")
        );
    }

    #[test]
    fn test_round_number() {
        let round = RoundConfig {
            topic: String::new(),
            number: 3,
        };
        assert_eq!(round.external_nullifier(), ExternalNullifier::from_round(3));
    }

    #[test]
    fn test_invalid_depth_rejected() {
        assert!(DaemonConfig::parse("[registry]\ndepth = 0").is_err());
        assert!(DaemonConfig::parse("[registry]\ndepth = 33").is_err());
    }
}
