use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CairnConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub clustering: ClusteringConfig,
    pub splash: SplashConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Expected embedding widths. Used for zero-vector substitution and for the
/// dimension check when a database is opened.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub semantic_dim: usize,
    pub emotional_dim: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClusteringConfig {
    pub algorithm: String,
    pub similarity_threshold: f64,
    pub embedding_type: String,
    pub min_cluster_size: usize,
    pub limit: usize,
    pub sort_by: String,
    /// Most recent memories loaded for a clustering run.
    pub max_memories: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SplashConfig {
    pub count: usize,
    pub mode: String,
    pub preview_chars: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_cairn_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            semantic_dim: 768,
            emotional_dim: 7,
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            algorithm: "hdbscan".into(),
            similarity_threshold: 0.675,
            embedding_type: "semantic".into(),
            min_cluster_size: 5,
            limit: 20,
            sort_by: "interestingness".into(),
            max_memories: 5000,
        }
    }
}

impl Default for SplashConfig {
    fn default() -> Self {
        Self {
            count: 5,
            mode: "semantic".into(),
            preview_chars: 100,
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `~/.cairn/`
pub fn default_cairn_dir() -> PathBuf {
    home_dir().join(".cairn")
}

/// Returns the default config file path: `~/.cairn/config.toml`
pub fn default_config_path() -> PathBuf {
    default_cairn_dir().join("config.toml")
}

impl CairnConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CairnConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (CAIRN_DB, CAIRN_LOG_LEVEL, CAIRN_ALGORITHM).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CAIRN_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("CAIRN_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("CAIRN_ALGORITHM") {
            self.clustering.algorithm = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}
