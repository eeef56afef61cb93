use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{NvError, NvResult};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NvConfig {
    pub storage: StorageConfig,
    pub vault: VaultConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend: "fs" or "memory"
    pub backend: String,
    /// Root directory for the fs backend
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// PBKDF2 iterations for the passphrase KEK (default: 250000)
    pub pass_iterations: u32,
    /// PBKDF2 iterations for the recovery KEK (default: 250000)
    pub recovery_iterations: u32,
    /// Random bytes behind a generated recovery key (default: 24)
    pub recovery_key_bytes: usize,
    /// Optimistic "a vault exists" hint file
    pub marker_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "fs".into(),
            root: PathBuf::from("~/.local/share/notevault/store"),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            pass_iterations: 250_000,
            recovery_iterations: 250_000,
            recovery_key_bytes: 24,
            marker_file: Some(PathBuf::from("~/.local/share/notevault/has-vault")),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl NvConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml(content: &str) -> NvResult<Self> {
        let config: NvConfig =
            toml::from_str(content).map_err(|e| NvError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> NvResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| NvError::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> NvResult<()> {
        if self.vault.pass_iterations == 0 || self.vault.recovery_iterations == 0 {
            return Err(NvError::Config(
                "vault iteration counts must be at least 1".into(),
            ));
        }
        if self.vault.recovery_key_bytes < 16 {
            return Err(NvError::Config(
                "vault.recovery_key_bytes must be at least 16".into(),
            ));
        }
        match self.storage.backend.as_str() {
            "fs" | "memory" => Ok(()),
            other => Err(NvError::Config(format!(
                "unknown storage backend {other:?} (expected \"fs\" or \"memory\")"
            ))),
        }
    }
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}
