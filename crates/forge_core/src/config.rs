use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// ---------------------------------------------------------------------------
// Explorer API keys
// ---------------------------------------------------------------------------

/// Environment variables that may carry a block-explorer API key.
pub const EXPLORER_KEY_VARS: [&str; 6] = [
    "ETHERSCAN_API_KEY",
    "ARBISCAN_API_KEY",
    "SNOWTRACE_API_KEY",
    "POLYGONSCAN_API_KEY",
    "BSCSCAN_API_KEY",
    "OPTIMISM_API_KEY",
];

/// Explorer API keys, indexed by the environment variable they came from.
///
/// Keys are never persisted to `config.json`; they are read from the process
/// environment each time the config is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorerApiKeys {
    keys: BTreeMap<String, String>,
}

impl ExplorerApiKeys {
    /// Collect every non-empty key listed in [`EXPLORER_KEY_VARS`].
    pub fn from_env() -> Self {
        let keys = EXPLORER_KEY_VARS
            .iter()
            .filter_map(|var| match std::env::var(var) {
                Ok(value) if !value.trim().is_empty() => Some((var.to_string(), value)),
                _ => None,
            })
            .collect();
        Self { keys }
    }

    /// Insert or replace a key by variable name.
    pub fn set(&mut self, var: impl Into<String>, key: impl Into<String>) {
        self.keys.insert(var.into(), key.into());
    }

    /// Look up a key. Missing keys resolve to an empty string, which the
    /// explorers accept with heavy rate limiting.
    pub fn get(&self, var: &str) -> &str {
        self.keys.get(var).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ForgeConfig
// ---------------------------------------------------------------------------

/// Application configuration stored at `~/.tokenforge/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    #[serde(skip)]
    pub explorer_api_keys: ExplorerApiKeys,

    // Compiler service
    pub compiler_url: String,
    pub request_timeout_secs: u64,

    // Deployment
    pub confirmations: u64,

    // Verification
    pub settle_delay_secs: u64,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,

    // General
    /// Tracing filter used when `RUST_LOG` is unset, e.g. `info` or
    /// `info,forge_token=debug`.
    pub log_level: String,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            explorer_api_keys: ExplorerApiKeys::default(),
            compiler_url: "http://localhost:3001".into(),
            request_timeout_secs: 30,
            confirmations: 2,
            settle_delay_secs: 30,
            poll_interval_secs: 5,
            max_poll_attempts: 10,
            log_level: "info".into(),
        }
    }
}

impl ForgeConfig {
    /// Returns the base config directory: `~/.tokenforge/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".tokenforge"))
    }

    /// Returns the config file path: `~/.tokenforge/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.tokenforge/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        for dir in [Self::base_dir()?, Self::logs_dir()?] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk, or creates the default file if missing.
    /// Explorer API keys are filled in from the environment.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self =
                serde_json::from_str(&content).with_context(|| "Failed to parse config.json")?;
            info!("Loaded config from {}", path.display());
            config
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            config
        };
        config.explorer_api_keys = ExplorerApiKeys::from_env();
        Ok(config)
    }

    /// Save config to a specific file path (API keys are excluded).
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
