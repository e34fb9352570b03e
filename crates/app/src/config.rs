use schedc_categorize::OpenRouterConfig;
use schedc_core::DeductionRates;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.toml";
pub const DATABASE_FILE: &str = "ledger.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not determine the application directories")]
    NoAppDirs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageSection,
    pub rates: DeductionRates,
    pub classifier: ClassifierSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Database file. Defaults to `ledger.db` in the platform data dir.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        let defaults = OpenRouterConfig::default();
        Self {
            endpoint: defaults.endpoint,
            model: defaults.model,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "schedc", "schedc")
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// An explicit path must exist. Without one, the platform config file
    /// is used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match project_dirs() {
                Some(dirs) => {
                    let p = dirs.config_dir().join(CONFIG_FILE);
                    if !p.exists() {
                        tracing::debug!(path = %p.display(), "No config file, using defaults");
                        return Ok(Self::default());
                    }
                    p
                }
                None => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Self::from_toml(&content)
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        let dirs = project_dirs().ok_or(ConfigError::NoAppDirs)?;
        Ok(dirs.data_dir().join(DATABASE_FILE))
    }

    pub fn openrouter(&self) -> OpenRouterConfig {
        OpenRouterConfig {
            endpoint: self.classifier.endpoint.clone(),
            model: self.classifier.model.clone(),
            timeout: Duration::from_secs(self.classifier.timeout_secs.max(1)),
        }
    }
}
