use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Pattern;
use crate::utils::can_access_file;

/// Settings decoded from the configuration file. Read-only once loaded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(rename = "Logging", alias = "logging", default)]
    pub logging: String,
    #[serde(rename = "Log_file", alias = "log_file", default)]
    pub log_file: String,
    #[serde(rename = "Files", alias = "files", default)]
    pub files: Vec<String>,
    #[serde(rename = "Regex", alias = "regex", default)]
    pub patterns: Vec<Pattern>,
}

impl Config {
    /// Checks the path is readable, then decodes it as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        can_access_file(path)?;

        let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            path = %path.display(),
            files = config.files.len(),
            patterns = config.patterns.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
impl Config {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_logging(mut self, logging: &str) -> Self {
        self.logging = logging.to_string();
        self
    }

    pub fn with_log_file(mut self, log_file: &str) -> Self {
        self.log_file = log_file.to_string();
        self
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.files.push(path.to_string());
        self
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }
}
