//! Pipeline configuration
//!
//! Everything outside the core that has a knob: where raw data comes from,
//! where it is cached, and how reports are rendered. The core derivation
//! takes no configuration.

use crate::error::ComputeError;
use crate::report::ReportConfig;
use crate::source::{CachedSource, HttpSource, DEFAULT_CACHE_FILE, DEFAULT_DATA_URL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration, loadable from JSON. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Remote location of the raw CSV
    pub url: String,
    /// Local cache file for the downloaded CSV
    pub cache_path: PathBuf,
    pub report: ReportConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATA_URL.to_string(),
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            report: ReportConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: PipelineConfig = serde_json::from_str(json)
            .map_err(|e| ComputeError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let json = fs::read_to_string(path).map_err(|e| {
            ComputeError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ComputeError::ConfigError(format!(
                "url must be http(s): {}",
                self.url
            )));
        }
        if self.cache_path.as_os_str().is_empty() {
            return Err(ComputeError::ConfigError("cache_path is empty".to_string()));
        }
        if self.report.wrap_width == 0 {
            return Err(ComputeError::ConfigError(
                "report.wrap_width must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Remote source behind the configured cache file
    pub fn cached_source(&self) -> CachedSource<HttpSource> {
        CachedSource::new(HttpSource::new(self.url.clone()), self.cache_path.clone())
    }
}
