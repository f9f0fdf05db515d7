use crate::filter::DEFAULT_EXCLUDES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables and locations for one triage pipeline.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directories watched recursively.
    pub roots: Vec<PathBuf>,
    /// Include globs; empty accepts everything.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub batch_size: usize,
    pub batch_interval_ms: u64,
    pub rate_limit_per_minute: u32,
    pub dedup_window_ms: u64,
    pub hash_timeout_ms: u64,
    /// Delay before the single retry of a failed quarantine or report write.
    pub retry_delay_ms: u64,
    pub auto_quarantine: bool,
    pub quarantine_dir: PathBuf,
    pub incident_db: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let base = data_dir();
        PipelineConfig {
            roots: Vec::new(),
            include: Vec::new(),
            exclude: DEFAULT_EXCLUDES.iter().map(|p| (*p).to_owned()).collect(),
            batch_size: 10,
            batch_interval_ms: 5_000,
            rate_limit_per_minute: 1_000,
            dedup_window_ms: 300_000,
            hash_timeout_ms: 10_000,
            retry_delay_ms: 500,
            auto_quarantine: true,
            quarantine_dir: base.join("quarantine"),
            incident_db: base.join("incidents.db"),
        }
    }
}

impl PipelineConfig {
    /// Loads a JSON config file and validates it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.rate_limit_per_minute == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit_per_minute must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("batch_interval_ms", self.batch_interval_ms),
            ("dedup_window_ms", self.dedup_window_ms),
            ("hash_timeout_ms", self.hash_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn hash_timeout(&self) -> Duration {
        Duration::from_millis(self.hash_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// `<local data dir>/vigil`, or the temp dir when the platform has none.
fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("vigil")
}
