//! Tunable engine constants.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::aggregate::validate_edges;
use crate::error::EngineError;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "STUDY_LENS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum score counted as a success (inclusive).
    pub success_threshold: f64,
    /// Attendance bin boundaries, strictly ascending.
    pub attendance_bin_edges: Vec<f64>,
    /// Rows in the top performers table.
    pub top_n: usize,
    /// Bins in the score distribution histogram.
    pub histogram_bins: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            success_threshold: 70.0,
            attendance_bin_edges: vec![60.0, 70.0, 80.0, 90.0],
            top_n: 10,
            histogram_bins: 30,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.success_threshold.is_finite() {
            return Err(EngineError::InvalidConfig(
                "success_threshold must be finite".into(),
            ));
        }
        validate_edges(&self.attendance_bin_edges)?;
        if self.top_n == 0 {
            return Err(EngineError::InvalidConfig("top_n must be at least 1".into()));
        }
        if self.histogram_bins == 0 {
            return Err(EngineError::InvalidConfig(
                "histogram_bins must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Read and validate a JSON config file. Missing keys take defaults.
    pub fn from_json_file(path: &Path) -> Result<EngineConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&text).context("parsing config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Config from [`CONFIG_ENV`] when set, else defaults.
    pub fn from_env() -> Result<EngineConfig> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_json_file(Path::new(&path)),
            None => Ok(EngineConfig::default()),
        }
    }
}
