use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::EngineError;

/// Tuning for the contiguity-preserving rebalancer
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A site is over/under when it misses the target area by more than
    /// this fraction of the target
    pub balance_tolerance: f64,
    /// Hard cap on outer rebalancing iterations
    pub max_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: 0.05,
            max_iterations: 100,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.balance_tolerance > 0.0 && self.balance_tolerance < 1.0) {
            return Err(EngineError::InvalidConfig("balance_tolerance must be in (0, 1)"));
        }
        if self.max_iterations == 0 {
            return Err(EngineError::InvalidConfig("max_iterations must be at least 1"));
        }
        Ok(())
    }
}

/// Application settings, all optional in the JSON file
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the county and site data files
    pub data_dir: PathBuf,
    /// County polygons (GeoJSON FeatureCollection)
    pub counties_file: String,
    /// Site roster (JSON array)
    pub sites_file: String,
    /// State FIPS codes whose counties are left out of the game (Alaska by default)
    pub excluded_state_fips: Vec<u32>,
    pub log_file: PathBuf,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            counties_file: "us_counties.json".to_string(),
            sites_file: "teams.json".to_string(),
            excluded_state_fips: vec![2],
            log_file: PathBuf::from("county-conquest.log"),
            log_filter: "info".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let mut bytes = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&mut bytes).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(bytes: &mut [u8]) -> Result<Self> {
        let config: Self = simd_json::serde::from_slice(bytes)?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn counties_path(&self) -> PathBuf {
        self.data_dir.join(&self.counties_file)
    }

    pub fn sites_path(&self) -> PathBuf {
        self.data_dir.join(&self.sites_file)
    }
}
