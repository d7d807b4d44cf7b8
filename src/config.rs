// ⚙️ Configuration - defaults for the form, index endpoint and server address
// Optional JSON file; every missing field falls back to the built-in value.

use crate::error::EstimatorError;
use crate::index_rate::DEFAULT_INDEX_ENDPOINT;
use crate::rates::{RateTable, DEFAULT_CATEGORY};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// UF value used until the user fetches or types one (CLP)
pub const DEFAULT_INDEX_RATE: f64 = 39428.0;
pub const DEFAULT_AREA_SQM: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// URL returning `{ serie: [ { valor } ] }`
    pub index_endpoint: String,
    pub default_category: String,
    pub default_area_sqm: f64,
    pub default_index_rate: f64,
    /// Bind address for `fee-server`
    pub server_addr: String,
    /// Address for quote requests (shown as a mailto link only)
    pub contact_email: String,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig {
            index_endpoint: DEFAULT_INDEX_ENDPOINT.to_string(),
            default_category: DEFAULT_CATEGORY.to_string(),
            default_area_sqm: DEFAULT_AREA_SQM,
            default_index_rate: DEFAULT_INDEX_RATE,
            server_addr: "0.0.0.0:3000".to_string(),
            contact_email: "contacto@jovandocid.com".to_string(),
        }
    }
}

impl EstimatorConfig {
    /// Load config from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: EstimatorConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    /// File config when a path is given, built-in defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !RateTable::builtin().contains(&self.default_category) {
            return Err(EstimatorError::UnknownCategory(self.default_category.clone()))
                .context("Invalid default_category in config");
        }
        Ok(())
    }

    pub fn mailto(&self) -> String {
        format!("mailto:{}", self.contact_email)
    }
}

// ============================================================================
// TESTS
// ============================================================================
