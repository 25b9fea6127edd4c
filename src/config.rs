use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    amedas_station::AmedasStations,
    client::{Endpoint, HeatRiskClient, DEFAULT_TIMEOUT_SECS},
    error::{Error, Result},
    geolocation::GeolocationOptions,
    nearest::{is_valid_radius, DEFAULT_MAX_DISTANCE_KM},
    risk::RiskThresholds,
};

/// Runtime settings, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Station catalog (JSON or CSV). The bundled catalog is used when unset.
    pub stations_path: Option<PathBuf>,
    /// Threshold table overriding the built in one
    pub thresholds_path: Option<PathBuf>,
    pub max_distance_km: f64,
    pub request_timeout_secs: u64,
    pub endpoints: Vec<Endpoint>,
    pub geolocation: GeolocationOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stations_path: None,
            thresholds_path: None,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            endpoints: Vec::new(),
            geolocation: GeolocationOptions::default(),
        }
    }
}

impl Config {
    pub fn from_json(raw_data: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw_data)?;
        if !is_valid_radius(config.max_distance_km) {
            return Err(Error::InvalidRadius(config.max_distance_km));
        }
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let config = Self::from_json(&fs::read_to_string(path)?)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stations(&self) -> AmedasStations {
        AmedasStations::load(self.stations_path.as_deref())
    }

    /// An unreadable or invalid override is an error, not a silent fallback
    pub fn thresholds(&self) -> Result<RiskThresholds> {
        match &self.thresholds_path {
            Some(path) => RiskThresholds::from_path(path),
            None => Ok(RiskThresholds::default()),
        }
    }

    pub fn client(&self) -> Result<HeatRiskClient> {
        if self.endpoints.is_empty() {
            warn!("No endpoints configured, every request will fail");
        }
        HeatRiskClient::new(self.endpoints.clone(), self.request_timeout())
    }
}
