use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{CompoundingOrder, Convention, ProjectionLimits, RateConvention};

/// Annual rate of the deployed fund, in percent.
pub const DEFAULT_ANNUAL_RATE_PERCENT: f64 = 8.03;

/// Largest `limits.max_duration_months` a deployment may configure (50 years).
pub const MAX_HORIZON_MONTHS: u32 = 600;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub limits: ProjectionLimits,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub annual_rate_percent: f64,
    pub rate_convention: RateConvention,
    pub compounding_order: CompoundingOrder,
    pub default_contribution: f64,
    pub default_duration_months: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            annual_rate_percent: DEFAULT_ANNUAL_RATE_PERCENT,
            rate_convention: RateConvention::Effective,
            compounding_order: CompoundingOrder::BalanceThenContribute,
            default_contribution: 3_350.0,
            default_duration_months: 12,
        }
    }
}

impl SimulationConfig {
    pub fn convention(&self) -> Convention {
        Convention {
            rate: self.rate_convention,
            order: self.compounding_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        let sim = &self.simulation;

        if !limits.min_contribution.is_finite() || limits.min_contribution < 0.0 {
            return Err(ConfigError::Invalid(
                "limits.min_contribution must be >= 0".to_string(),
            ));
        }
        if !limits.max_contribution.is_finite() || limits.max_contribution <= 0.0 {
            return Err(ConfigError::Invalid(
                "limits.max_contribution must be > 0".to_string(),
            ));
        }
        if limits.min_contribution > limits.max_contribution {
            return Err(ConfigError::Invalid(
                "limits.min_contribution cannot exceed limits.max_contribution".to_string(),
            ));
        }
        if limits.max_duration_months < 1 || limits.max_duration_months > MAX_HORIZON_MONTHS {
            return Err(ConfigError::Invalid(format!(
                "limits.max_duration_months must be within 1..={MAX_HORIZON_MONTHS}"
            )));
        }
        if !sim.annual_rate_percent.is_finite() || sim.annual_rate_percent < 0.0 {
            return Err(ConfigError::Invalid(
                "simulation.annual_rate_percent must be >= 0".to_string(),
            ));
        }
        if !sim.default_contribution.is_finite()
            || sim.default_contribution <= 0.0
            || sim.default_contribution < limits.min_contribution
            || sim.default_contribution > limits.max_contribution
        {
            return Err(ConfigError::Invalid(format!(
                "simulation.default_contribution must be within {}..={}",
                limits.min_contribution, limits.max_contribution
            )));
        }
        if sim.default_duration_months < 1
            || sim.default_duration_months > limits.max_duration_months
        {
            return Err(ConfigError::Invalid(format!(
                "simulation.default_duration_months must be within 1..={}",
                limits.max_duration_months
            )));
        }
        Ok(())
    }
}
