use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateConvention {
    /// The annual rate is an effective yield: `(1 + a)^(1/12) - 1`.
    #[default]
    Effective,
    /// The annual rate is nominal and split evenly: `a / 12`.
    Nominal,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompoundingOrder {
    /// The month's contribution is deposited first and earns interest that month.
    #[default]
    BalanceThenContribute,
    /// Interest accrues on the prior balance, then the contribution is added.
    CompoundThenContribute,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Convention {
    pub rate: RateConvention,
    pub order: CompoundingOrder,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionLimits {
    pub min_contribution: f64,
    pub max_contribution: f64,
    pub max_duration_months: u32,
}

impl Default for ProjectionLimits {
    fn default() -> Self {
        Self {
            min_contribution: 1_000.0,
            max_contribution: 22_346.0,
            max_duration_months: 36,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("contribution must be > 0 and within {min}..={max}, got {value}")]
    InvalidContribution { value: f64, min: f64, max: f64 },
    #[error("duration must be between 1 and {max} months, got {value}")]
    InvalidDuration { value: u32, max: u32 },
    #[error("annual rate must be a non-negative percentage, got {value}")]
    InvalidRate { value: f64 },
}

/// Validated inputs of one projection. Only constructible through [`SimulationParameters::new`],
/// so the engine never sees a non-positive contribution, an empty horizon or a negative rate.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    contribution: f64,
    duration_months: u32,
    annual_rate_percent: f64,
    convention: Convention,
}

impl SimulationParameters {
    pub fn new(
        contribution: f64,
        duration_months: u32,
        annual_rate_percent: f64,
        convention: Convention,
        limits: &ProjectionLimits,
    ) -> Result<Self, SimulationError> {
        if !contribution.is_finite()
            || contribution <= 0.0
            || contribution < limits.min_contribution
            || contribution > limits.max_contribution
        {
            return Err(SimulationError::InvalidContribution {
                value: contribution,
                min: limits.min_contribution,
                max: limits.max_contribution,
            });
        }
        if duration_months < 1 || duration_months > limits.max_duration_months {
            return Err(SimulationError::InvalidDuration {
                value: duration_months,
                max: limits.max_duration_months,
            });
        }
        if !annual_rate_percent.is_finite() || annual_rate_percent < 0.0 {
            return Err(SimulationError::InvalidRate {
                value: annual_rate_percent,
            });
        }

        Ok(Self {
            contribution,
            duration_months,
            annual_rate_percent,
            convention,
        })
    }

    pub fn contribution(&self) -> f64 {
        self.contribution
    }

    pub fn duration_months(&self) -> u32 {
        self.duration_months
    }

    pub fn annual_rate_percent(&self) -> f64 {
        self.annual_rate_percent
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub month: u32,
    pub value: f64,
}

/// One value per elapsed month, starting at month 0 (before the first contribution).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        let month = self.points.len() as u32;
        self.points.push(SeriesPoint { month, value });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, month: u32) -> Option<f64> {
        self.points.get(month as usize).map(|p| p.value)
    }

    pub fn last(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub monthly_rate: f64,
    pub accumulated_principal: TimeSeries,
    pub compounded_value: TimeSeries,
    pub total: f64,
    pub closed_form_total: f64,
    pub principal_total: f64,
    pub interest_earned: f64,
}
