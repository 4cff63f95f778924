mod engine;
mod format;
mod types;

pub use engine::{closed_form_total, generate_series, monthly_rate, run_simulation, series_total};
pub use format::{describe_projection, format_duration, format_money};
pub use types::{
    CompoundingOrder, Convention, ProjectionLimits, RateConvention, SeriesPoint,
    SimulationError, SimulationParameters, SimulationResult, TimeSeries,
};
