use tracing::debug;

use super::types::{
    CompoundingOrder, RateConvention, SimulationParameters, SimulationResult, TimeSeries,
};

pub fn monthly_rate(annual_rate_percent: f64, convention: RateConvention) -> f64 {
    let annual = annual_rate_percent / 100.0;
    match convention {
        RateConvention::Effective => (annual.ln_1p() / 12.0).exp_m1(),
        RateConvention::Nominal => annual / 12.0,
    }
}

/// Returns `(accumulated_principal, compounded_value)`, both of length `duration_months + 1`.
///
/// Principal and value share the same additions, so at a zero rate the two series are
/// bit-for-bit identical.
pub fn generate_series(
    contribution: f64,
    duration_months: u32,
    monthly_rate: f64,
    order: CompoundingOrder,
) -> (TimeSeries, TimeSeries) {
    let capacity = duration_months as usize + 1;
    let mut principal = TimeSeries::with_capacity(capacity);
    let mut value = TimeSeries::with_capacity(capacity);

    let mut deposited = 0.0;
    let mut running = 0.0;
    principal.push(deposited);
    value.push(running);

    for _ in 1..=duration_months {
        deposited += contribution;
        running = match order {
            CompoundingOrder::BalanceThenContribute => {
                let balance = running + contribution;
                balance + balance * monthly_rate
            }
            CompoundingOrder::CompoundThenContribute => {
                running + running * monthly_rate + contribution
            }
        };
        principal.push(deposited);
        value.push(running);
    }

    (principal, value)
}

pub fn series_total(value: &TimeSeries) -> f64 {
    value.last().unwrap_or(0.0)
}

/// Annuity future value matching [`generate_series`] for the same order: an ordinary
/// annuity when interest is credited before the deposit, an annuity due otherwise.
pub fn closed_form_total(
    contribution: f64,
    duration_months: u32,
    monthly_rate: f64,
    order: CompoundingOrder,
) -> f64 {
    let n = duration_months as f64;
    if monthly_rate == 0.0 {
        return contribution * n;
    }

    // (1 + r)^n - 1 without cancellation for small r
    let growth_minus_one = (n * monthly_rate.ln_1p()).exp_m1();
    let ordinary = contribution * growth_minus_one / monthly_rate;
    match order {
        CompoundingOrder::CompoundThenContribute => ordinary,
        CompoundingOrder::BalanceThenContribute => ordinary * (1.0 + monthly_rate),
    }
}

pub fn run_simulation(params: &SimulationParameters) -> SimulationResult {
    let convention = params.convention();
    let rate = monthly_rate(params.annual_rate_percent(), convention.rate);
    let (accumulated_principal, compounded_value) = generate_series(
        params.contribution(),
        params.duration_months(),
        rate,
        convention.order,
    );

    let total = series_total(&compounded_value);
    let closed_form = closed_form_total(
        params.contribution(),
        params.duration_months(),
        rate,
        convention.order,
    );
    let principal_total = series_total(&accumulated_principal);

    debug!(
        monthly_rate = rate,
        total,
        closed_form_total = closed_form,
        "projection computed"
    );

    SimulationResult {
        monthly_rate: rate,
        accumulated_principal,
        compounded_value,
        total,
        closed_form_total: closed_form,
        principal_total,
        interest_earned: total - principal_total,
    }
}
