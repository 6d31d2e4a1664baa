use std::iter::FusedIterator;

use super::error::ValidationError;
use super::types::{MonthlyRecord, ProjectionResult, SimulationParameters};

/// Longest horizon whose month count still fits the `u32` month index.
pub const MAX_PROJECTION_YEARS: u32 = (u32::MAX - 1) / 12;

/// Rejects parameter sets the monthly recurrence is not defined on.
pub fn validate(params: &SimulationParameters) -> Result<(), ValidationError> {
    if params.horizon_years < 1 {
        return Err(ValidationError::new("horizon_years", "must be >= 1"));
    }
    if params.horizon_years > MAX_PROJECTION_YEARS {
        return Err(ValidationError::new(
            "horizon_years",
            format!("must be <= {MAX_PROJECTION_YEARS}"),
        ));
    }

    for (field, amount) in [
        ("initial_investment", params.initial_investment),
        ("monthly_investment", params.monthly_investment),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ValidationError::new(field, "must be a finite amount >= 0"));
        }
    }

    // Contribution growth only scales an integer power, so any finite rate works.
    if !params.annual_contribution_growth_rate.is_finite() {
        return Err(ValidationError::new(
            "annual_contribution_growth_rate",
            "must be finite",
        ));
    }

    for (field, rate) in [
        ("annual_return_rate", params.annual_return_rate),
        ("annual_inflation_rate", params.annual_inflation_rate),
    ] {
        if !rate.is_finite() {
            return Err(ValidationError::new(field, "must be finite"));
        }
        if rate <= -1.0 {
            return Err(ValidationError::new(field, "must be > -1 (-100%)"));
        }
    }

    Ok(())
}

/// Monthly rate that compounds to `annual_rate` over twelve months.
pub fn monthly_rate(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

/// Lazy month-by-month projection, month 0 through `horizon_years * 12`.
///
/// A clone continues from the same month as the original; call [`months`]
/// again to start over.
#[derive(Debug, Clone)]
pub struct MonthlyProjection {
    monthly_rate: f64,
    inflation_factor: f64,
    monthly_investment: f64,
    contribution_growth_factor: f64,
    total_months: u32,
    next_month: u32,
    nominal_value: f64,
    cumulative_contributions: f64,
}

pub fn months(params: &SimulationParameters) -> Result<MonthlyProjection, ValidationError> {
    validate(params)?;
    Ok(MonthlyProjection {
        monthly_rate: monthly_rate(params.annual_return_rate),
        inflation_factor: 1.0 + params.annual_inflation_rate,
        monthly_investment: params.monthly_investment,
        contribution_growth_factor: 1.0 + params.annual_contribution_growth_rate,
        total_months: params.total_months(),
        next_month: 0,
        nominal_value: params.initial_investment,
        cumulative_contributions: params.initial_investment,
    })
}

impl MonthlyProjection {
    fn contribution_for_month(&self, month: u32) -> f64 {
        let year = (month - 1) / 12;
        self.monthly_investment * self.contribution_growth_factor.powf(f64::from(year))
    }

    fn remaining(&self) -> usize {
        if self.next_month > self.total_months {
            0
        } else {
            (self.total_months - self.next_month) as usize + 1
        }
    }
}

impl Iterator for MonthlyProjection {
    type Item = MonthlyRecord;

    fn next(&mut self) -> Option<MonthlyRecord> {
        if self.next_month > self.total_months {
            return None;
        }
        let month = self.next_month;
        self.next_month += 1;

        if month == 0 {
            return Some(MonthlyRecord {
                month_index: 0,
                nominal_value: self.nominal_value,
                real_value: self.nominal_value,
                cumulative_contributions: self.cumulative_contributions,
                monthly_contribution_amount: self.monthly_investment,
            });
        }

        let contribution = self.contribution_for_month(month);
        self.nominal_value = self.nominal_value * (1.0 + self.monthly_rate) + contribution;
        self.cumulative_contributions += contribution;
        // Fractional-year exponent: deflation is applied every month.
        let deflator = self.inflation_factor.powf(f64::from(month) / 12.0);

        Some(MonthlyRecord {
            month_index: month,
            nominal_value: self.nominal_value,
            real_value: self.nominal_value / deflator,
            cumulative_contributions: self.cumulative_contributions,
            monthly_contribution_amount: contribution,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MonthlyProjection {}

impl FusedIterator for MonthlyProjection {}

pub fn project(params: &SimulationParameters) -> Result<ProjectionResult, ValidationError> {
    let records = months(params)?.collect::<Vec<_>>();
    log::debug!(
        "projected {} months over {} years",
        records.len(),
        params.horizon_years
    );
    Ok(summarize(params, records))
}

fn summarize(params: &SimulationParameters, records: Vec<MonthlyRecord>) -> ProjectionResult {
    // validate() guarantees horizon_years >= 1, so month 0 always exists.
    let last = records.last().copied().unwrap_or(MonthlyRecord {
        month_index: 0,
        nominal_value: params.initial_investment,
        real_value: params.initial_investment,
        cumulative_contributions: params.initial_investment,
        monthly_contribution_amount: params.monthly_investment,
    });
    let horizon_deflator =
        (1.0 + params.annual_inflation_rate).powf(f64::from(params.horizon_years));

    ProjectionResult {
        horizon_years: params.horizon_years,
        records,
        final_nominal_value: last.nominal_value,
        final_real_value: last.real_value,
        total_contributed: last.cumulative_contributions,
        total_growth: last.nominal_value - last.cumulative_contributions,
        real_growth: last.real_value - last.cumulative_contributions / horizon_deflator,
    }
}
