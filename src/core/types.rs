use serde::Serialize;

/// Inputs for a single projection. Rates are fractions (0.07 for 7%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub initial_investment: f64,
    pub monthly_investment: f64,
    pub annual_contribution_growth_rate: f64,
    pub annual_return_rate: f64,
    pub annual_inflation_rate: f64,
    pub horizon_years: u32,
    pub enable_retirement_rule: bool,
    pub enable_no_invest_comparison: bool,
}

impl SimulationParameters {
    /// Saturates past `MAX_PROJECTION_YEARS`, which validation rejects.
    pub fn total_months(&self) -> u32 {
        self.horizon_years.saturating_mul(12)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecord {
    pub month_index: u32,
    pub nominal_value: f64,
    pub real_value: f64,
    pub cumulative_contributions: f64,
    pub monthly_contribution_amount: f64,
}

impl MonthlyRecord {
    /// True for month 0 and every twelfth month after it.
    pub fn is_year_boundary(&self) -> bool {
        self.month_index % 12 == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub horizon_years: u32,
    pub records: Vec<MonthlyRecord>,
    pub final_nominal_value: f64,
    pub final_real_value: f64,
    pub total_contributed: f64,
    pub total_growth: f64,
    /// Final real value minus the contributions deflated over the full horizon.
    pub real_growth: f64,
}

impl ProjectionResult {
    /// Records at month 0, 12, 24, ... up to the end of the horizon.
    pub fn yearly(&self) -> impl Iterator<Item = &MonthlyRecord> + '_ {
        self.records.iter().filter(|r| r.is_year_boundary())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Same contribution schedule with a zero return.
    pub baseline: ProjectionResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentAdvantage {
    pub nominal: f64,
    pub real: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementWithdrawal {
    pub annual_nominal: f64,
    pub monthly_nominal: f64,
    pub annual_real: f64,
    pub monthly_real: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub parameters: SimulationParameters,
    pub projection: ProjectionResult,
    pub comparison: Option<ComparisonResult>,
    pub advantage: Option<InvestmentAdvantage>,
    pub withdrawal: Option<RetirementWithdrawal>,
}
