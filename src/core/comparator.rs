use super::engine::project;
use super::error::ValidationError;
use super::types::{
    Analysis, ComparisonResult, InvestmentAdvantage, ProjectionResult, RetirementWithdrawal,
    SimulationParameters,
};

/// Share of the final pot withdrawn per year under the 4% rule.
pub const WITHDRAWAL_RATE: f64 = 0.04;

/// Projects the same contribution schedule with a zero return.
pub fn compare(params: &SimulationParameters) -> Result<ComparisonResult, ValidationError> {
    let baseline_params = SimulationParameters {
        annual_return_rate: 0.0,
        ..*params
    };
    Ok(ComparisonResult {
        baseline: project(&baseline_params)?,
    })
}

pub fn withdrawal(result: &ProjectionResult) -> RetirementWithdrawal {
    let annual_nominal = result.final_nominal_value * WITHDRAWAL_RATE;
    let annual_real = result.final_real_value * WITHDRAWAL_RATE;
    RetirementWithdrawal {
        annual_nominal,
        monthly_nominal: annual_nominal / 12.0,
        annual_real,
        monthly_real: annual_real / 12.0,
    }
}

impl ComparisonResult {
    pub fn advantage_over(&self, invested: &ProjectionResult) -> InvestmentAdvantage {
        InvestmentAdvantage {
            nominal: invested.final_nominal_value - self.baseline.final_nominal_value,
            real: invested.final_real_value - self.baseline.final_real_value,
        }
    }
}

/// Runs the projection and whichever comparisons the parameters enable.
pub fn analyze(params: &SimulationParameters) -> Result<Analysis, ValidationError> {
    let projection = project(params)?;

    let comparison = if params.enable_no_invest_comparison {
        Some(compare(params)?)
    } else {
        None
    };
    let advantage = comparison
        .as_ref()
        .map(|comparison| comparison.advantage_over(&projection));
    let retirement = params
        .enable_retirement_rule
        .then(|| withdrawal(&projection));

    Ok(Analysis {
        parameters: *params,
        projection,
        comparison,
        advantage,
        withdrawal: retirement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_params() -> SimulationParameters {
        SimulationParameters {
            initial_investment: 10_000.0,
            monthly_investment: 1_000.0,
            annual_contribution_growth_rate: 0.03,
            annual_return_rate: 0.07,
            annual_inflation_rate: 0.025,
            horizon_years: 30,
            enable_retirement_rule: true,
            enable_no_invest_comparison: true,
        }
    }

    #[test]
    fn baseline_has_no_growth() {
        let comparison = compare(&sample_params()).expect("valid params");
        let baseline = &comparison.baseline;
        assert_eq!(baseline.final_nominal_value, baseline.total_contributed);
        assert_eq!(baseline.total_growth, 0.0);
        assert_eq!(baseline.records.len(), 361);
    }

    #[test]
    fn baseline_keeps_contribution_schedule() {
        let params = sample_params();
        let invested = project(&params).expect("valid params");
        let comparison = compare(&params).expect("valid params");
        for (a, b) in invested.records.iter().zip(&comparison.baseline.records) {
            assert_eq!(a.monthly_contribution_amount, b.monthly_contribution_amount);
            assert_eq!(a.cumulative_contributions, b.cumulative_contributions);
        }
    }

    #[test]
    fn baseline_still_deflates() {
        let comparison = compare(&sample_params()).expect("valid params");
        let last = comparison.baseline.records.last().expect("non-empty");
        assert_approx(last.real_value, last.nominal_value / 1.025_f64.powi(30));
    }

    #[test]
    fn compare_propagates_validation_error() {
        let mut params = sample_params();
        params.horizon_years = 0;
        let err = compare(&params).expect_err("must reject");
        assert_eq!(err.field, "horizon_years");
    }

    #[test]
    fn withdrawal_is_four_percent_of_final_values() {
        let result = project(&sample_params()).expect("valid params");
        let w = withdrawal(&result);
        assert_approx(w.annual_nominal, result.final_nominal_value * 0.04);
        assert_approx(w.annual_real, result.final_real_value * 0.04);
        assert_approx(w.monthly_nominal, w.annual_nominal / 12.0);
        assert_approx(w.monthly_real, w.annual_real / 12.0);
    }

    #[test]
    fn documented_withdrawal_figure_without_contribution_growth() {
        let mut params = sample_params();
        params.annual_contribution_growth_rate = 0.0;
        let result = project(&params).expect("valid params");
        let w = withdrawal(&result);
        assert!(
            (w.annual_nominal - 48_000.0).abs() <= 48_000.0 * 0.05,
            "got {}",
            w.annual_nominal
        );
    }

    #[test]
    fn analyze_honors_feature_flags() {
        let mut params = sample_params();
        let full = analyze(&params).expect("valid params");
        assert!(full.comparison.is_some());
        assert!(full.advantage.is_some());
        assert!(full.withdrawal.is_some());

        params.enable_no_invest_comparison = false;
        params.enable_retirement_rule = false;
        let bare = analyze(&params).expect("valid params");
        assert!(bare.comparison.is_none());
        assert!(bare.advantage.is_none());
        assert!(bare.withdrawal.is_none());
        assert_eq!(bare.projection, full.projection);
    }

    #[test]
    fn advantage_is_difference_of_final_values() {
        let analysis = analyze(&sample_params()).expect("valid params");
        let baseline = &analysis.comparison.as_ref().expect("enabled").baseline;
        let advantage = analysis.advantage.expect("enabled");
        assert_approx(
            advantage.nominal,
            analysis.projection.final_nominal_value - baseline.final_nominal_value,
        );
        assert_approx(
            advantage.real,
            analysis.projection.final_real_value - baseline.final_real_value,
        );
        assert!(advantage.nominal > 0.0);
    }

    #[test]
    fn analyze_rejects_total_loss_return() {
        let mut params = sample_params();
        params.annual_return_rate = -1.0;
        let err = analyze(&params).expect_err("must reject");
        assert_eq!(err.field, "annual_return_rate");
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_zero_return_baseline_equals_contributions(
            horizon_years in 1u32..50,
            initial in 0u32..1_000_000,
            monthly in 0u32..20_000,
            return_bp in -5_000i32..5_000,
            growth_bp in -3_000i32..3_000,
            inflation_bp in -500i32..1_500
        ) {
            let params = SimulationParameters {
                initial_investment: initial as f64,
                monthly_investment: monthly as f64,
                annual_contribution_growth_rate: growth_bp as f64 / 10_000.0,
                annual_return_rate: return_bp as f64 / 10_000.0,
                annual_inflation_rate: inflation_bp as f64 / 10_000.0,
                horizon_years,
                enable_retirement_rule: true,
                enable_no_invest_comparison: true,
            };
            let comparison = compare(&params).expect("valid params");
            prop_assert_eq!(
                comparison.baseline.final_nominal_value,
                comparison.baseline.total_contributed
            );
        }
    }
}
