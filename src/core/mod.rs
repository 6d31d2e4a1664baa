mod comparator;
mod engine;
mod error;
mod export;
mod types;

pub use comparator::{WITHDRAWAL_RATE, analyze, compare, withdrawal};
pub use engine::{
    MAX_PROJECTION_YEARS, MonthlyProjection, monthly_rate, months, project, validate,
};
pub use error::{ExportError, ValidationError};
pub use export::{Granularity, export_csv};
pub use types::{
    Analysis, ComparisonResult, InvestmentAdvantage, MonthlyRecord, ProjectionResult,
    RetirementWithdrawal, SimulationParameters,
};
