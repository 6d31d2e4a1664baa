use super::error::ExportError;
use super::types::{Analysis, MonthlyRecord};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Granularity {
    #[default]
    Monthly,
    /// Only month 0 and each twelfth month.
    Yearly,
}

const BASE_HEADER: [&str; 5] = [
    "month",
    "nominal_value",
    "real_value",
    "cumulative_contributions",
    "monthly_contribution",
];

const BASELINE_HEADER: [&str; 2] = ["baseline_nominal_value", "baseline_real_value"];

/// Renders the projection as CSV, one row per record. Baseline columns are
/// appended when the analysis carries a no-investment comparison.
pub fn export_csv(analysis: &Analysis, granularity: Granularity) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    let baseline = analysis
        .comparison
        .as_ref()
        .map(|comparison| comparison.baseline.records.as_slice());

    let mut header = BASE_HEADER.to_vec();
    if baseline.is_some() {
        header.extend(BASELINE_HEADER);
    }
    wtr.write_record(&header)?;

    for (idx, record) in analysis.projection.records.iter().enumerate() {
        if granularity == Granularity::Yearly && !record.is_year_boundary() {
            continue;
        }
        let mut row = record_fields(record);
        if let Some(baseline) = baseline {
            // Both series share month indices, so rows line up by position.
            if let Some(b) = baseline.get(idx) {
                row.push(money(b.nominal_value));
                row.push(money(b.real_value));
            }
        }
        wtr.write_record(&row)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

fn record_fields(record: &MonthlyRecord) -> Vec<String> {
    vec![
        record.month_index.to_string(),
        money(record.nominal_value),
        money(record.real_value),
        money(record.cumulative_contributions),
        money(record.monthly_contribution_amount),
    ]
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}
