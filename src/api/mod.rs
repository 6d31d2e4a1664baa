use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum, error::ErrorKind};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    Analysis, Granularity, MonthlyRecord, SimulationParameters, analyze, export_csv, validate,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MAX_HORIZON_YEARS: u32 = 100;
const EXPORT_FILENAME: &str = "investment_simulation.csv";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliGranularity {
    Monthly,
    Yearly,
}

impl From<CliGranularity> for Granularity {
    fn from(value: CliGranularity) -> Self {
        match value {
            CliGranularity::Monthly => Granularity::Monthly,
            CliGranularity::Yearly => Granularity::Yearly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
    Csv,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGranularity {
    #[serde(alias = "month", alias = "Monthly")]
    Monthly,
    #[serde(alias = "year", alias = "annual", alias = "Yearly")]
    Yearly,
}

impl From<ApiGranularity> for CliGranularity {
    fn from(value: ApiGranularity) -> Self {
        match value {
            ApiGranularity::Monthly => CliGranularity::Monthly,
            ApiGranularity::Yearly => CliGranularity::Yearly,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    initial_investment: Option<f64>,
    monthly_investment: Option<f64>,
    contribution_growth: Option<f64>,
    annual_return: Option<f64>,
    inflation_rate: Option<f64>,
    years: Option<u32>,
    retirement_rule: Option<bool>,
    compare_no_investment: Option<bool>,
    granularity: Option<ApiGranularity>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "compounder",
    about = "Compound-growth investment projection with inflation, a no-investment baseline and the 4% rule",
    after_help = "Run `compounder serve [port]` to start the web calculator instead."
)]
struct Cli {
    #[arg(long, default_value_t = 10_000.0, help = "One-off amount invested at month 0")]
    initial_investment: f64,
    #[arg(long, default_value_t = 1_000.0, help = "Amount invested every month in year 1")]
    monthly_investment: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        allow_negative_numbers = true,
        help = "Yearly growth of the monthly contribution in percent (e.g. pay rises)"
    )]
    contribution_growth_rate: f64,
    #[arg(
        long,
        default_value_t = 7.0,
        allow_negative_numbers = true,
        help = "Expected annual return in percent, e.g. 7"
    )]
    annual_return: f64,
    #[arg(
        long,
        default_value_t = 2.5,
        allow_negative_numbers = true,
        help = "Expected annual inflation in percent"
    )]
    inflation_rate: f64,
    #[arg(long, default_value_t = 30, help = "Investment horizon in years")]
    years: u32,
    #[arg(long, help = "Skip the 4% rule withdrawal estimate")]
    no_retirement_rule: bool,
    #[arg(long, help = "Skip the no-investment baseline")]
    no_comparison: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
    format: OutputFormat,
    #[arg(
        long,
        value_enum,
        default_value_t = CliGranularity::Monthly,
        help = "Row granularity for --format csv"
    )]
    granularity: CliGranularity,
}

#[derive(Debug)]
struct ApiOptions {
    granularity: Granularity,
}

#[derive(Debug)]
struct ApiRequest {
    params: SimulationParameters,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse<'a> {
    #[serde(flatten)]
    analysis: &'a Analysis,
    yearly: Vec<MonthlyRecord>,
    baseline_yearly: Option<Vec<MonthlyRecord>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_params(cli: &Cli) -> Result<SimulationParameters, String> {
    if cli.years == 0 || cli.years > MAX_HORIZON_YEARS {
        return Err(format!("--years must be between 1 and {MAX_HORIZON_YEARS}"));
    }

    for (name, amount) in [
        ("--initial-investment", cli.initial_investment),
        ("--monthly-investment", cli.monthly_investment),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    for (name, rate) in [
        ("--contribution-growth-rate", cli.contribution_growth_rate),
        ("--annual-return", cli.annual_return),
        ("--inflation-rate", cli.inflation_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be > -100"));
        }
    }

    let params = SimulationParameters {
        initial_investment: cli.initial_investment,
        monthly_investment: cli.monthly_investment,
        annual_contribution_growth_rate: cli.contribution_growth_rate / 100.0,
        annual_return_rate: cli.annual_return / 100.0,
        annual_inflation_rate: cli.inflation_rate / 100.0,
        horizon_years: cli.years,
        enable_retirement_rule: !cli.no_retirement_rule,
        enable_no_invest_comparison: !cli.no_comparison,
    };
    validate(&params).map_err(|e| e.to_string())?;
    Ok(params)
}

/// One-shot command-line run. Returns the text to print on stdout.
pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => return Err(e.to_string()),
    };
    let params = build_params(&cli)?;
    let analysis = analyze(&params).map_err(|e| e.to_string())?;

    match cli.format {
        OutputFormat::Summary => Ok(render_summary(&analysis)),
        OutputFormat::Json => {
            let response = build_project_response(&analysis);
            serde_json::to_string_pretty(&response)
                .map_err(|e| format!("failed to serialize analysis: {e}"))
        }
        OutputFormat::Csv => {
            export_csv(&analysis, cli.granularity.into()).map_err(|e| e.to_string())
        }
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("investment calculator listening on http://{addr}");
    log::info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/export.csv", get(export_handler))
        .fallback(not_found_handler)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(query: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    match query {
        Ok(Query(payload)) => project_handler_impl(payload),
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

async fn project_post_handler(body: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match body {
        Ok(Json(payload)) => project_handler_impl(payload),
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

fn rejected_payload(msg: String) -> Response {
    log::warn!("rejected projection request: {msg}");
    error_response(StatusCode::BAD_REQUEST, &msg)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let analysis = match analysis_from_payload(payload) {
        Ok((analysis, _)) => analysis,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    json_response(StatusCode::OK, build_project_response(&analysis))
}

async fn export_handler(query: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    let payload = match query {
        Ok(Query(payload)) => payload,
        Err(rejection) => return rejected_payload(rejection.body_text()),
    };
    let (analysis, options) = match analysis_from_payload(payload) {
        Ok(parsed) => parsed,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match export_csv(&analysis, options.granularity) {
        Ok(body) => with_cache_control((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILENAME}\""),
                ),
            ],
            body,
        )),
        Err(e) => {
            log::error!("CSV export failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn analysis_from_payload(payload: ProjectPayload) -> Result<(Analysis, ApiOptions), String> {
    let request = api_request_from_payload(payload).inspect_err(|msg| {
        log::warn!("rejected projection request: {msg}");
    })?;
    let analysis = analyze(&request.params).map_err(|e| e.to_string())?;
    Ok((analysis, request.options))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.initial_investment {
        cli.initial_investment = v;
    }
    if let Some(v) = payload.monthly_investment {
        cli.monthly_investment = v;
    }
    if let Some(v) = payload.contribution_growth {
        cli.contribution_growth_rate = v;
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.years {
        cli.years = v;
    }
    if let Some(v) = payload.retirement_rule {
        cli.no_retirement_rule = !v;
    }
    if let Some(v) = payload.compare_no_investment {
        cli.no_comparison = !v;
    }
    if let Some(v) = payload.granularity {
        cli.granularity = v.into();
    }

    let params = build_params(&cli)?;
    Ok(ApiRequest {
        params,
        options: ApiOptions {
            granularity: cli.granularity.into(),
        },
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        initial_investment: 10_000.0,
        monthly_investment: 1_000.0,
        contribution_growth_rate: 3.0,
        annual_return: 7.0,
        inflation_rate: 2.5,
        years: 30,
        no_retirement_rule: false,
        no_comparison: false,
        format: OutputFormat::Json,
        granularity: CliGranularity::Monthly,
    }
}

fn build_project_response(analysis: &Analysis) -> ProjectResponse<'_> {
    ProjectResponse {
        analysis,
        yearly: analysis.projection.yearly().copied().collect(),
        baseline_yearly: analysis
            .comparison
            .as_ref()
            .map(|comparison| comparison.baseline.yearly().copied().collect()),
    }
}

fn render_summary(analysis: &Analysis) -> String {
    let p = &analysis.projection;
    let mut lines = vec![
        format!("Horizon:                    {} years", p.horizon_years),
        format!(
            "Total contributed:          {}",
            currency(p.total_contributed)
        ),
        format!(
            "Final value (nominal):      {}  (growth {})",
            currency(p.final_nominal_value),
            currency(p.total_growth)
        ),
        format!(
            "Final value (real):         {}  (real growth {})",
            currency(p.final_real_value),
            currency(p.real_growth)
        ),
    ];

    if let (Some(comparison), Some(advantage)) = (&analysis.comparison, &analysis.advantage) {
        lines.push(format!(
            "No-investment baseline:     {}  (real {})",
            currency(comparison.baseline.final_nominal_value),
            currency(comparison.baseline.final_real_value)
        ));
        lines.push(format!(
            "Investment advantage:       {}  (real {})",
            currency(advantage.nominal),
            currency(advantage.real)
        ));
    }

    if let Some(w) = &analysis.withdrawal {
        lines.push(format!(
            "4% rule withdrawal:         {}/yr, {}/mo",
            currency(w.annual_nominal),
            currency(w.monthly_nominal)
        ));
        lines.push(format!(
            "4% rule withdrawal (real):  {}/yr, {}/mo",
            currency(w.annual_real),
            currency(w.monthly_real)
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Whole-dollar amount with thousands separators, e.g. `-$1,234`.
fn currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
