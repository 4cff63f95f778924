use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Level, event};

use crate::config::{AppConfig, ConfigError};
use crate::core::{
    CompoundingOrder, Convention, RateConvention, SimulationError, SimulationParameters,
    SimulationResult, TimeSeries, describe_projection, format_duration, format_money,
    run_simulation,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliRateConvention {
    Effective,
    Nominal,
}

impl From<CliRateConvention> for RateConvention {
    fn from(value: CliRateConvention) -> Self {
        match value {
            CliRateConvention::Effective => RateConvention::Effective,
            CliRateConvention::Nominal => RateConvention::Nominal,
        }
    }
}

impl From<RateConvention> for CliRateConvention {
    fn from(value: RateConvention) -> Self {
        match value {
            RateConvention::Effective => CliRateConvention::Effective,
            RateConvention::Nominal => CliRateConvention::Nominal,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliCompoundingOrder {
    BalanceThenContribute,
    CompoundThenContribute,
}

impl From<CliCompoundingOrder> for CompoundingOrder {
    fn from(value: CliCompoundingOrder) -> Self {
        match value {
            CliCompoundingOrder::BalanceThenContribute => CompoundingOrder::BalanceThenContribute,
            CliCompoundingOrder::CompoundThenContribute => {
                CompoundingOrder::CompoundThenContribute
            }
        }
    }
}

impl From<CompoundingOrder> for CliCompoundingOrder {
    fn from(value: CompoundingOrder) -> Self {
        match value {
            CompoundingOrder::BalanceThenContribute => CliCompoundingOrder::BalanceThenContribute,
            CompoundingOrder::CompoundThenContribute => {
                CliCompoundingOrder::CompoundThenContribute
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiRateConvention {
    #[serde(alias = "effective-annual", alias = "effectiveAnnual")]
    Effective,
    #[serde(alias = "nominal-annual", alias = "nominalAnnual")]
    Nominal,
}

impl From<ApiRateConvention> for CliRateConvention {
    fn from(value: ApiRateConvention) -> Self {
        match value {
            ApiRateConvention::Effective => CliRateConvention::Effective,
            ApiRateConvention::Nominal => CliRateConvention::Nominal,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCompoundingOrder {
    #[serde(alias = "balanceThenContribute", alias = "balance_then_contribute")]
    BalanceThenContribute,
    #[serde(alias = "compoundThenContribute", alias = "compound_then_contribute")]
    CompoundThenContribute,
}

impl From<ApiCompoundingOrder> for CliCompoundingOrder {
    fn from(value: ApiCompoundingOrder) -> Self {
        match value {
            ApiCompoundingOrder::BalanceThenContribute => {
                CliCompoundingOrder::BalanceThenContribute
            }
            ApiCompoundingOrder::CompoundThenContribute => {
                CliCompoundingOrder::CompoundThenContribute
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    contribution: Option<f64>,
    #[serde(alias = "durationMonths")]
    months: Option<u32>,
    #[serde(alias = "annualRatePercent")]
    annual_rate: Option<f64>,
    rate_convention: Option<ApiRateConvention>,
    compounding_order: Option<ApiCompoundingOrder>,
}

#[derive(Parser, Debug)]
#[command(
    name = "compound-fund",
    about = "Monthly-contribution investment fund projection with compound interest"
)]
pub struct Cli {
    #[arg(long, global = true, help = "TOML file with rate, conventions and limits")]
    pub config: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Project one contribution plan and print the month-by-month table
    Simulate(SimulateArgs),
    /// Serve the JSON API over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long, help = "Amount contributed every month")]
    pub contribution: Option<f64>,
    #[arg(long, help = "Number of monthly contributions")]
    pub months: Option<u32>,
    #[arg(long, help = "Annual rate in percent, e.g. 8.03")]
    pub annual_rate: Option<f64>,
    #[arg(long, value_enum)]
    pub rate_convention: Option<CliRateConvention>,
    #[arg(long, value_enum)]
    pub compounding_order: Option<CliCompoundingOrder>,
    #[arg(long, help = "Print the result as JSON instead of a table")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, help = "Port to listen on, defaults to server.port from config")]
    pub port: Option<u16>,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("failed to encode result: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormattedResult {
    contribution: String,
    duration: String,
    total: String,
    interest_earned: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    parameters: SimulationParameters,
    monthly_rate: f64,
    principal: TimeSeries,
    value: TimeSeries,
    total: f64,
    closed_form_total: f64,
    principal_total: f64,
    interest_earned: f64,
    formatted: FormattedResult,
    summary: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LimitsResponse {
    min_contribution: f64,
    max_contribution: f64,
    max_duration_months: u32,
    default_contribution: f64,
    default_duration_months: u32,
    annual_rate_percent: f64,
    convention: Convention,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// The single stderr line the binary prints before exiting with status 1.
pub fn failure_message(err: &AppError) -> String {
    format!("Error: {err}")
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    let config = match &cli.config {
        Some(path) => {
            event!(Level::DEBUG, path = %path.display(), "loading config");
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };

    match cli.command {
        Command::Simulate(args) => {
            let params = build_parameters(&args, &config)?;
            let result = run_simulation(&params);
            if args.json {
                let response = build_simulate_response(params, result);
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print!("{}", render_table(&params, &result));
            }
            Ok(())
        }
        Command::Serve(args) => {
            let port = args.port.unwrap_or(config.server.port);
            run_http_server(config, port).await?;
            Ok(())
        }
    }
}

fn build_parameters(
    args: &SimulateArgs,
    config: &AppConfig,
) -> Result<SimulationParameters, SimulationError> {
    let sim = &config.simulation;
    let convention = Convention {
        rate: args
            .rate_convention
            .map(Into::into)
            .unwrap_or(sim.rate_convention),
        order: args
            .compounding_order
            .map(Into::into)
            .unwrap_or(sim.compounding_order),
    };

    SimulationParameters::new(
        args.contribution.unwrap_or(sim.default_contribution),
        args.months.unwrap_or(sim.default_duration_months),
        args.annual_rate.unwrap_or(sim.annual_rate_percent),
        convention,
        &config.limits,
    )
}

fn render_table(params: &SimulationParameters, result: &SimulationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:>24}  {:>24}",
        "Month", "Accumulated principal", "Compounded value"
    );
    for (principal, value) in result
        .accumulated_principal
        .points()
        .iter()
        .zip(result.compounded_value.points())
    {
        let _ = writeln!(
            out,
            "{:>5}  {:>24}  {:>24}",
            principal.month,
            format_money(principal.value),
            format_money(value.value)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        describe_projection(params.contribution(), params.duration_months(), result.total)
    );
    let _ = writeln!(
        out,
        "Interest earned: {}",
        format_money(result.interest_earned)
    );
    out
}

fn build_simulate_response(
    params: SimulationParameters,
    result: SimulationResult,
) -> SimulateResponse {
    let formatted = FormattedResult {
        contribution: format_money(params.contribution()),
        duration: format_duration(params.duration_months()),
        total: format_money(result.total),
        interest_earned: format_money(result.interest_earned),
    };
    let summary = describe_projection(params.contribution(), params.duration_months(), result.total);

    SimulateResponse {
        parameters: params,
        monthly_rate: result.monthly_rate,
        principal: result.accumulated_principal,
        value: result.compounded_value,
        total: result.total,
        closed_form_total: result.closed_form_total,
        principal_total: result.principal_total,
        interest_earned: result.interest_earned,
        formatted,
        summary,
    }
}

pub fn router(config: AppConfig) -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/limits", get(limits_handler))
        .fallback(not_found_handler)
        .with_state(Arc::new(config))
}

pub async fn run_http_server(config: AppConfig, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(config);

    let listener = TcpListener::bind(addr).await?;
    event!(Level::INFO, %addr, "compound fund API listening");
    event!(Level::INFO, "local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn limits_handler(State(config): State<Arc<AppConfig>>) -> Response {
    let sim = &config.simulation;
    json_response(
        StatusCode::OK,
        LimitsResponse {
            min_contribution: config.limits.min_contribution,
            max_contribution: config.limits.max_contribution,
            max_duration_months: config.limits.max_duration_months,
            default_contribution: sim.default_contribution,
            default_duration_months: sim.default_duration_months,
            annual_rate_percent: sim.annual_rate_percent,
            convention: sim.convention(),
        },
    )
}

async fn simulate_get_handler(
    State(config): State<Arc<AppConfig>>,
    Query(payload): Query<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&config, payload)
}

async fn simulate_post_handler(
    State(config): State<Arc<AppConfig>>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&config, payload)
}

fn simulate_handler_impl(config: &AppConfig, payload: SimulatePayload) -> Response {
    let params = match api_request_from_payload(payload, config) {
        Ok(params) => params,
        Err(err) => {
            event!(Level::WARN, error = %err, "rejected simulation request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    event!(
        Level::DEBUG,
        contribution = params.contribution(),
        months = params.duration_months(),
        annual_rate = params.annual_rate_percent(),
        "simulation request accepted"
    );
    let result = run_simulation(&params);
    json_response(StatusCode::OK, build_simulate_response(params, result))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
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
fn api_request_from_json(
    json: &str,
    config: &AppConfig,
) -> Result<SimulationParameters, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload, config).map_err(|e| e.to_string())
}

fn api_request_from_payload(
    payload: SimulatePayload,
    config: &AppConfig,
) -> Result<SimulationParameters, SimulationError> {
    let mut args = default_args_for_api(config);

    if let Some(v) = payload.contribution {
        args.contribution = Some(v);
    }
    if let Some(v) = payload.months {
        args.months = Some(v);
    }
    if let Some(v) = payload.annual_rate {
        args.annual_rate = Some(v);
    }
    if let Some(v) = payload.rate_convention {
        args.rate_convention = Some(v.into());
    }
    if let Some(v) = payload.compounding_order {
        args.compounding_order = Some(v.into());
    }

    build_parameters(&args, config)
}

fn default_args_for_api(config: &AppConfig) -> SimulateArgs {
    let sim = &config.simulation;
    SimulateArgs {
        contribution: Some(sim.default_contribution),
        months: Some(sim.default_duration_months),
        annual_rate: Some(sim.annual_rate_percent),
        rate_convention: Some(sim.rate_convention.into()),
        compounding_order: Some(sim.compounding_order.into()),
        json: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> SimulateArgs {
        default_args_for_api(&AppConfig::default())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[test]
    fn cli_parses_simulate_subcommand_flags() {
        let cli = Cli::try_parse_from([
            "compound-fund",
            "simulate",
            "--contribution",
            "5000",
            "--months",
            "24",
            "--rate-convention",
            "nominal",
            "--compounding-order",
            "compound-then-contribute",
            "--json",
        ])
        .expect("flags should parse");

        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate subcommand");
        };
        assert_eq!(args.contribution, Some(5_000.0));
        assert_eq!(args.months, Some(24));
        assert_eq!(args.annual_rate, None);
        assert_eq!(args.rate_convention, Some(CliRateConvention::Nominal));
        assert_eq!(
            args.compounding_order,
            Some(CliCompoundingOrder::CompoundThenContribute)
        );
        assert!(args.json);
    }

    #[test]
    fn cli_accepts_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["compound-fund", "serve", "--port", "9000", "--verbose"])
            .expect("flags should parse");
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Serve(ServeArgs { port: Some(9000) })));
    }

    #[test]
    fn failure_message_is_one_line_without_duplicate_prefix() {
        let err = AppError::from(SimulationError::InvalidDuration { value: 0, max: 36 });
        let message = failure_message(&err);

        assert_eq!(message, "Error: duration must be between 1 and 36 months, got 0");
        assert_eq!(message.lines().count(), 1);
    }

    #[test]
    fn build_parameters_falls_back_to_config_defaults() {
        let args = SimulateArgs {
            contribution: None,
            months: None,
            annual_rate: None,
            rate_convention: None,
            compounding_order: None,
            json: false,
        };
        let params = build_parameters(&args, &AppConfig::default()).expect("valid defaults");

        assert_approx(params.contribution(), 3_350.0);
        assert_eq!(params.duration_months(), 12);
        assert_approx(params.annual_rate_percent(), 8.03);
        assert_eq!(params.convention(), Convention::default());
    }

    #[test]
    fn build_parameters_rejects_duration_beyond_horizon() {
        let mut args = sample_args();
        args.months = Some(37);

        let err = build_parameters(&args, &AppConfig::default()).expect_err("must reject");
        assert_eq!(err, SimulationError::InvalidDuration { value: 37, max: 36 });
    }

    #[test]
    fn build_parameters_rejects_negative_rate() {
        let mut args = sample_args();
        args.annual_rate = Some(-2.0);

        let err = build_parameters(&args, &AppConfig::default()).expect_err("must reject");
        assert!(matches!(err, SimulationError::InvalidRate { .. }));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "contribution": 4100,
          "durationMonths": 18,
          "annualRate": 7.04,
          "rateConvention": "nominal",
          "compoundingOrder": "compoundThenContribute"
        }"#;
        let params = api_request_from_json(json, &AppConfig::default()).expect("json should parse");

        assert_approx(params.contribution(), 4_100.0);
        assert_eq!(params.duration_months(), 18);
        assert_approx(params.annual_rate_percent(), 7.04);
        assert_eq!(
            params.convention(),
            Convention {
                rate: RateConvention::Nominal,
                order: CompoundingOrder::CompoundThenContribute,
            }
        );
    }

    #[test]
    fn api_request_from_json_reports_validation_errors() {
        let err = api_request_from_json(r#"{"contribution": 50}"#, &AppConfig::default())
            .expect_err("below minimum contribution");
        assert!(err.contains("contribution"));

        let err = api_request_from_json(r#"{"rateConvention": "daily"}"#, &AppConfig::default())
            .expect_err("unknown convention");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let params = build_parameters(&sample_args(), &AppConfig::default()).expect("valid");
        let result = run_simulation(&params);
        let response = build_simulate_response(params, result);
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"parameters\""));
        assert!(json.contains("\"durationMonths\":12"));
        assert!(json.contains("\"rate\":\"effective\""));
        assert!(json.contains("\"order\":\"balance-then-contribute\""));
        assert!(json.contains("\"principal\":[{\"month\":0,\"value\":0.0}"));
        assert!(json.contains("\"closedFormTotal\""));
        assert!(json.contains("\"interestEarned\""));
        assert!(json.contains("\"contribution\":\"$3,350.00 MN\""));
        assert!(json.contains("\"duration\":\"12 months\""));
        assert!(json.contains("\"summary\""));
    }

    #[test]
    fn render_table_lists_every_month_and_summary() {
        let mut args = sample_args();
        args.annual_rate = Some(0.0);
        args.months = Some(3);
        let params = build_parameters(&args, &AppConfig::default()).expect("valid");
        let table = render_table(&params, &run_simulation(&params));
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].contains("Accumulated principal"));
        assert!(lines[1].trim_start().starts_with('0'));
        assert!(lines[4].contains("$10,050.00 MN"));
        assert!(table.contains("3 months ago"));
        assert!(table.contains("Interest earned: $0.00 MN"));
    }

    #[tokio::test]
    async fn simulate_get_route_returns_series() {
        let app = router(AppConfig::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/simulate?contribution=2000&months=3&annualRate=0")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router is infallible");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
        let body = body_json(response).await;
        assert_eq!(body["principal"].as_array().map(Vec::len), Some(4));
        assert_eq!(body["total"], serde_json::json!(6000.0));
        assert_eq!(body["formatted"]["total"], "$6,000.00 MN");
    }

    #[tokio::test]
    async fn simulate_post_route_rejects_invalid_duration() {
        let app = router(AppConfig::default());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/simulate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"months": 0}"#))
                    .expect("request"),
            )
            .await
            .expect("router is infallible");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("duration"));
    }

    #[tokio::test]
    async fn limits_route_exposes_configured_bounds() {
        let app = router(AppConfig::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/limits")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router is infallible");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["maxDurationMonths"], 36);
        assert_eq!(body["minContribution"], serde_json::json!(1000.0));
        assert_eq!(body["convention"]["rate"], "effective");
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let app = router(AppConfig::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router is infallible");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Not found");
    }
}
