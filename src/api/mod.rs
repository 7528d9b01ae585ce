use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;

use crate::core::{
    AggregateResult, CancellationToken, DEFAULT_MAX_PERIODS, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_TRIAL_COUNT, HoldingHistory, MAX_HORIZON_YEARS, PERIODS_PER_YEAR,
    ProjectionParameters, ProjectionResult, RunOptions, SimulationParameters,
    historical_performance, project, required_capital, run_simulation,
};

const MAX_TRIALS: u32 = 1_000_000;
const MAX_MONTHS: u32 = 12_000;
const MAX_TRACKED_VALUES: u64 = 50_000_000;
const MAX_PROJECTED_VALUES: u64 = 50_000_000;

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 0.0)]
    pub starting_capital: f64,
    #[arg(long, help = "Amount added at the start of every month")]
    pub monthly_contribution: f64,
    #[arg(long, help = "Capital to reach; derived from desired income when omitted")]
    pub target_amount: Option<f64>,
    #[arg(long, help = "Monthly income the target capital should fund")]
    pub desired_monthly_income: Option<f64>,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Post-target annual return in percent used to derive the target"
    )]
    pub withdrawal_rate: f64,
    #[arg(long, default_value_t = 6.5, help = "Mean annual return in percent")]
    pub mean_return: f64,
    #[arg(long, default_value_t = 15.0, help = "Annual return volatility in percent")]
    pub volatility: f64,
    #[arg(long, default_value_t = DEFAULT_TRIAL_COUNT)]
    pub trials: u32,
    #[arg(long, default_value_t = DEFAULT_MAX_PERIODS)]
    pub max_months: u32,
    #[arg(long, help = "Retain trajectories and report representative paths")]
    pub track_paths: bool,
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, help = "Historical CAGR in percent")]
    pub cagr: f64,
    #[arg(long, help = "Annual volatility in percent")]
    pub volatility: f64,
    #[arg(long, default_value_t = 10)]
    pub horizon_years: u32,
    #[arg(long, default_value_t = 5_000)]
    pub trials: u32,
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    starting_capital: Option<f64>,
    monthly_contribution: Option<f64>,
    target_amount: Option<f64>,
    desired_monthly_income: Option<f64>,
    withdrawal_rate: Option<f64>,
    mean_return: Option<f64>,
    volatility: Option<f64>,
    trials: Option<u32>,
    max_months: Option<u32>,
    track_paths: Option<bool>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    cagr: Option<f64>,
    volatility: Option<f64>,
    horizon_years: Option<u32>,
    trials: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPayload {
    pub holdings: Vec<HoldingHistory>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    pub target_amount: f64,
    pub max_months: u32,
    pub seed: u64,
    #[serde(flatten)]
    pub result: AggregateResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub cagr: f64,
    pub volatility: f64,
    pub seed: u64,
    #[serde(flatten)]
    pub result: ProjectionResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub years: usize,
    pub values: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_parameters(args: &SimulateArgs) -> Result<(SimulationParameters, RunOptions), String> {
    if args.trials == 0 || args.trials > MAX_TRIALS {
        return Err(format!("--trials must be between 1 and {MAX_TRIALS}"));
    }
    if args.max_months == 0 || args.max_months > MAX_MONTHS {
        return Err(format!("--max-months must be between 1 and {MAX_MONTHS}"));
    }
    if !args.volatility.is_finite() || args.volatility < 0.0 {
        return Err("--volatility must be >= 0".to_string());
    }
    if args.track_paths && args.trials as u64 * args.max_months as u64 > MAX_TRACKED_VALUES {
        return Err(format!(
            "--track-paths requires --trials x --max-months <= {MAX_TRACKED_VALUES}"
        ));
    }

    let target_amount = match (args.target_amount, args.desired_monthly_income) {
        (Some(target), _) => target,
        (None, Some(income)) => required_capital(income, args.withdrawal_rate)
            .map_err(|e| format!("cannot derive target from --desired-monthly-income: {e}"))?,
        (None, None) => {
            return Err(
                "either --target-amount or --desired-monthly-income is required".to_string(),
            );
        }
    };

    let params = SimulationParameters {
        starting_capital: args.starting_capital,
        periodic_contribution: args.monthly_contribution,
        target_amount,
        mean_annual_return_percent: args.mean_return,
        annual_volatility_percent: args.volatility,
        trial_count: args.trials,
        max_periods: args.max_months,
        track_paths: args.track_paths,
    };
    params.validate().map_err(|e| e.to_string())?;

    let options = RunOptions {
        seed: Some(args.seed.unwrap_or_else(rand::random)),
        progress_interval: DEFAULT_PROGRESS_INTERVAL,
        cancellation: None,
    };
    Ok((params, options))
}

fn build_projection(args: &ProjectArgs) -> Result<ProjectionParameters, String> {
    if args.trials == 0 || args.trials > MAX_TRIALS {
        return Err(format!("--trials must be between 1 and {MAX_TRIALS}"));
    }
    if args.horizon_years == 0 || args.horizon_years > MAX_HORIZON_YEARS {
        return Err(format!("--horizon-years must be between 1 and {MAX_HORIZON_YEARS}"));
    }
    let projected_values =
        args.trials as u64 * (args.horizon_years as u64 * PERIODS_PER_YEAR as u64 + 1);
    if projected_values > MAX_PROJECTED_VALUES {
        return Err(format!(
            "--trials x (--horizon-years x 12 + 1) must be <= {MAX_PROJECTED_VALUES}"
        ));
    }
    let params = ProjectionParameters {
        cagr: args.cagr / 100.0,
        volatility: args.volatility / 100.0,
        horizon_years: args.horizon_years,
        trial_count: args.trials,
    };
    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

pub fn run_simulate_command(args: &SimulateArgs) -> Result<SimulateResponse, String> {
    run_simulate_until_cancelled(args, None)
}

fn run_simulate_until_cancelled(
    args: &SimulateArgs,
    cancellation: Option<CancellationToken>,
) -> Result<SimulateResponse, String> {
    let (params, mut options) = build_parameters(args)?;
    options.cancellation = cancellation;
    let seed = options.seed.unwrap_or_default();
    let mut last_logged = 0.0;
    let result = run_simulation(&params, &options, |progress| {
        let fraction = progress.fraction_complete();
        if fraction - last_logged >= 0.1 || progress.completed == progress.trial_count {
            last_logged = fraction;
            tracing::debug!(
                completed = progress.completed,
                trial_count = progress.trial_count,
                successes = progress.success_periods.len(),
                "simulation progress"
            );
        }
    })
    .map_err(|e| e.to_string())?;

    Ok(SimulateResponse {
        target_amount: params.target_amount,
        max_months: params.max_periods,
        seed,
        result,
    })
}

pub fn run_project_command(args: &ProjectArgs) -> Result<ProjectResponse, String> {
    let params = build_projection(args)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let result = project(&params, Some(seed)).map_err(|e| e.to_string())?;
    Ok(ProjectResponse {
        cagr: params.cagr,
        volatility: params.volatility,
        seed,
        result,
    })
}

pub fn run_history(payload: &HistoryPayload) -> Result<HistoryResponse, String> {
    let values = historical_performance(&payload.holdings).map_err(|e| e.to_string())?;
    Ok(HistoryResponse {
        years: values.len() - 1,
        values,
    })
}

pub fn run_history_command(path: &Path) -> Result<HistoryResponse, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let payload = serde_json::from_str::<HistoryPayload>(&raw)
        .map_err(|e| format!("Invalid holdings JSON in {}: {e}", path.display()))?;
    run_history(&payload)
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/history", post(history_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "FIRE projection API listening");
    tracing::info!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let args = simulate_args_from_payload(payload);
    let token = CancellationToken::new();
    // Dropped with the handler future when the client goes away.
    let _guard = CancelOnDrop(token.clone());
    run_blocking(move || run_simulate_until_cancelled(&args, Some(token))).await
}

struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let args = project_args_from_payload(payload);
    run_blocking(move || run_project_command(&args)).await
}

async fn history_handler(Json(payload): Json<HistoryPayload>) -> Response {
    run_blocking(move || run_history(&payload)).await
}

async fn run_blocking<T, F>(job: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Result<T, String> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(Ok(body)) => json_response(StatusCode::OK, body),
        Ok(Err(msg)) => {
            tracing::debug!(error = %msg, "rejected request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
        Err(e) => {
            tracing::error!(error = %e, "simulation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
    }
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

fn simulate_args_from_payload(payload: SimulatePayload) -> SimulateArgs {
    let mut args = default_simulate_args();

    if let Some(v) = payload.starting_capital {
        args.starting_capital = v;
    }
    if let Some(v) = payload.monthly_contribution {
        args.monthly_contribution = v;
    }
    if payload.target_amount.is_some() || payload.desired_monthly_income.is_some() {
        args.target_amount = payload.target_amount;
        args.desired_monthly_income = payload.desired_monthly_income;
    }
    if let Some(v) = payload.withdrawal_rate {
        args.withdrawal_rate = v;
    }
    if let Some(v) = payload.mean_return {
        args.mean_return = v;
    }
    if let Some(v) = payload.volatility {
        args.volatility = v;
    }
    if let Some(v) = payload.trials {
        args.trials = v;
    }
    if let Some(v) = payload.max_months {
        args.max_months = v;
    }
    if let Some(v) = payload.track_paths {
        args.track_paths = v;
    }
    args.seed = payload.seed;

    args
}

fn project_args_from_payload(payload: ProjectPayload) -> ProjectArgs {
    let mut args = default_project_args();

    if let Some(v) = payload.cagr {
        args.cagr = v;
    }
    if let Some(v) = payload.volatility {
        args.volatility = v;
    }
    if let Some(v) = payload.horizon_years {
        args.horizon_years = v;
    }
    if let Some(v) = payload.trials {
        args.trials = v;
    }
    args.seed = payload.seed;

    args
}

fn default_simulate_args() -> SimulateArgs {
    SimulateArgs {
        starting_capital: 0.0,
        monthly_contribution: 1_000.0,
        target_amount: None,
        desired_monthly_income: Some(4_000.0),
        withdrawal_rate: 4.0,
        mean_return: 6.5,
        volatility: 15.0,
        trials: DEFAULT_TRIAL_COUNT,
        max_months: DEFAULT_MAX_PERIODS,
        track_paths: false,
        seed: None,
    }
}

fn default_project_args() -> ProjectArgs {
    ProjectArgs {
        cagr: 7.0,
        volatility: 15.0,
        horizon_years: 10,
        trials: 5_000,
        seed: None,
    }
}
