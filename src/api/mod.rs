use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    DEFAULT_TOP_PERCENT, MAX_AGENTS, SimError, SimulationConfig, SweepPoint, run_simulation,
    run_sweep,
};

#[derive(Parser, Debug)]
#[command(
    name = "wealthsim",
    about = "Wealth distribution under multiplicative shocks, elimination and flat-tax redistribution"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Log every round at debug level")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one simulation and print its summary
    Run(RunArgs),
    /// Run a volatility x tax-rate grid and print one summary per point
    Sweep(SweepArgs),
    /// Serve the JSON API
    Serve {
        #[arg(default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    #[arg(long, default_value_t = 10_000, help = "Number of agents")]
    agents: usize,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Agents whose wealth falls strictly below this are eliminated"
    )]
    survival_limit: f64,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Share of each agent's wealth taxed per round in percent"
    )]
    tax_rate: f64,
    #[arg(long, default_value_t = 10_000.0, help = "Initial wealth per agent")]
    starting_amount: f64,
    #[arg(
        long,
        default_value_t = 20.0,
        allow_negative_numbers = true,
        help = "Centre of the two-point growth shock in percent"
    )]
    expected_gain: f64,
    #[arg(
        long,
        default_value_t = 40.0,
        help = "Half-width of the two-point growth shock in percent"
    )]
    volatility: f64,
    #[arg(long, default_value_t = 1_000, help = "Number of rounds to simulate")]
    rounds: u32,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(
        long,
        default_value_t = DEFAULT_TOP_PERCENT,
        help = "Top percentile reported in the summary line"
    )]
    top_percent: f64,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    model: ModelArgs,
    #[arg(long, help = "Keep every round's wealth vector in the JSON output")]
    record_history: bool,
    #[arg(long, help = "Print the final sorted wealth, one agent per line")]
    print_wealth: bool,
    #[arg(long, help = "Print the full outcome as JSON")]
    json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    model: ModelArgs,
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [10.0, 20.0, 30.0, 40.0],
        help = "Comma-separated volatilities in percent; overrides --volatility"
    )]
    volatilities: Vec<f64>,
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [1.0, 5.0, 10.0, 20.0, 40.0],
        help = "Comma-separated tax rates in percent; overrides --tax-rate"
    )]
    tax_rates: Vec<f64>,
    #[arg(long, help = "Print every grid point as JSON")]
    json: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    agents: Option<usize>,
    survival_limit: Option<f64>,
    tax_rate: Option<f64>,
    starting_amount: Option<f64>,
    expected_gain: Option<f64>,
    volatility: Option<f64>,
    rounds: Option<u32>,
    seed: Option<u64>,
    top_percent: Option<f64>,
    record_history: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SweepPayload {
    #[serde(flatten)]
    model: SimulatePayload,
    volatilities: Option<Vec<f64>>,
    tax_rates: Option<Vec<f64>>,
}

#[derive(Debug)]
struct ApiRequest {
    config: SimulationConfig,
    top_percent: f64,
}

#[derive(Debug)]
struct SweepRequest {
    base: SimulationConfig,
    volatilities: Vec<f64>,
    tax_fractions: Vec<f64>,
    top_percent: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SweepResponse {
    top_percent: f64,
    points: Vec<SweepPoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_config(args: &ModelArgs) -> Result<SimulationConfig, String> {
    if args.agents == 0 {
        return Err("--agents must be > 0".to_string());
    }

    if args.agents > MAX_AGENTS {
        return Err(format!("--agents must be <= {MAX_AGENTS}"));
    }

    if !args.survival_limit.is_finite() || args.survival_limit < 0.0 {
        return Err("--survival-limit must be >= 0".to_string());
    }

    if !(0.0..100.0).contains(&args.tax_rate) {
        return Err("--tax-rate must be >= 0 and < 100".to_string());
    }

    if !args.starting_amount.is_finite() || args.starting_amount <= 0.0 {
        return Err("--starting-amount must be > 0".to_string());
    }

    if !args.expected_gain.is_finite() {
        return Err("--expected-gain must be a finite number".to_string());
    }

    if !args.volatility.is_finite() || args.volatility < 0.0 {
        return Err("--volatility must be >= 0".to_string());
    }

    if args.volatility - args.expected_gain > 100.0 {
        return Err("--volatility minus --expected-gain must not exceed 100".to_string());
    }

    if !(0.0..=100.0).contains(&args.top_percent) {
        return Err("--top-percent must be between 0 and 100".to_string());
    }

    let config = SimulationConfig {
        number_of_agents: args.agents,
        survival_limit: args.survival_limit,
        tax_fraction: args.tax_rate / 100.0,
        starting_amount: args.starting_amount,
        expected_gain: args.expected_gain / 100.0,
        volatility: args.volatility / 100.0,
        number_of_rounds: args.rounds,
        seed: args.seed,
        sort_final: true,
        record_history: false,
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn percent_grid(values: &[f64], flag: &str) -> Result<Vec<f64>, String> {
    if values.is_empty() {
        return Err(format!("{flag} needs at least one value"));
    }
    Ok(values.iter().map(|v| v / 100.0).collect())
}

fn build_sweep_request(
    args: &ModelArgs,
    volatilities: &[f64],
    tax_rates: &[f64],
) -> Result<SweepRequest, String> {
    // The grid replaces --volatility and --tax-rate, so only the grid values are checked.
    let shared = ModelArgs {
        volatility: 0.0,
        tax_rate: 0.0,
        ..args.clone()
    };
    let base = build_config(&shared)?;
    let volatilities = percent_grid(volatilities, "--volatilities")?;
    let tax_fractions = percent_grid(tax_rates, "--tax-rates")?;

    for &volatility in &volatilities {
        for &tax_fraction in &tax_fractions {
            SimulationConfig {
                volatility,
                tax_fraction,
                ..base.clone()
            }
            .validate()
            .map_err(|e| format!("--volatilities / --tax-rates: {e}"))?;
        }
    }

    Ok(SweepRequest {
        base,
        volatilities,
        tax_fractions,
        top_percent: args.top_percent,
    })
}

pub fn run_once(args: RunArgs) -> Result<(), String> {
    let mut config = build_config(&args.model)?;
    config.record_history = args.record_history;
    config.validate().map_err(|e| e.to_string())?;
    let outcome = run_simulation(config, args.model.top_percent).map_err(|e| e.to_string())?;

    if args.json {
        let json = serde_json::to_string_pretty(&outcome)
            .map_err(|e| format!("Failed to serialize outcome: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    if args.print_wealth {
        for wealth in &outcome.wealth {
            println!("{wealth}");
        }
    }
    println!("{}", outcome.summary.line);
    Ok(())
}

pub fn run_grid(args: SweepArgs) -> Result<(), String> {
    let request = build_sweep_request(&args.model, &args.volatilities, &args.tax_rates)?;
    let points = run_sweep(
        &request.base,
        &request.volatilities,
        &request.tax_fractions,
        request.top_percent,
    )
    .map_err(|e| e.to_string())?;

    if args.json {
        let response = SweepResponse {
            top_percent: request.top_percent,
            points,
        };
        let json = serde_json::to_string_pretty(&response)
            .map_err(|e| format!("Failed to serialize sweep: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    for point in &points {
        println!(
            "volatility={} taxFraction={}: {}",
            point.volatility, point.tax_fraction, point.summary.line
        );
    }
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/sweep", post(sweep_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "wealthsim HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
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
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match run_simulation(request.config, request.top_percent) {
        Ok(outcome) => json_response(StatusCode::OK, outcome),
        Err(err) => sim_error_response(&err),
    }
}

async fn sweep_handler(Json(payload): Json<SweepPayload>) -> Response {
    let request = match sweep_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match run_sweep(
        &request.base,
        &request.volatilities,
        &request.tax_fractions,
        request.top_percent,
    ) {
        Ok(points) => json_response(
            StatusCode::OK,
            SweepResponse {
                top_percent: request.top_percent,
                points,
            },
        ),
        Err(err) => sim_error_response(&err),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
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

fn sim_error_response(err: &SimError) -> Response {
    let status = match err {
        SimError::Configuration { .. } => StatusCode::BAD_REQUEST,
        SimError::DegenerateState { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SimError::InvalidRunState { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn apply_payload(args: &mut ModelArgs, payload: &SimulatePayload) {
    if let Some(v) = payload.agents {
        args.agents = v;
    }
    if let Some(v) = payload.survival_limit {
        args.survival_limit = v;
    }
    if let Some(v) = payload.tax_rate {
        args.tax_rate = v;
    }
    if let Some(v) = payload.starting_amount {
        args.starting_amount = v;
    }
    if let Some(v) = payload.expected_gain {
        args.expected_gain = v;
    }
    if let Some(v) = payload.volatility {
        args.volatility = v;
    }
    if let Some(v) = payload.rounds {
        args.rounds = v;
    }
    if let Some(v) = payload.seed {
        args.seed = v;
    }
    if let Some(v) = payload.top_percent {
        args.top_percent = v;
    }
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut args = default_args_for_api();
    apply_payload(&mut args, &payload);

    let mut config = build_config(&args)?;
    config.record_history = payload.record_history.unwrap_or(false);
    config.validate().map_err(|e| e.to_string())?;
    Ok(ApiRequest {
        config,
        top_percent: args.top_percent,
    })
}

fn sweep_request_from_payload(payload: SweepPayload) -> Result<SweepRequest, String> {
    let mut args = default_args_for_api();
    apply_payload(&mut args, &payload.model);

    let volatilities = payload
        .volatilities
        .unwrap_or_else(|| vec![10.0, 20.0, 30.0, 40.0]);
    let tax_rates = payload
        .tax_rates
        .unwrap_or_else(|| vec![1.0, 5.0, 10.0, 20.0, 40.0]);
    build_sweep_request(&args, &volatilities, &tax_rates)
}

fn default_args_for_api() -> ModelArgs {
    ModelArgs {
        agents: 10_000,
        survival_limit: 1.0,
        tax_rate: 5.0,
        starting_amount: 10_000.0,
        expected_gain: 20.0,
        volatility: 40.0,
        rounds: 1_000,
        seed: 42,
        top_percent: DEFAULT_TOP_PERCENT,
    }
}
