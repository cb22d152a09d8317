use std::path::PathBuf;
use std::time::Instant;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    EngineError, SimulationConfig, SummaryRow, run_parallel, run_sequential, summarize, write_csv,
};

#[derive(Parser, Debug)]
#[command(
    name = "otesim",
    about = "Monte Carlo open-trade-equity estimator (GBM with regime-switching stress volatility)"
)]
struct Cli {
    #[arg(long, default_value_t = 100.0, help = "Entry price of the instrument")]
    initial_price: f64,
    #[arg(long, default_value_t = 5.0, help = "Expected annual return in percent")]
    drift: f64,
    #[arg(
        long,
        default_value_t = 20.0,
        help = "Baseline annual volatility in percent"
    )]
    volatility: f64,
    #[arg(
        long,
        default_value_t = 252,
        help = "Horizon in trading days; step size is one horizon fraction"
    )]
    horizon_days: usize,
    #[arg(
        long,
        default_value_t = -2.0,
        help = "Single-step return that triggers the stress regime, in percent"
    )]
    stress_threshold: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Volatility multiplier while the stress regime is active"
    )]
    stress_multiplier: f64,
    #[arg(
        long,
        default_value_t = 10,
        help = "Stress regime duration in steps"
    )]
    stress_duration: u32,
    #[arg(long, default_value_t = 1000.0, help = "Units of instrument held")]
    position_size: f64,
    #[arg(long, default_value_t = 100_000)]
    simulations: usize,
    #[arg(
        long,
        default_value_t = 0,
        help = "Worker count; 0 uses hardware concurrency"
    )]
    workers: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value = "sequential_results.csv")]
    sequential_output: PathBuf,
    #[arg(long, default_value = "parallel_results.csv")]
    parallel_output: PathBuf,
    #[arg(
        long,
        default_value_t = false,
        help = "Skip the sequential baseline and the speedup report"
    )]
    skip_sequential: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_price: Option<f64>,
    drift: Option<f64>,
    volatility: Option<f64>,
    horizon_days: Option<usize>,
    stress_threshold: Option<f64>,
    stress_multiplier: Option<f64>,
    stress_duration: Option<u32>,
    position_size: Option<f64>,
    simulations: Option<usize>,
    workers: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    simulations: usize,
    workers: usize,
    horizon_days: usize,
    seed: u64,
    elapsed_seconds: f64,
    rows: Vec<SummaryRow>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_config(cli: &Cli) -> Result<SimulationConfig, String> {
    if !cli.initial_price.is_finite() || cli.initial_price <= 0.0 {
        return Err("--initial-price must be > 0".to_string());
    }

    if cli.horizon_days == 0 {
        return Err("--horizon-days must be > 0".to_string());
    }

    if !cli.drift.is_finite() {
        return Err("--drift must be finite".to_string());
    }

    if !cli.volatility.is_finite() || cli.volatility < 0.0 {
        return Err("--volatility must be >= 0".to_string());
    }

    if !cli.stress_threshold.is_finite() || cli.stress_threshold >= 0.0 {
        return Err("--stress-threshold must be negative".to_string());
    }

    if !cli.stress_multiplier.is_finite() || cli.stress_multiplier <= 1.0 {
        return Err("--stress-multiplier must be > 1".to_string());
    }

    if cli.stress_duration == 0 {
        return Err("--stress-duration must be > 0".to_string());
    }

    if !cli.position_size.is_finite() {
        return Err("--position-size must be finite".to_string());
    }

    if cli.simulations == 0 {
        return Err("--simulations must be > 0".to_string());
    }

    let workers = if cli.workers == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        cli.workers
    };

    Ok(SimulationConfig {
        initial_price: cli.initial_price,
        annual_drift: cli.drift / 100.0,
        annual_volatility: cli.volatility / 100.0,
        horizon_steps: cli.horizon_days,
        dt: 1.0 / cli.horizon_days as f64,
        stress_threshold: cli.stress_threshold / 100.0,
        stress_multiplier: cli.stress_multiplier,
        stress_duration: cli.stress_duration,
        position_size: cli.position_size,
        simulations: cli.simulations,
        workers,
        seed: cli.seed,
    })
}

/// Parses command-line flags and runs the batch pipeline: a timed sequential
/// baseline, a timed parallel run, one CSV per run, and the speedup ratio.
pub fn run_batch_cli() -> Result<(), String> {
    run_batch(Cli::parse())
}

fn run_batch(cli: Cli) -> Result<(), String> {
    let config = build_config(&cli)?;

    let sequential_elapsed = if cli.skip_sequential {
        None
    } else {
        println!(
            "Starting sequential simulation ({} paths)...",
            config.simulations
        );
        let start = Instant::now();
        let matrix = run_sequential(&config).map_err(|e| e.to_string())?;
        let elapsed = start.elapsed().as_secs_f64();
        println!("Sequential run finished in {elapsed:.2}s.");

        write_csv(&cli.sequential_output, &summarize(&matrix))
            .map_err(|e| format!("failed to write {}: {e}", cli.sequential_output.display()))?;
        println!("Statistics saved to {}", cli.sequential_output.display());
        Some(elapsed)
    };

    println!(
        "Starting parallel simulation on {} workers...",
        config.workers
    );
    let start = Instant::now();
    let matrix = run_parallel(&config).map_err(|e| e.to_string())?;
    let parallel_elapsed = start.elapsed().as_secs_f64();
    println!("Parallel run finished in {parallel_elapsed:.2}s.");

    write_csv(&cli.parallel_output, &summarize(&matrix))
        .map_err(|e| format!("failed to write {}: {e}", cli.parallel_output.display()))?;
    println!("Statistics saved to {}", cli.parallel_output.display());

    if let Some(sequential) = sequential_elapsed {
        if parallel_elapsed > 0.0 {
            println!("Speedup: {:.2}x", sequential / parallel_elapsed);
        }
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
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("OTE simulator API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let config = match config_from_payload(payload) {
        Ok(config) => config,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let start = Instant::now();
    let matrix = match run_parallel(&config) {
        Ok(matrix) => matrix,
        Err(EngineError::Config(msg)) => return error_response(StatusCode::BAD_REQUEST, &msg),
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };
    let elapsed_seconds = start.elapsed().as_secs_f64();

    let response = SimulateResponse {
        simulations: config.simulations,
        workers: config.workers,
        horizon_days: config.horizon_steps,
        seed: config.seed,
        elapsed_seconds,
        rows: summarize(&matrix),
    };
    json_response(StatusCode::OK, response)
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

#[cfg(test)]
fn config_from_json(json: &str) -> Result<SimulationConfig, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    config_from_payload(payload)
}

/// Overlays payload fields (same percent-denominated units as the CLI flags)
/// on top of the CLI defaults, then validates.
fn config_from_payload(payload: SimulatePayload) -> Result<SimulationConfig, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.initial_price {
        cli.initial_price = v;
    }
    if let Some(v) = payload.drift {
        cli.drift = v;
    }
    if let Some(v) = payload.volatility {
        cli.volatility = v;
    }
    if let Some(v) = payload.horizon_days {
        cli.horizon_days = v;
    }
    if let Some(v) = payload.stress_threshold {
        cli.stress_threshold = v;
    }
    if let Some(v) = payload.stress_multiplier {
        cli.stress_multiplier = v;
    }
    if let Some(v) = payload.stress_duration {
        cli.stress_duration = v;
    }
    if let Some(v) = payload.position_size {
        cli.position_size = v;
    }
    if let Some(v) = payload.simulations {
        cli.simulations = v;
    }
    if let Some(v) = payload.workers {
        cli.workers = v;
    }
    if let Some(v) = payload.seed {
        cli.seed = v;
    }

    build_config(&cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        initial_price: 100.0,
        drift: 5.0,
        volatility: 20.0,
        horizon_days: 252,
        stress_threshold: -2.0,
        stress_multiplier: 3.0,
        stress_duration: 10,
        position_size: 1000.0,
        simulations: 10_000,
        workers: 0,
        seed: 42,
        sequential_output: PathBuf::from("sequential_results.csv"),
        parallel_output: PathBuf::from("parallel_results.csv"),
        skip_sequential: false,
    }
}
