mod prompt;
mod report;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use std::io::{self, Write};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::core::{
    DEFAULT_HISTOGRAM_BINS, Histogram, SimulationError, SimulationParameters, SummaryStatistics,
    YearBand, entropy_seed, generate, histogram, summarize, summarize_by_year,
};

pub use prompt::{InvalidAnswer, PromptValue, parse_answer, prompt_cli, prompt_value};
pub use report::{format_currency, render_summary};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

/// Upper bound on table cells for a single run.
const MAX_TABLE_CELLS: u64 = 50_000_000;
const MAX_HISTOGRAM_BINS: usize = 10_000;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "horizon",
    about = "Monte Carlo estimator for long-horizon investment growth (log-normal annual returns)",
    after_help = "Run `horizon serve [port]` to start the HTTP API and chart page."
)]
pub struct Cli {
    #[arg(long, default_value_t = 10_000.0, help = "Initial investment amount")]
    initial_investment: f64,
    #[arg(long, default_value_t = 30, help = "Number of years to simulate")]
    years: u32,
    #[arg(
        long,
        default_value_t = 7.0,
        allow_negative_numbers = true,
        help = "Expected average annual log-return in percent, e.g. 7"
    )]
    mean_return: f64,
    #[arg(
        long,
        default_value_t = 15.0,
        help = "Annual volatility (standard deviation of log-returns) in percent"
    )]
    volatility: f64,
    #[arg(long, default_value_t = 10_000, help = "Number of simulated paths")]
    simulations: u32,
    #[arg(
        long,
        default_value_t = 100,
        help = "Number of paths included for line charts (0 for none)"
    )]
    plot_paths: u32,
    #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS, help = "Terminal value histogram bins")]
    histogram_bins: usize,
    #[arg(long, help = "Seed for reproducible runs; random when omitted")]
    seed: Option<u64>,
    #[arg(long, help = "Prompt for each parameter on the terminal")]
    interactive: bool,
    #[arg(long, help = "Print the full report as JSON")]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    pub params: SimulationParameters,
    pub plot_paths: usize,
    pub histogram_bins: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub parameters: SimulationParameters,
    /// Serialized as a string so JavaScript clients keep all 64 bits.
    #[serde(serialize_with = "seed_as_string")]
    pub seed: u64,
    pub summary: SummaryStatistics,
    pub year_bands: Vec<YearBand>,
    pub paths: Vec<Vec<f64>>,
    /// `None` when no terminal value is finite.
    pub histogram: Option<Histogram>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_investment: Option<f64>,
    years: Option<u32>,
    mean_return: Option<f64>,
    volatility: Option<f64>,
    simulations: Option<u32>,
    plot_paths: Option<u32>,
    histogram_bins: Option<usize>,
    #[serde(deserialize_with = "seed_from_number_or_string")]
    seed: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedField {
    Number(u64),
    Text(String),
}

fn seed_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<SeedField>::deserialize(deserializer)? {
        None => Ok(None),
        Some(SeedField::Number(seed)) => Ok(Some(seed)),
        Some(SeedField::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(SeedField::Text(text)) => text.trim().parse::<u64>().map(Some).map_err(|_| {
            D::Error::custom(format!(
                "seed must be an unsigned 64-bit integer, got `{text}`"
            ))
        }),
    }
}

fn seed_as_string<S: Serializer>(seed: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(seed)
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("HORIZON_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

pub fn build_config(cli: &Cli) -> Result<RunConfig, String> {
    if !cli.initial_investment.is_finite() || cli.initial_investment <= 0.0 {
        return Err("--initial-investment must be > 0".to_string());
    }

    if cli.years == 0 {
        return Err("--years must be >= 1".to_string());
    }

    if cli.simulations == 0 {
        return Err("--simulations must be > 0".to_string());
    }

    if !cli.mean_return.is_finite() {
        return Err("--mean-return must be a finite number".to_string());
    }

    if !cli.volatility.is_finite() || cli.volatility < 0.0 {
        return Err("--volatility must be >= 0".to_string());
    }

    if cli.histogram_bins == 0 || cli.histogram_bins > MAX_HISTOGRAM_BINS {
        return Err(format!(
            "--histogram-bins must be between 1 and {MAX_HISTOGRAM_BINS}"
        ));
    }

    let cells = cli.simulations as u64 * (cli.years as u64 + 1);
    if cells > MAX_TABLE_CELLS {
        return Err(format!(
            "--simulations x (--years + 1) must be <= {MAX_TABLE_CELLS}"
        ));
    }

    Ok(RunConfig {
        params: SimulationParameters {
            initial_investment: cli.initial_investment,
            years: cli.years,
            mu: cli.mean_return / 100.0,
            sigma: cli.volatility / 100.0,
            simulation_count: cli.simulations,
        },
        plot_paths: cli.plot_paths.min(cli.simulations) as usize,
        histogram_bins: cli.histogram_bins,
        seed: cli.seed,
    })
}

pub fn run_simulation(config: &RunConfig) -> Result<SimulationReport, SimulationError> {
    let seed = config.seed.unwrap_or_else(entropy_seed);
    let table = generate(&config.params, Some(seed))?;
    let terminal = table.terminal_values();

    let terminal_histogram = match histogram(&terminal, config.histogram_bins) {
        Ok(h) => Some(h),
        // every path overflowed to infinity
        Err(SimulationError::EmptyInput) => None,
        Err(err) => return Err(err),
    };

    let report = SimulationReport {
        parameters: config.params,
        seed,
        summary: summarize(&terminal)?,
        year_bands: summarize_by_year(&table),
        paths: table.select_paths(config.plot_paths),
        histogram: terminal_histogram,
    };

    tracing::info!(
        seed,
        simulations = config.params.simulation_count,
        years = config.params.years,
        median = report.summary.median,
        "simulation complete"
    );
    Ok(report)
}

/// Entry point for the one-shot command line run.
pub fn run_cli(cli: Cli) -> Result<(), String> {
    let cli = if cli.interactive {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        prompt_cli(cli, &mut stdin.lock(), &mut stdout)
            .map_err(|e| format!("failed to read parameters: {e}"))?
    } else {
        cli
    };

    let config = build_config(&cli)?;
    let report = run_simulation(&config).map_err(|e| e.to_string())?;

    let mut out = io::stdout().lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut out, &report)
            .map_err(|e| format!("failed to write report: {e}"))?;
        writeln!(out).map_err(|e| format!("failed to write report: {e}"))?;
    } else {
        out.write_all(render_summary(&report.summary).as_bytes())
            .map_err(|e| format!("failed to write report: {e}"))?;
    }
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "horizon HTTP API listening");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
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

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let config = match config_from_payload(payload) {
        Ok(config) => config,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match tokio::task::spawn_blocking(move || run_simulation(&config)).await {
        Ok(Ok(report)) => json_response(StatusCode::OK, report),
        Ok(Err(err)) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
        Err(err) => {
            tracing::error!(%err, "simulation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
    }
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
fn config_from_json(json: &str) -> Result<RunConfig, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    config_from_payload(payload)
}

fn config_from_payload(payload: SimulatePayload) -> Result<RunConfig, String> {
    let mut cli = default_cli();

    if let Some(v) = payload.initial_investment {
        cli.initial_investment = v;
    }
    if let Some(v) = payload.years {
        cli.years = v;
    }
    if let Some(v) = payload.mean_return {
        cli.mean_return = v;
    }
    if let Some(v) = payload.volatility {
        cli.volatility = v;
    }
    if let Some(v) = payload.simulations {
        cli.simulations = v;
    }
    if let Some(v) = payload.plot_paths {
        cli.plot_paths = v;
    }
    if let Some(v) = payload.histogram_bins {
        cli.histogram_bins = v;
    }
    cli.seed = payload.seed;

    build_config(&cli)
}

pub(crate) fn default_cli() -> Cli {
    Cli {
        initial_investment: 10_000.0,
        years: 30,
        mean_return: 7.0,
        volatility: 15.0,
        simulations: 10_000,
        plot_paths: 100,
        histogram_bins: DEFAULT_HISTOGRAM_BINS,
        seed: None,
        interactive: false,
        json: false,
    }
}
