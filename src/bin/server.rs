//! Portfolio analytics HTTP server
//!
//! Reads `<TICKER>.parquet` price files from the configured data directory.
//!
//! Run: ANALYTICS_DATA_DIR=data/ticker_data_parquet cargo run --release --bin server
//! Test: curl -X POST http://localhost:3030/api/tvm -H "Content-Type: application/json" -d '{"pv":1000,"rate":0.05,"nper":10}'

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use portfolio_analytics::analysis::{
    self, AssetAnalysis, AssetAnalysisRequest, EfficientFrontier, FrontierRequest, OptimizationRequest,
    PortfolioOptimization,
};
use portfolio_analytics::backtest::{BacktestRequest, BacktestResponse, SensitivityRequest, SensitivityResponse};
use portfolio_analytics::tvm::{TvmRequest, TvmSolution};
use portfolio_analytics::{AnalyticsConfig, ApiResult, ParquetPriceProvider, PriceDataProvider};

// ============================================================================
// State
// ============================================================================

struct AppState {
    provider: Arc<dyn PriceDataProvider>,
    config: AnalyticsConfig,
}

type SharedState = Arc<AppState>;

/// Run a blocking computation off the async runtime and log its duration
async fn compute<T, F>(name: &'static str, f: F) -> Json<ApiResult<T>>
where
    T: Send + 'static,
    F: FnOnce() -> ApiResult<T> + Send + 'static,
{
    let start = Instant::now();
    let result = match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(endpoint = name, error = %e, "computation task failed");
            ApiResult::Err(format!("Internal error: {}", e))
        }
    };
    tracing::info!(
        endpoint = name,
        ok = result.is_ok(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request complete"
    );
    Json(result)
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
struct Banner {
    service: &'static str,
    version: &'static str,
}

async fn index() -> Json<Banner> {
    Json(Banner {
        service: "portfolio-analytics",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn backtest(State(state): State<SharedState>, Json(req): Json<BacktestRequest>) -> Json<ApiResult<BacktestResponse>> {
    compute("backtest", move || {
        analysis::run_backtest(state.provider.as_ref(), &req, &state.config)
    })
    .await
}

async fn asset_analyzer(
    State(state): State<SharedState>,
    Json(req): Json<AssetAnalysisRequest>,
) -> Json<ApiResult<AssetAnalysis>> {
    compute("asset-analyzer", move || {
        analysis::asset_analysis(state.provider.as_ref(), &req, &state.config)
    })
    .await
}

async fn portfolio_optimizer(
    State(state): State<SharedState>,
    Json(req): Json<OptimizationRequest>,
) -> Json<ApiResult<PortfolioOptimization>> {
    compute("portfolio-optimizer", move || {
        analysis::portfolio_optimization(state.provider.as_ref(), &req, &state.config)
    })
    .await
}

async fn efficient_frontier(
    State(state): State<SharedState>,
    Json(req): Json<FrontierRequest>,
) -> Json<ApiResult<EfficientFrontier>> {
    compute("efficient-frontier", move || {
        analysis::efficient_frontier(state.provider.as_ref(), &req, &state.config)
    })
    .await
}

async fn rebalancing_sensitivity(
    State(state): State<SharedState>,
    Json(req): Json<SensitivityRequest>,
) -> Json<ApiResult<SensitivityResponse>> {
    compute("rebalancing-sensitivity", move || {
        analysis::rebalancing_sensitivity(state.provider.as_ref(), &req, &state.config)
    })
    .await
}

async fn tvm(Json(req): Json<TvmRequest>) -> Json<ApiResult<TvmSolution>> {
    compute("tvm", move || analysis::time_value_of_money(&req)).await
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AnalyticsConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return Err(e.into());
        }
    };

    tracing::info!(data_dir = %config.data_dir, risk_free_rate = config.risk_free_rate, "configuration loaded");

    let addr: SocketAddr = config.bind_addr.parse()?;
    let provider = ParquetPriceProvider::new(&config.data_dir);
    let available = provider.list_tickers();
    if available.is_empty() {
        tracing::warn!(data_dir = %config.data_dir, "no parquet price files found");
    } else {
        tracing::info!(tickers = available.len(), "price files available");
    }

    let state = Arc::new(AppState {
        provider: Arc::new(provider),
        config,
    });

    let app = Router::new()
        .route("/", get(index))
        .route("/api/backtest", post(backtest))
        .route("/api/asset-analyzer", post(asset_analyzer))
        .route("/api/portfolio-optimizer", post(portfolio_optimizer))
        .route("/api/efficient-frontier", post(efficient_frontier))
        .route("/api/rebalancing-sensitivity", post(rebalancing_sensitivity))
        .route("/api/tvm", post(tvm))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state);

    tracing::info!("Portfolio analytics server on http://{}", addr);
    tracing::info!("  GET  /                              - service banner");
    tracing::info!("  POST /api/backtest                  - backtest one or more portfolios");
    tracing::info!("  POST /api/asset-analyzer            - single-asset statistics");
    tracing::info!("  POST /api/portfolio-optimizer       - min-vol and max-Sharpe weights");
    tracing::info!("  POST /api/efficient-frontier        - interpolated frontier");
    tracing::info!("  POST /api/rebalancing-sensitivity   - compare rebalance frequencies");
    tracing::info!("  POST /api/tvm                       - time value of money");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
