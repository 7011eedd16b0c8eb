//! Computation entry points
//!
//! Each function validates its request, pulls prices through a
//! [`PriceDataProvider`] and returns an [`ApiResult`]: the populated payload
//! or an error message, never both.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backtest::alignment::{align_prices, PriceMatrix};
use crate::backtest::metrics::calculate_metrics;
use crate::backtest::runner;
use crate::backtest::types::{
    clean_tickers, default_end_date, default_start_date, normalize_ticker, validate_date_range,
    BacktestRequest, BacktestResponse, Metrics, SensitivityRequest, SensitivityResponse,
};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, ApiResult, Result};
use crate::optimize::{sample_frontier, FrontierPoint, MeanVarianceOptimizer, OptimizationResult, ReturnStats};
use crate::provider::PriceDataProvider;
use crate::tvm::{self, TvmRequest, TvmSolution};

// ============================================================================
// Requests & responses
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AssetAnalysisRequest {
    pub ticker: String,
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetAnalysis {
    pub ticker: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizationRequest {
    pub tickers: Vec<String>,
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioOptimization {
    pub tickers: Vec<String>,
    pub min_volatility: OptimizationResult,
    pub max_sharpe: OptimizationResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrontierRequest {
    pub tickers: Vec<String>,
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub num_points: Option<usize>,
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EfficientFrontier {
    pub tickers: Vec<String>,
    pub frontier: Vec<FrontierPoint>,
    pub min_vol_return: f64,
    pub max_sharpe_return: f64,
}

// ============================================================================
// Helpers
// ============================================================================

/// Fetch and align prices, replacing any alignment failure with `message`
fn load_prices(
    provider: &dyn PriceDataProvider,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
    message: &str,
) -> Result<PriceMatrix> {
    let raw = provider.fetch(tickers, start, end);
    align_prices(&raw, tickers).map_err(|e| {
        tracing::debug!(error = %e, "alignment failed");
        AnalyticsError::unavailable(message)
    })
}

/// Shared validation and return estimation for the optimizer endpoints
fn load_return_stats(
    provider: &dyn PriceDataProvider,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
    config: &AnalyticsConfig,
) -> Result<ReturnStats> {
    let tickers = clean_tickers(tickers);
    if tickers.len() < 2 {
        return Err(AnalyticsError::invalid("At least 2 tickers required."));
    }
    validate_date_range(start, end)?;

    let prices = load_prices(provider, &tickers, start, end, "Could not load price data.")?;
    ReturnStats::from_prices(&prices, config.trading_days_per_year)
}

// ============================================================================
// Entry points
// ============================================================================

fn try_asset_analysis(
    provider: &dyn PriceDataProvider,
    request: &AssetAnalysisRequest,
    config: &AnalyticsConfig,
) -> Result<AssetAnalysis> {
    let ticker = normalize_ticker(&request.ticker);
    if ticker.is_empty() {
        return Err(AnalyticsError::invalid("Ticker required."));
    }
    validate_date_range(request.start_date, request.end_date)?;

    let prices = load_prices(
        provider,
        std::slice::from_ref(&ticker),
        request.start_date,
        request.end_date,
        "Could not load price data for this ticker and date range.",
    )?;
    let values = prices
        .column(&ticker)
        .ok_or_else(|| AnalyticsError::unavailable("Could not load price data for this ticker and date range."))?;
    let metrics = calculate_metrics(prices.dates(), values, config)?;

    Ok(AssetAnalysis { ticker, metrics })
}

/// Single-asset statistics: CAGR, volatility, Sharpe, drawdown, rolling 1-year return
pub fn asset_analysis(
    provider: &dyn PriceDataProvider,
    request: &AssetAnalysisRequest,
    config: &AnalyticsConfig,
) -> ApiResult<AssetAnalysis> {
    try_asset_analysis(provider, request, config).into()
}

fn try_portfolio_optimization(
    provider: &dyn PriceDataProvider,
    request: &OptimizationRequest,
    config: &AnalyticsConfig,
) -> Result<PortfolioOptimization> {
    let config = config.with_risk_free_rate(request.risk_free_rate);
    let stats = load_return_stats(provider, &request.tickers, request.start_date, request.end_date, &config)?;
    let optimizer = MeanVarianceOptimizer::new(&stats, config.risk_free_rate)?;

    Ok(PortfolioOptimization {
        tickers: stats.tickers.clone(),
        min_volatility: optimizer.min_volatility(),
        max_sharpe: optimizer.max_sharpe(),
    })
}

/// Minimum-volatility and maximum-Sharpe weights
pub fn portfolio_optimization(
    provider: &dyn PriceDataProvider,
    request: &OptimizationRequest,
    config: &AnalyticsConfig,
) -> ApiResult<PortfolioOptimization> {
    try_portfolio_optimization(provider, request, config).into()
}

fn try_efficient_frontier(
    provider: &dyn PriceDataProvider,
    request: &FrontierRequest,
    config: &AnalyticsConfig,
) -> Result<EfficientFrontier> {
    let num_points = request.num_points.unwrap_or(config.default_frontier_points);
    if num_points == 0 {
        return Err(AnalyticsError::invalid("num_points must be at least 1."));
    }
    if num_points > config.max_frontier_points {
        return Err(AnalyticsError::invalid(format!(
            "num_points must be at most {}.",
            config.max_frontier_points
        )));
    }

    let config = config.with_risk_free_rate(request.risk_free_rate);
    let stats = load_return_stats(provider, &request.tickers, request.start_date, request.end_date, &config)?;
    let optimizer = MeanVarianceOptimizer::new(&stats, config.risk_free_rate)?;

    Ok(EfficientFrontier {
        tickers: stats.tickers.clone(),
        frontier: sample_frontier(&optimizer, num_points)?,
        min_vol_return: optimizer.stats(&optimizer.min_volatility_weights()).expected_return,
        max_sharpe_return: optimizer.stats(&optimizer.max_sharpe_weights()).expected_return,
    })
}

/// Return / volatility grid between the min-vol and max-Sharpe portfolios
pub fn efficient_frontier(
    provider: &dyn PriceDataProvider,
    request: &FrontierRequest,
    config: &AnalyticsConfig,
) -> ApiResult<EfficientFrontier> {
    try_efficient_frontier(provider, request, config).into()
}

pub fn run_backtest(
    provider: &dyn PriceDataProvider,
    request: &BacktestRequest,
    config: &AnalyticsConfig,
) -> ApiResult<BacktestResponse> {
    runner::run_backtest(provider, request, config).into()
}

pub fn rebalancing_sensitivity(
    provider: &dyn PriceDataProvider,
    request: &SensitivityRequest,
    config: &AnalyticsConfig,
) -> ApiResult<SensitivityResponse> {
    runner::rebalancing_sensitivity(provider, request, config).into()
}

pub fn time_value_of_money(request: &TvmRequest) -> ApiResult<TvmSolution> {
    tvm::solve(request).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryPriceProvider;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn provider() -> InMemoryPriceProvider {
        let dates: Vec<NaiveDate> = d(2020, 1, 1).iter_days().take(300).collect();
        let series = |f: &dyn Fn(f64) -> f64| -> Vec<(NaiveDate, f64)> {
            dates.iter().enumerate().map(|(i, d)| (*d, f(i as f64))).collect()
        };
        InMemoryPriceProvider::new()
            .with_series("A", series(&|i| 100.0 + i + 3.0 * (i / 3.0).sin()))
            .with_series("B", series(&|i| 80.0 + 0.5 * i + 2.0 * (i / 5.0).cos()))
    }

    #[test]
    fn test_asset_analysis() {
        let req = AssetAnalysisRequest {
            ticker: " a ".into(),
            start_date: d(2020, 1, 1),
            end_date: d(2021, 1, 1),
        };
        let result = asset_analysis(&provider(), &req, &AnalyticsConfig::default());
        let analysis = result.ok().unwrap();
        assert_eq!(analysis.ticker, "A");
        assert!(analysis.metrics.rolling_1y.is_some());
    }

    #[test]
    fn test_asset_analysis_errors() {
        let req = AssetAnalysisRequest {
            ticker: "A".into(),
            start_date: d(2021, 1, 1),
            end_date: d(2020, 1, 1),
        };
        let result = asset_analysis(&provider(), &req, &AnalyticsConfig::default());
        assert_eq!(result.error(), Some("Start date must be before end date."));

        let req = AssetAnalysisRequest {
            ticker: "  ".into(),
            start_date: d(2020, 1, 1),
            end_date: d(2021, 1, 1),
        };
        let result = asset_analysis(&provider(), &req, &AnalyticsConfig::default());
        assert_eq!(result.error(), Some("Ticker required."));
    }

    #[test]
    fn test_optimization_weights_sum_to_one() {
        let req = OptimizationRequest {
            tickers: vec!["A".into(), "B".into()],
            start_date: d(2020, 1, 1),
            end_date: d(2021, 1, 1),
            risk_free_rate: None,
        };
        let result = portfolio_optimization(&provider(), &req, &AnalyticsConfig::default())
            .ok()
            .unwrap();
        let sum: f64 = result.min_volatility.weights.iter().map(|w| w.weight).sum();
        assert!((sum - 1.0).abs() < 1e-6);
        let sum: f64 = result.max_sharpe.weights.iter().map(|w| w.weight).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_optimization_needs_two_tickers() {
        let req = OptimizationRequest {
            tickers: vec!["A".into(), "a".into()],
            start_date: d(2020, 1, 1),
            end_date: d(2021, 1, 1),
            risk_free_rate: None,
        };
        let result = portfolio_optimization(&provider(), &req, &AnalyticsConfig::default());
        assert_eq!(result.error(), Some("At least 2 tickers required."));

        let req = OptimizationRequest {
            tickers: vec!["A".into(), "ZZZ".into()],
            ..req
        };
        let result = portfolio_optimization(&provider(), &req, &AnalyticsConfig::default());
        assert_eq!(result.error(), Some("Need at least 2 assets with data."));
    }

    #[test]
    fn test_frontier_default_points() {
        let req = FrontierRequest {
            tickers: vec!["A".into(), "B".into()],
            start_date: d(2020, 1, 1),
            end_date: d(2021, 1, 1),
            num_points: None,
            risk_free_rate: Some(0.0),
        };
        let result = efficient_frontier(&provider(), &req, &AnalyticsConfig::default())
            .ok()
            .unwrap();
        assert_eq!(result.frontier.len(), 51);
    }

    #[test]
    fn test_frontier_point_count_is_capped() {
        let req = FrontierRequest {
            tickers: vec!["A".into(), "B".into()],
            start_date: d(2020, 1, 1),
            end_date: d(2021, 1, 1),
            num_points: Some(1_000_000_000),
            risk_free_rate: None,
        };
        let config = AnalyticsConfig::default();
        let result = efficient_frontier(&provider(), &req, &config);
        assert_eq!(result.error(), Some("num_points must be at most 1000."));

        let req = FrontierRequest {
            num_points: Some(config.max_frontier_points),
            ..req
        };
        assert_eq!(efficient_frontier(&provider(), &req, &config).ok().unwrap().frontier.len(), 1001);
    }

    #[test]
    fn test_tvm_entry_point() {
        let req = TvmRequest {
            pv: Some(-1000.0),
            rate: Some(0.05),
            nper: Some(10.0),
            ..Default::default()
        };
        let sol = time_value_of_money(&req).ok().unwrap();
        assert!((sol.fv.abs() - 1628.89).abs() < 0.01);
    }
}
