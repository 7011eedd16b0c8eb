// src/backtest/runner.rs
// Backtest runner - fetches prices once, simulates every portfolio, computes metrics

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::backtest::alignment::{align_prices, PriceMatrix};
use crate::backtest::calendar::RebalanceSchedule;
use crate::backtest::metrics::curve_metrics;
use crate::backtest::simulator::PortfolioSimulator;
use crate::backtest::types::*;
use crate::common::normalize_weights;
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::provider::PriceDataProvider;

const NOT_ENOUGH_DATA: &str =
    "Could not load enough price data for the given tickers and date range.";

/// Result of simulating one portfolio
struct PortfolioRun {
    curve: EquityCurve,
    metrics: Result<Metrics>,
}

/// Unique normalized tickers across all portfolios, first-seen order
fn collect_tickers(portfolios: &[Portfolio]) -> Vec<String> {
    let all: Vec<String> = portfolios.iter().flat_map(|p| p.tickers.iter().cloned()).collect();
    clean_tickers(&all)
}

/// Simulate one portfolio on the columns of the shared matrix it holds.
///
/// Returns `None` (and records a warning) when nothing can be simulated.
fn simulate_portfolio(
    portfolio: &Portfolio,
    matrix: &PriceMatrix,
    freq: RebalanceFrequency,
    starting_value: f64,
    config: &AnalyticsConfig,
    warnings: &mut Vec<BacktestWarning>,
) -> Option<PortfolioRun> {
    let targets = portfolio.targets();
    if targets.is_empty() {
        warnings.push(BacktestWarning::new(
            None,
            format!("{}: no tickers, skipped", portfolio.name),
        ));
        return None;
    }

    let tickers: Vec<String> = targets.iter().map(|(t, _)| t.clone()).collect();
    let Some(prices) = matrix.select(&tickers) else {
        tracing::warn!(portfolio = %portfolio.name, "portfolio skipped, no price data");
        warnings.push(BacktestWarning::new(
            None,
            format!("{}: no price data, skipped", portfolio.name),
        ));
        return None;
    };

    let missing: Vec<&str> = tickers
        .iter()
        .filter(|t| !prices.has_ticker(t))
        .map(|t| t.as_str())
        .collect();
    if !missing.is_empty() {
        warnings.push(BacktestWarning::new(
            None,
            format!("{}: no price data for {}, weights renormalized", portfolio.name, missing.join(", ")),
        ));
    }

    // Weights of the tickers that survived alignment, renormalized
    let raw_weights: Vec<f64> = prices
        .tickers()
        .iter()
        .filter_map(|t| targets.iter().find(|(name, _)| name == t).map(|(_, w)| *w))
        .collect();
    let weights = normalize_weights(&raw_weights);

    let schedule = RebalanceSchedule::build(freq, prices.dates());
    let sim = PortfolioSimulator::new(&prices, &weights, starting_value).run(&schedule);
    warnings.extend(sim.warnings.into_iter().map(|w| BacktestWarning {
        message: format!("{}: {}", portfolio.name, w.message),
        ..w
    }));

    tracing::debug!(
        portfolio = %portfolio.name,
        freq = %freq,
        rows = sim.curve.len(),
        rebalances = sim.rebalances,
        "simulated portfolio"
    );

    let metrics = curve_metrics(&sim.curve, config);
    Some(PortfolioRun {
        curve: sim.curve,
        metrics,
    })
}

/// Fetch prices for every ticker and align them on one shared date index
fn fetch_prices(
    provider: &dyn PriceDataProvider,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceMatrix> {
    let raw = provider.fetch(tickers, start, end);
    align_prices(&raw, tickers).map_err(|_| AnalyticsError::unavailable(NOT_ENOUGH_DATA))
}

/// Run a backtest for one or more portfolios.
pub fn run_backtest(
    provider: &dyn PriceDataProvider,
    request: &BacktestRequest,
    config: &AnalyticsConfig,
) -> Result<BacktestResponse> {
    validate_date_range(request.start_date, request.end_date)?;

    let tickers = collect_tickers(&request.portfolios);
    if tickers.is_empty() {
        return Err(AnalyticsError::invalid("At least one ticker required."));
    }

    let matrix = fetch_prices(provider, &tickers, request.start_date, request.end_date)?;

    let mut equity_curves = BTreeMap::new();
    let mut metrics = Vec::new();
    let mut warnings = Vec::new();

    for portfolio in &request.portfolios {
        let Some(run) = simulate_portfolio(
            portfolio,
            &matrix,
            request.rebalance_freq,
            request.starting_value,
            config,
            &mut warnings,
        ) else {
            continue;
        };

        metrics.push(match run.metrics {
            Ok(m) => PortfolioMetrics {
                name: portfolio.name.clone(),
                metrics: Some(m),
                error: None,
            },
            Err(e) => PortfolioMetrics {
                name: portfolio.name.clone(),
                metrics: None,
                error: Some(e.to_string()),
            },
        });
        equity_curves.insert(portfolio.name.clone(), run.curve);
    }

    tracing::info!(
        portfolios = metrics.len(),
        freq = %request.rebalance_freq,
        warnings = warnings.len(),
        "backtest complete"
    );

    Ok(BacktestResponse {
        equity_curves,
        metrics,
        warnings,
    })
}

/// Backtest one portfolio at every rebalance frequency, fetching prices once.
pub fn rebalancing_sensitivity(
    provider: &dyn PriceDataProvider,
    request: &SensitivityRequest,
    config: &AnalyticsConfig,
) -> Result<SensitivityResponse> {
    let tickers = clean_tickers(&request.tickers);
    if tickers.is_empty() {
        return Err(AnalyticsError::invalid("At least one ticker required."));
    }
    validate_date_range(request.start_date, request.end_date)?;

    // Weights only line up with the raw ticker list when nothing was cleaned away
    let weights = request
        .weights
        .clone()
        .filter(|w| w.len() == tickers.len() && tickers.len() == request.tickers.len());
    let portfolio = Portfolio {
        name: "Portfolio".to_string(),
        tickers: tickers.clone(),
        weights,
    };

    let matrix = fetch_prices(provider, &tickers, request.start_date, request.end_date)?;

    let mut results = Vec::new();
    let mut equity_curves = BTreeMap::new();
    let mut warnings = Vec::new();

    for freq in RebalanceFrequency::ALL {
        let Some(run) = simulate_portfolio(
            &portfolio,
            &matrix,
            freq,
            request.starting_value,
            config,
            &mut warnings,
        ) else {
            continue;
        };

        match run.metrics {
            Ok(m) => results.push(RebalanceComparison {
                rebalance_freq: freq,
                cagr: m.cagr,
                volatility: m.volatility,
                sharpe: m.sharpe,
                max_drawdown: m.max_drawdown,
                final_value: m.final_value,
            }),
            Err(e) => warnings.push(BacktestWarning::new(None, format!("{}: {}", freq, e))),
        }
        equity_curves.insert(freq, run.curve);
    }

    Ok(SensitivityResponse {
        tickers,
        results,
        equity_curves,
        warnings,
    })
}
