//! # Portfolio Analytics
//!
//! Portfolio performance and optimization statistics from historical prices.
//!
//! ## Features
//! - Backtests with periodic rebalancing (daily to yearly)
//! - CAGR, volatility, Sharpe, drawdown and rolling 1-year returns
//! - Minimum-volatility / maximum-Sharpe weights and an efficient frontier
//! - Time-value-of-money solver
//! - Compiles to native and WASM
//!
//! ## Example
//! ```
//! use portfolio_analytics::tvm::{TvmRequest, solve};
//!
//! let req = TvmRequest { pv: Some(1000.0), rate: Some(0.05), nper: Some(10.0), ..Default::default() };
//! let solution = solve(&req).unwrap();
//! assert!((solution.fv - 1628.89).abs() < 0.01);
//! ```

pub mod common;
pub mod config;
pub mod error;
pub mod backtest;
pub mod optimize;
pub mod provider;
pub mod tvm;
pub mod analysis;

// Re-export commonly used items at crate root
pub use analysis::{
    asset_analysis, efficient_frontier, portfolio_optimization, rebalancing_sensitivity, run_backtest,
    time_value_of_money, AssetAnalysisRequest, FrontierRequest, OptimizationRequest,
};
pub use backtest::{BacktestRequest, Portfolio, RebalanceFrequency, SensitivityRequest};
pub use crate::config::AnalyticsConfig;
pub use error::{AnalyticsError, ApiResult};
pub use provider::{InMemoryPriceProvider, ParquetPriceProvider, PriceDataProvider};
pub use tvm::TvmRequest;

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

/// WASM bindings for browser/Node.js use
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct Analytics;

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl Analytics {
    // Series metrics
    #[wasm_bindgen]
    pub fn max_drawdown(values: &[f64]) -> f64 {
        backtest::metrics::calculate_max_drawdown(values)
    }

    #[wasm_bindgen]
    pub fn drawdown(values: &[f64]) -> Vec<f64> {
        backtest::metrics::drawdown_series(values)
    }

    /// Annualized volatility of a price series
    #[wasm_bindgen]
    pub fn volatility(prices: &[f64]) -> f64 {
        backtest::metrics::annualized_volatility(&common::pct_change(prices), config::TRADING_DAYS_PER_YEAR)
    }

    // TVM
    #[wasm_bindgen]
    pub fn future_value(pv: f64, rate: f64, nper: f64, pmt: f64) -> f64 {
        tvm::future_value(pv, rate, nper, pmt)
    }

    #[wasm_bindgen]
    pub fn present_value(fv: f64, rate: f64, nper: f64, pmt: f64) -> f64 {
        tvm::present_value(fv, rate, nper, pmt)
    }

    /// `NaN` when no rate in the search bracket solves the inputs
    #[wasm_bindgen]
    pub fn rate(pv: f64, fv: f64, nper: f64, pmt: f64) -> f64 {
        tvm::solve_rate(pv, fv, nper, pmt).unwrap_or(f64::NAN)
    }

    /// `NaN` when the inputs admit no period count
    #[wasm_bindgen]
    pub fn nper(pv: f64, fv: f64, rate: f64, pmt: f64) -> f64 {
        tvm::periods(pv, fv, rate, pmt).unwrap_or(f64::NAN)
    }
}
