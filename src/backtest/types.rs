// src/backtest/types.rs
// Core types for the backtest engine and its request/response shapes

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::{equal_weights, normalize_weights};
use crate::error::{AnalyticsError, Result};

// ============================================================================
// Rebalancing
// ============================================================================

/// How often a portfolio is traded back to its target weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    #[default]
    Yearly,
}

impl RebalanceFrequency {
    pub const ALL: [RebalanceFrequency; 5] = [
        RebalanceFrequency::Daily,
        RebalanceFrequency::Weekly,
        RebalanceFrequency::Monthly,
        RebalanceFrequency::Quarterly,
        RebalanceFrequency::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RebalanceFrequency::Daily => "daily",
            RebalanceFrequency::Weekly => "weekly",
            RebalanceFrequency::Monthly => "monthly",
            RebalanceFrequency::Quarterly => "quarterly",
            RebalanceFrequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for RebalanceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RebalanceFrequency {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        RebalanceFrequency::ALL
            .into_iter()
            .find(|freq| freq.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AnalyticsError::invalid(format!("Unknown rebalance frequency: {}", s)))
    }
}

// ============================================================================
// Portfolio
// ============================================================================

/// Trim and upper-case a ticker symbol
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Normalize tickers, dropping blanks and duplicates while keeping order
pub fn clean_tickers(tickers: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let t = normalize_ticker(ticker);
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

fn default_portfolio_name() -> String {
    "Portfolio".to_string()
}

/// A named set of tickers with target weights
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Portfolio {
    #[serde(default = "default_portfolio_name")]
    pub name: String,
    pub tickers: Vec<String>,
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

impl Portfolio {
    pub fn new(name: impl Into<String>, tickers: &[&str], weights: Option<Vec<f64>>) -> Self {
        Portfolio {
            name: name.into(),
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            weights,
        }
    }

    /// Normalized tickers paired with target weights summing to 1.
    ///
    /// Blank tickers are dropped together with their weight. A weight list
    /// whose length does not match the ticker list is replaced by equal weights.
    pub fn targets(&self) -> Vec<(String, f64)> {
        let weights = match &self.weights {
            Some(w) if w.len() == self.tickers.len() => w.clone(),
            _ => equal_weights(self.tickers.len()),
        };

        let (tickers, raw): (Vec<String>, Vec<f64>) = self
            .tickers
            .iter()
            .map(|t| normalize_ticker(t))
            .zip(weights)
            .filter(|(t, _)| !t.is_empty())
            .unzip();

        tickers.into_iter().zip(normalize_weights(&raw)).collect()
    }
}

// ============================================================================
// Equity curve & metrics
// ============================================================================

/// A point on the equity curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Portfolio value per trading date, in increasing date order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Distribution of trailing one-year returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollingSummary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// Performance metrics, as decimal fractions (0.05 = 5%)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub total_return: f64,
    pub years: f64,
    pub final_value: f64,
    pub rolling_1y: Option<RollingSummary>,
}

/// Diagnostic raised while simulating
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub message: String,
}

impl BacktestWarning {
    pub fn new(date: Option<NaiveDate>, message: impl Into<String>) -> Self {
        BacktestWarning {
            date,
            message: message.into(),
        }
    }
}

// ============================================================================
// API Request/Response Types
// ============================================================================

pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

pub fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

pub fn default_starting_value() -> f64 {
    100_000.0
}

/// Reject empty or reversed date ranges
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start >= end {
        return Err(AnalyticsError::invalid("Start date must be before end date."));
    }
    Ok(())
}

/// Request to run a backtest
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestRequest {
    pub portfolios: Vec<Portfolio>,
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,
    #[serde(default = "default_starting_value")]
    pub starting_value: f64,
    #[serde(default)]
    pub rebalance_freq: RebalanceFrequency,
}

/// Metrics for one portfolio, or the reason they could not be computed
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioMetrics {
    pub name: String,
    #[serde(flatten)]
    pub metrics: Option<Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full backtest response
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResponse {
    pub equity_curves: BTreeMap<String, EquityCurve>,
    pub metrics: Vec<PortfolioMetrics>,
    pub warnings: Vec<BacktestWarning>,
}

/// Request to compare rebalancing frequencies for one portfolio
#[derive(Debug, Clone, Deserialize)]
pub struct SensitivityRequest {
    pub tickers: Vec<String>,
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,
    #[serde(default = "default_starting_value")]
    pub starting_value: f64,
}

/// One row of the rebalancing comparison table
#[derive(Debug, Clone, Serialize)]
pub struct RebalanceComparison {
    pub rebalance_freq: RebalanceFrequency,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub final_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensitivityResponse {
    pub tickers: Vec<String>,
    pub results: Vec<RebalanceComparison>,
    pub equity_curves: BTreeMap<RebalanceFrequency, EquityCurve>,
    pub warnings: Vec<BacktestWarning>,
}
