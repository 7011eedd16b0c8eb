//! Mean-variance optimization
//!
//! Annualized return statistics are estimated from a [`PriceMatrix`], then
//! turned into minimum-volatility and maximum-Sharpe weightings and an
//! interpolated efficient frontier.

pub mod frontier;
pub mod mean_variance;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::backtest::alignment::PriceMatrix;
use crate::backtest::metrics::sharpe_ratio;
use crate::common::{mean, sample_covariance};
use crate::error::{AnalyticsError, Result};

pub use frontier::{sample_frontier, FrontierPoint};
pub use mean_variance::{MeanVarianceOptimizer, OptimizationResult};

/// Annualized expected returns and covariance of daily returns
#[derive(Debug, Clone)]
pub struct ReturnStats {
    pub tickers: Vec<String>,
    /// Mean daily return × trading days
    pub mu: DVector<f64>,
    /// Sample covariance of daily returns × trading days
    pub cov: DMatrix<f64>,
}

impl ReturnStats {
    /// Estimate from aligned prices. Requires at least 2 assets and 2 return rows.
    pub fn from_prices(prices: &PriceMatrix, trading_days: f64) -> Result<Self> {
        if prices.tickers().len() < 2 {
            return Err(AnalyticsError::invalid("Need at least 2 assets with data."));
        }
        let returns = prices.returns();
        if returns.len() < 2 {
            return Err(AnalyticsError::insufficient("Insufficient return data."));
        }

        let n = returns.n_assets();
        let mu = DVector::from_iterator(n, returns.columns.iter().map(|c| mean(c) * trading_days));
        let cov = DMatrix::from_fn(n, n, |i, j| {
            sample_covariance(&returns.columns[i], &returns.columns[j]) * trading_days
        });

        Ok(ReturnStats {
            tickers: returns.tickers,
            mu,
            cov,
        })
    }

    pub fn n_assets(&self) -> usize {
        self.mu.len()
    }

    /// Expected return, volatility and Sharpe of a weight vector
    pub fn portfolio_stats(&self, weights: &DVector<f64>, risk_free_rate: f64) -> PortfolioStats {
        let expected_return = weights.dot(&self.mu);
        let variance = weights.dot(&(&self.cov * weights));
        let volatility = variance.max(0.0).sqrt();
        PortfolioStats {
            expected_return,
            volatility,
            sharpe: sharpe_ratio(expected_return, volatility, risk_free_rate),
        }
    }
}

/// Return / volatility / Sharpe triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioStats {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
}

/// Moore-Penrose pseudo-inverse via SVD.
///
/// Singular values below `1e-15 × σ_max` are treated as zero, so a singular
/// covariance matrix still yields a usable inverse.
pub fn pseudo_inverse(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    const RCOND: f64 = 1e-15;

    let svd = matrix.clone().svd(true, true);
    let eps = RCOND * svd.singular_values.max();
    svd.pseudo_inverse(eps)
        .map_err(|e| AnalyticsError::invalid(format!("pseudo-inverse failed: {}", e)))
}
