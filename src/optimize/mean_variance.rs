//! Minimum-volatility and maximum-Sharpe (tangency) weightings.
//!
//! Both are closed-form: `w ∝ Σ⁺·b` normalized to sum to 1, with `b = 1` for
//! minimum volatility and `b = μ - r_f` for maximum Sharpe. Short positions
//! (negative weights) are allowed.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use super::{pseudo_inverse, PortfolioStats, ReturnStats};
use crate::error::Result;

/// One asset's weight in an optimized portfolio
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetWeight {
    pub ticker: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub weights: Vec<AssetWeight>,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
}

/// Scale `raw` to sum to 1, or equal weights when its sum is 0 or not finite
fn normalize(raw: DVector<f64>) -> DVector<f64> {
    let sum = raw.sum();
    if sum == 0.0 || !sum.is_finite() {
        let n = raw.len();
        return DVector::from_element(n, 1.0 / n as f64);
    }
    raw / sum
}

pub struct MeanVarianceOptimizer<'a> {
    stats: &'a ReturnStats,
    inv_cov: DMatrix<f64>,
    risk_free_rate: f64,
}

impl<'a> MeanVarianceOptimizer<'a> {
    pub fn new(stats: &'a ReturnStats, risk_free_rate: f64) -> Result<Self> {
        Ok(MeanVarianceOptimizer {
            stats,
            inv_cov: pseudo_inverse(&stats.cov)?,
            risk_free_rate,
        })
    }

    pub fn min_volatility_weights(&self) -> DVector<f64> {
        let ones = DVector::from_element(self.stats.n_assets(), 1.0);
        normalize(&self.inv_cov * ones)
    }

    pub fn max_sharpe_weights(&self) -> DVector<f64> {
        let excess = self.stats.mu.add_scalar(-self.risk_free_rate);
        normalize(&self.inv_cov * excess)
    }

    pub fn stats(&self, weights: &DVector<f64>) -> PortfolioStats {
        self.stats.portfolio_stats(weights, self.risk_free_rate)
    }

    /// Package a weight vector with its statistics
    pub fn result(&self, weights: &DVector<f64>) -> OptimizationResult {
        let stats = self.stats(weights);
        OptimizationResult {
            weights: self
                .stats
                .tickers
                .iter()
                .zip(weights.iter())
                .map(|(ticker, &weight)| AssetWeight {
                    ticker: ticker.clone(),
                    weight,
                })
                .collect(),
            expected_return: stats.expected_return,
            volatility: stats.volatility,
            sharpe: stats.sharpe,
        }
    }

    pub fn min_volatility(&self) -> OptimizationResult {
        self.result(&self.min_volatility_weights())
    }

    pub fn max_sharpe(&self) -> OptimizationResult {
        self.result(&self.max_sharpe_weights())
    }
}
