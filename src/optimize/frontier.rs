//! Efficient frontier approximation
//!
//! Long-only portfolios on the straight line between the minimum-volatility
//! and maximum-Sharpe weightings. This is not a quadratic-programming
//! frontier: each interpolated weight vector has its negatives clipped and is
//! renormalized.

use nalgebra::DVector;
use serde::Serialize;

use super::mean_variance::MeanVarianceOptimizer;
use crate::error::{AnalyticsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrontierPoint {
    #[serde(rename = "return")]
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
}

/// Clip negative weights to 0 and renormalize; equal weights when nothing is left
fn long_only(weights: DVector<f64>) -> DVector<f64> {
    let clipped = weights.map(|w| w.max(0.0));
    let sum = clipped.sum();
    if sum > 0.0 && sum.is_finite() {
        clipped / sum
    } else {
        let n = clipped.len();
        DVector::from_element(n, 1.0 / n as f64)
    }
}

/// Weights at interpolation parameter `t` in `[0, 1]`
pub fn interpolate(min_vol: &DVector<f64>, max_sharpe: &DVector<f64>, t: f64) -> DVector<f64> {
    long_only(min_vol * (1.0 - t) + max_sharpe * t)
}

/// `num_points + 1` points for `t = i / num_points`, from the min-vol end to
/// the max-Sharpe end.
pub fn sample_frontier(optimizer: &MeanVarianceOptimizer<'_>, num_points: usize) -> Result<Vec<FrontierPoint>> {
    if num_points == 0 {
        return Err(AnalyticsError::invalid("num_points must be at least 1."));
    }

    let w0 = optimizer.min_volatility_weights();
    let w1 = optimizer.max_sharpe_weights();

    let points = (0..=num_points)
        .map(|i| {
            let t = i as f64 / num_points as f64;
            let stats = optimizer.stats(&interpolate(&w0, &w1, t));
            FrontierPoint {
                expected_return: stats.expected_return,
                volatility: stats.volatility,
                sharpe: stats.sharpe,
            }
        })
        .collect();
    Ok(points)
}
