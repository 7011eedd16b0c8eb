// src/backtest/metrics.rs
// Performance metrics calculation

use chrono::NaiveDate;

use crate::backtest::types::{EquityCurve, Metrics, RollingSummary};
use crate::common::{max, mean, min, pct_change, sample_std};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};

/// Calculate all metrics for a dated value series (equity curve or prices).
///
/// Points whose value is not finite are dropped first; fewer than two
/// remaining points is an `InsufficientData` error.
pub fn calculate_metrics(
    dates: &[NaiveDate],
    values: &[f64],
    config: &AnalyticsConfig,
) -> Result<Metrics> {
    let (dates, values): (Vec<NaiveDate>, Vec<f64>) = dates
        .iter()
        .zip(values)
        .filter(|(_, v)| v.is_finite())
        .map(|(d, v)| (*d, *v))
        .unzip();

    if values.len() < 2 {
        return Err(AnalyticsError::insufficient("Insufficient data."));
    }

    let first = values[0];
    let last = values[values.len() - 1];
    let total_return = last / first - 1.0;

    let elapsed_days = (dates[dates.len() - 1] - dates[0]).num_days();
    let years = elapsed_days as f64 / config.days_per_year;

    let cagr = if years > 0.0 {
        (1.0 + total_return).powf(1.0 / years) - 1.0
    } else {
        0.0
    };

    let daily_returns = pct_change(&values);
    let volatility = annualized_volatility(&daily_returns, config.trading_days_per_year);
    let sharpe = sharpe_ratio(cagr, volatility, config.risk_free_rate);

    Ok(Metrics {
        cagr,
        volatility,
        sharpe,
        max_drawdown: calculate_max_drawdown(&values),
        total_return,
        years,
        final_value: last,
        rolling_1y: rolling_summary(&values, config.rolling_window),
    })
}

/// Metrics of an equity curve
pub fn curve_metrics(curve: &EquityCurve, config: &AnalyticsConfig) -> Result<Metrics> {
    calculate_metrics(&curve.dates(), &curve.values(), config)
}

/// Excess return over the risk-free rate per unit of volatility; 0 when
/// volatility is 0.
pub fn sharpe_ratio(annual_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility > 0.0 {
        (annual_return - risk_free_rate) / volatility
    } else {
        0.0
    }
}

/// Calculate annualized volatility (sample standard deviation)
pub fn annualized_volatility(returns: &[f64], trading_days: f64) -> f64 {
    sample_std(returns) * trading_days.sqrt()
}

/// Drawdown from the running peak at each point (0 or negative)
pub fn drawdown_series(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&value| {
            if value > peak {
                peak = value;
            }
            (value - peak) / peak
        })
        .collect()
}

/// Calculate maximum drawdown (returned as a negative fraction)
pub fn calculate_max_drawdown(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    min(&drawdown_series(values))
}

/// `V[t] / V[t - window] - 1` for every `t >= window`
pub fn rolling_returns(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() <= window {
        return vec![];
    }
    (window..values.len())
        .map(|t| values[t] / values[t - window] - 1.0)
        .collect()
}

/// Min / mean / max of the rolling returns, `None` without a full window
pub fn rolling_summary(values: &[f64], window: usize) -> Option<RollingSummary> {
    let rolling = rolling_returns(values, window);
    if rolling.is_empty() {
        return None;
    }
    Some(RollingSummary {
        min: min(&rolling),
        mean: mean(&rolling),
        max: max(&rolling),
    })
}
