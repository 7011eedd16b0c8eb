//! Time value of money
//!
//! Solves `fv = pv·(1+r)^n + pmt·((1+r)^n - 1)/r` for whichever of
//! `pv`, `fv`, `rate` or `nper` is unknown. Values follow the equation's own
//! sign convention: no cash-flow sign flipping is applied.

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Rates closer to zero than this use the linear (zero-rate) limit
pub const ZERO_RATE_EPS: f64 = 1e-10;

/// Rate bracket searched when solving for the rate
pub const RATE_BRACKET: (f64, f64) = (-0.99, 5.0);
pub const RATE_ITERATIONS: usize = 100;

/// How the `rate` field is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateBasis {
    /// 0.05 means 5% per period
    #[default]
    Decimal,
    /// 5.0 means 5% per period
    Percent,
}

impl RateBasis {
    pub fn to_decimal(self, rate: f64) -> f64 {
        match self {
            RateBasis::Decimal => rate,
            RateBasis::Percent => rate / 100.0,
        }
    }

    pub fn in_basis(self, rate: f64) -> f64 {
        match self {
            RateBasis::Decimal => rate,
            RateBasis::Percent => rate * 100.0,
        }
    }
}

/// The unknown, carrying the three known values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TvmProblem {
    Pv { fv: f64, rate: f64, nper: f64 },
    Fv { pv: f64, rate: f64, nper: f64 },
    Rate { pv: f64, fv: f64, nper: f64 },
    Nper { pv: f64, fv: f64, rate: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TvmUnknown {
    Pv,
    Fv,
    Rate,
    Nper,
}

impl TvmProblem {
    pub fn unknown(&self) -> TvmUnknown {
        match self {
            TvmProblem::Pv { .. } => TvmUnknown::Pv,
            TvmProblem::Fv { .. } => TvmUnknown::Fv,
            TvmProblem::Rate { .. } => TvmUnknown::Rate,
            TvmProblem::Nper { .. } => TvmUnknown::Nper,
        }
    }
}

/// All four values after solving; `rate` is in the caller's basis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TvmSolution {
    pub pv: f64,
    pub fv: f64,
    pub rate: f64,
    pub nper: f64,
    pub pmt: f64,
    pub solved: TvmUnknown,
}

// ============================================================================
// Closed forms
// ============================================================================

/// Future value of `pv` plus an annuity of `pmt` per period
pub fn future_value(pv: f64, rate: f64, nper: f64, pmt: f64) -> f64 {
    if rate == -1.0 || rate.abs() < ZERO_RATE_EPS {
        return pv + pmt * nper;
    }
    let growth = (1.0 + rate).powf(nper);
    pv * growth + pmt * (growth - 1.0) / rate
}

/// Present value that grows to `fv` with an annuity of `pmt` per period
pub fn present_value(fv: f64, rate: f64, nper: f64, pmt: f64) -> f64 {
    if rate == -1.0 || rate.abs() < ZERO_RATE_EPS {
        return fv - pmt * nper;
    }
    let growth = (1.0 + rate).powf(nper);
    (fv - pmt * (growth - 1.0) / rate) / growth
}

/// Number of periods for `pv` to reach `fv`
pub fn periods(pv: f64, fv: f64, rate: f64, pmt: f64) -> Result<f64> {
    if pv == 0.0 {
        return Err(AnalyticsError::invalid("Cannot solve for nper with given inputs."));
    }
    if rate.abs() < ZERO_RATE_EPS {
        return Ok(if pmt != 0.0 { (fv - pv) / pmt } else { 0.0 });
    }

    let denominator = pv + pmt / rate;
    if denominator == 0.0 {
        return Ok(0.0);
    }
    let ratio = (fv + pmt / rate) / denominator;
    if ratio <= 0.0 || !ratio.is_finite() || rate <= -1.0 {
        return Err(AnalyticsError::invalid("Cannot solve for nper with given inputs."));
    }
    Ok(ratio.ln() / (1.0 + rate).ln())
}

/// Per-period rate taking `pv` to `fv` in `nper` periods, by bisection
pub fn solve_rate(pv: f64, fv: f64, nper: f64, pmt: f64) -> Result<f64> {
    let residual = |r: f64| future_value(pv, r, nper, pmt) - fv;

    let (mut lo, mut hi) = RATE_BRACKET;
    let (f_lo, f_hi) = (residual(lo), residual(hi));
    if f_lo.is_nan() || f_hi.is_nan() || (f_lo != 0.0 && f_hi != 0.0 && f_lo.signum() == f_hi.signum()) {
        return Err(AnalyticsError::invalid(
            "No rate between -99% and 500% per period solves the given inputs.",
        ));
    }

    for _ in 0..RATE_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let f_mid = residual(mid);
        if f_mid == 0.0 || f_mid.signum() != residual(lo).signum() {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok((lo + hi) / 2.0)
}

// ============================================================================
// Solver
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TvmSolver {
    pub problem: TvmProblem,
    pub pmt: f64,
    pub basis: RateBasis,
}

impl TvmSolver {
    pub fn new(problem: TvmProblem, pmt: f64, basis: RateBasis) -> Self {
        TvmSolver { problem, pmt, basis }
    }

    pub fn solve(&self) -> Result<TvmSolution> {
        let pmt = self.pmt;
        let solved = self.problem.unknown();

        let solution = match self.problem {
            TvmProblem::Pv { fv, rate, nper } => TvmSolution {
                pv: present_value(fv, self.basis.to_decimal(rate), nper, pmt),
                fv,
                rate,
                nper,
                pmt,
                solved,
            },
            TvmProblem::Fv { pv, rate, nper } => TvmSolution {
                pv,
                fv: future_value(pv, self.basis.to_decimal(rate), nper, pmt),
                rate,
                nper,
                pmt,
                solved,
            },
            TvmProblem::Nper { pv, fv, rate } => TvmSolution {
                pv,
                fv,
                rate,
                nper: periods(pv, fv, self.basis.to_decimal(rate), pmt)?,
                pmt,
                solved,
            },
            TvmProblem::Rate { pv, fv, nper } => TvmSolution {
                pv,
                fv,
                rate: self.basis.in_basis(solve_rate(pv, fv, nper, pmt)?),
                nper,
                pmt,
                solved,
            },
        };
        Ok(solution)
    }
}

// ============================================================================
// Request
// ============================================================================

fn default_rate_decimal() -> bool {
    true
}

/// Loose TVM input: exactly one of `pv`, `fv`, `rate`, `nper` must be `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct TvmRequest {
    pub pv: Option<f64>,
    pub fv: Option<f64>,
    pub rate: Option<f64>,
    pub nper: Option<f64>,
    #[serde(default)]
    pub pmt: f64,
    #[serde(default = "default_rate_decimal")]
    pub rate_decimal: bool,
}

impl Default for TvmRequest {
    fn default() -> Self {
        TvmRequest {
            pv: None,
            fv: None,
            rate: None,
            nper: None,
            pmt: 0.0,
            rate_decimal: default_rate_decimal(),
        }
    }
}

impl TryFrom<&TvmRequest> for TvmSolver {
    type Error = AnalyticsError;

    fn try_from(req: &TvmRequest) -> Result<Self> {
        let known = [req.pv, req.fv, req.rate, req.nper, Some(req.pmt)];
        if known.iter().flatten().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::invalid("TVM inputs must be finite numbers."));
        }

        let problem = match (req.pv, req.fv, req.rate, req.nper) {
            (Some(_), Some(_), Some(_), Some(_)) => {
                return Err(AnalyticsError::invalid(
                    "Leave one of PV, FV, rate, or nper blank to solve for it.",
                ))
            }
            (None, Some(fv), Some(rate), Some(nper)) => TvmProblem::Pv { fv, rate, nper },
            (Some(pv), None, Some(rate), Some(nper)) => TvmProblem::Fv { pv, rate, nper },
            (Some(pv), Some(fv), None, Some(nper)) => TvmProblem::Rate { pv, fv, nper },
            (Some(pv), Some(fv), Some(rate), None) => TvmProblem::Nper { pv, fv, rate },
            _ => {
                return Err(AnalyticsError::invalid(
                    "Exactly one of PV, FV, rate, or nper must be unknown (null).",
                ))
            }
        };

        let basis = if req.rate_decimal {
            RateBasis::Decimal
        } else {
            RateBasis::Percent
        };
        Ok(TvmSolver::new(problem, req.pmt, basis))
    }
}

/// Validate a request and solve it
pub fn solve(req: &TvmRequest) -> Result<TvmSolution> {
    TvmSolver::try_from(req)?.solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_future_value_compound() {
        assert_relative_eq!(future_value(1000.0, 0.05, 10.0, 0.0), 1628.894627, epsilon = 1e-6);
        assert_relative_eq!(future_value(-1000.0, 0.05, 10.0, 0.0), -1628.894627, epsilon = 1e-6);
    }

    #[test]
    fn test_future_value_annuity() {
        // 100 per period for 10 periods at 5%: 100 × 12.577893
        assert_relative_eq!(future_value(0.0, 0.05, 10.0, 100.0), 1257.789254, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_and_total_loss_rates() {
        assert_eq!(future_value(100.0, 0.0, 12.0, 10.0), 220.0);
        assert_eq!(future_value(100.0, -1.0, 12.0, 10.0), 220.0);
        assert_eq!(present_value(220.0, 1e-12, 12.0, 10.0), 100.0);
    }

    #[test]
    fn test_periods() {
        let n = periods(1000.0, 2000.0, 0.05, 0.0).unwrap();
        assert_relative_eq!(n, 2f64.ln() / 1.05f64.ln(), epsilon = 1e-12);
        assert_eq!(periods(100.0, 200.0, 0.0, 10.0).unwrap(), 10.0);
        assert_eq!(periods(100.0, 200.0, 0.0, 0.0).unwrap(), 0.0);
        assert!(periods(0.0, 200.0, 0.05, 0.0).is_err());
        // Growth can never reach a value of the opposite sign
        assert!(periods(1000.0, -2000.0, 0.05, 0.0).is_err());
    }

    #[test]
    fn test_solve_rate() {
        let r = solve_rate(1000.0, 1628.894627, 10.0, 0.0).unwrap();
        assert_relative_eq!(r, 0.05, epsilon = 1e-8);
        // Same sign at both ends of the bracket
        assert!(solve_rate(1000.0, 1e12, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_request_validation() {
        let all = TvmRequest {
            pv: Some(1.0),
            fv: Some(2.0),
            rate: Some(0.1),
            nper: Some(1.0),
            ..Default::default()
        };
        assert!(solve(&all).unwrap_err().to_string().starts_with("Leave one"));

        let two_missing = TvmRequest {
            pv: Some(1.0),
            rate: Some(0.1),
            ..Default::default()
        };
        assert!(solve(&two_missing).unwrap_err().to_string().starts_with("Exactly one"));
    }

    #[test]
    fn test_rate_in_percent_basis() {
        let req: TvmRequest =
            serde_json::from_str(r#"{"pv":1000,"fv":1628.894627,"nper":10,"rate":null,"rate_decimal":false}"#)
                .unwrap();
        let sol = solve(&req).unwrap();
        assert_eq!(sol.solved, TvmUnknown::Rate);
        assert_relative_eq!(sol.rate, 5.0, epsilon = 1e-6);

        let req = TvmRequest {
            pv: Some(1000.0),
            rate: Some(5.0),
            nper: Some(10.0),
            rate_decimal: false,
            ..Default::default()
        };
        let sol = solve(&req).unwrap();
        assert_relative_eq!(sol.fv, 1628.894627, epsilon = 1e-6);
        assert_eq!(sol.rate, 5.0);
    }
}
