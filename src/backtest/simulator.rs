// src/backtest/simulator.rs
// Day-by-day cash/shares simulation under periodic rebalancing

use chrono::NaiveDate;

use crate::backtest::alignment::PriceMatrix;
use crate::backtest::calendar::RebalanceSchedule;
use crate::backtest::types::{BacktestWarning, EquityCurve, EquityPoint};
use crate::common::dot;

/// Price used in place of a non-positive or non-finite price when converting
/// target dollars into shares. Capital allocated this way is misvalued, so
/// every substitution is reported as a warning.
pub const INVALID_PRICE_FALLBACK: f64 = 1.0;

/// Cash below `-CASH_TOLERANCE * value` after a rebalance is reported.
/// The balance is left as computed.
pub const CASH_TOLERANCE: f64 = 1e-9;

/// Mutable holdings while the simulation runs
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub cash: f64,
    /// Shares per ticker, in the price matrix's ticker order
    pub shares: Vec<f64>,
    pub date: NaiveDate,
}

impl SimulationState {
    fn new(cash: f64, n_assets: usize, date: NaiveDate) -> Self {
        SimulationState {
            cash,
            shares: vec![0.0; n_assets],
            date,
        }
    }

    /// Cash plus holdings marked at `prices`
    pub fn value(&self, prices: &[f64]) -> f64 {
        self.cash + dot(&self.shares, prices)
    }
}

/// Output of one simulation run
#[derive(Debug, Clone)]
pub struct Simulation {
    pub curve: EquityCurve,
    pub warnings: Vec<BacktestWarning>,
    /// Number of rebalance events, the initial allocation included
    pub rebalances: usize,
}

/// Simulates a fixed-weight portfolio over a price matrix.
pub struct PortfolioSimulator<'a> {
    prices: &'a PriceMatrix,
    weights: &'a [f64],
    starting_value: f64,
}

impl<'a> PortfolioSimulator<'a> {
    /// `weights` must be aligned to `prices.tickers()` and sum to 1.
    pub fn new(prices: &'a PriceMatrix, weights: &'a [f64], starting_value: f64) -> Self {
        PortfolioSimulator {
            prices,
            weights,
            starting_value,
        }
    }

    /// Run over every date of the matrix.
    ///
    /// The first date allocates the starting value and records it unchanged.
    /// On each later date the portfolio is rebalanced when the date is in
    /// `schedule` and otherwise held, then marked to that date's prices.
    pub fn run(&self, schedule: &RebalanceSchedule) -> Simulation {
        let dates = self.prices.dates();
        let mut curve = EquityCurve::default();
        let mut warnings = Vec::new();

        let Some(&first) = dates.first() else {
            return Simulation {
                curve,
                warnings,
                rebalances: 0,
            };
        };

        let mut state = SimulationState::new(self.starting_value, self.weights.len(), first);
        self.rebalance(&mut state, &self.prices.row(0), &mut warnings);
        let mut rebalances = 1;
        curve.points.push(EquityPoint {
            date: first,
            value: self.starting_value,
        });

        for (i, &date) in dates.iter().enumerate().skip(1) {
            state.date = date;
            let row = self.prices.row(i);

            if schedule.contains(&date) {
                self.rebalance(&mut state, &row, &mut warnings);
                rebalances += 1;
            }

            curve.points.push(EquityPoint {
                date,
                value: state.value(&row),
            });
        }

        Simulation {
            curve,
            warnings,
            rebalances,
        }
    }

    /// Trade the holdings back to target weights at `row` prices.
    fn rebalance(&self, state: &mut SimulationState, row: &[f64], warnings: &mut Vec<BacktestWarning>) {
        let mut value = state.value(row);
        if value <= 0.0 || !value.is_finite() {
            value = self.starting_value;
        }

        let mut invested = 0.0;
        for (j, (&weight, &price)) in self.weights.iter().zip(row).enumerate() {
            let price = if price > 0.0 && price.is_finite() {
                price
            } else {
                let ticker = &self.prices.tickers()[j];
                tracing::warn!(%ticker, date = %state.date, price, "invalid price, using fallback");
                warnings.push(BacktestWarning::new(
                    Some(state.date),
                    format!(
                        "{}: invalid price {} replaced by {} when rebalancing",
                        ticker, price, INVALID_PRICE_FALLBACK
                    ),
                ));
                INVALID_PRICE_FALLBACK
            };
            state.shares[j] = value * weight / price;
            invested += state.shares[j] * price;
        }

        state.cash = value - invested;
        if state.cash < -CASH_TOLERANCE * value {
            tracing::warn!(date = %state.date, cash = state.cash, "negative cash after rebalance");
            warnings.push(BacktestWarning::new(
                Some(state.date),
                format!("negative cash balance {:.2} after rebalancing", state.cash),
            ));
        }
    }
}
