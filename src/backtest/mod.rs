// src/backtest/mod.rs
// Backtest engine: alignment, rebalance calendar, simulation, metrics

pub mod types;
pub mod alignment;
pub mod calendar;
pub mod simulator;
pub mod metrics;
pub mod runner;

// Re-export main types and functions
pub use types::*;
pub use alignment::{align_prices, PriceMatrix, RawPrices, ReturnMatrix};
pub use calendar::RebalanceSchedule;
pub use simulator::{PortfolioSimulator, Simulation};
pub use metrics::calculate_metrics;
pub use runner::{rebalancing_sensitivity, run_backtest};
