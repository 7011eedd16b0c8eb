//! Analytics configuration
//!
//! Values come from built-in defaults, then an optional `analytics.toml` in the
//! working directory, then `ANALYTICS_*` environment variables
//! (e.g. `ANALYTICS_RISK_FREE_RATE=0.03`).

use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DAYS_PER_YEAR: f64 = 365.25;
pub const ROLLING_WINDOW: usize = 252;
pub const DEFAULT_FRONTIER_POINTS: usize = 50;
pub const MAX_FRONTIER_POINTS: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Annual risk-free rate used by every Sharpe computation
    pub risk_free_rate: f64,
    /// Annualization factor for daily returns and covariances
    pub trading_days_per_year: f64,
    /// Calendar length of a year when converting a date span to years
    pub days_per_year: f64,
    /// Lookback (in rows) of the rolling 1-year return
    pub rolling_window: usize,
    pub default_frontier_points: usize,
    /// Largest `num_points` a frontier request may ask for
    pub max_frontier_points: usize,
    /// Directory of `<TICKER>.parquet` files
    pub data_dir: String,
    pub bind_addr: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
            days_per_year: DAYS_PER_YEAR,
            rolling_window: ROLLING_WINDOW,
            default_frontier_points: DEFAULT_FRONTIER_POINTS,
            max_frontier_points: MAX_FRONTIER_POINTS,
            data_dir: std::env::var("PARQUET_DIR")
                .unwrap_or_else(|_| "data/ticker_data_parquet".to_string()),
            bind_addr: "127.0.0.1:3030".to_string(),
        }
    }
}

impl AnalyticsConfig {
    /// Load the layered configuration.
    pub fn load() -> Result<Self> {
        Self::load_from("analytics")
    }

    /// Load using `file_stem` (without extension) as the optional config file.
    pub fn load_from(file_stem: &str) -> Result<Self> {
        let defaults = AnalyticsConfig::default();

        let settings = config::Config::builder()
            .set_default("risk_free_rate", defaults.risk_free_rate)?
            .set_default("trading_days_per_year", defaults.trading_days_per_year)?
            .set_default("days_per_year", defaults.days_per_year)?
            .set_default("rolling_window", defaults.rolling_window as u64)?
            .set_default("default_frontier_points", defaults.default_frontier_points as u64)?
            .set_default("max_frontier_points", defaults.max_frontier_points as u64)?
            .set_default("data_dir", defaults.data_dir)?
            .set_default("bind_addr", defaults.bind_addr)?
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(config::Environment::with_prefix("ANALYTICS"))
            .build()?;

        Ok(settings.try_deserialize::<AnalyticsConfig>()?)
    }

    /// Copy of this config with a per-request risk-free rate, if one was given.
    pub fn with_risk_free_rate(&self, rate: Option<f64>) -> Self {
        let mut config = self.clone();
        if let Some(rate) = rate {
            config.risk_free_rate = rate;
        }
        config
    }
}
