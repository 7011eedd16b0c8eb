//! Portfolio analytics CLI
//!
//! Usage: analyze <parquet_dir> <command> [args...]
//!
//!   asset       <TICKER> [start] [end]
//!   optimize    <T1,T2,...> [start] [end]
//!   frontier    <T1,T2,...> [start] [end] [points]
//!   backtest    <T1,T2,...> [start] [end] [freq] [w1,w2,...]
//!   sensitivity <T1,T2,...> [start] [end] [w1,w2,...]
//!   tvm         pv=<x> fv=<x> rate=<x> nper=<x> [pmt=<x>] [percent]
//!
//! Dates are YYYY-MM-DD. Results are printed as pretty JSON on stdout.

use std::process::ExitCode;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use portfolio_analytics::analysis::{self, AssetAnalysisRequest, FrontierRequest, OptimizationRequest};
use portfolio_analytics::backtest::{
    default_end_date, default_start_date, default_starting_value, BacktestRequest, Portfolio, RebalanceFrequency,
    SensitivityRequest,
};
use portfolio_analytics::{AnalyticsConfig, ApiResult, ParquetPriceProvider, TvmRequest};

const USAGE: &str = "Usage: analyze <parquet_dir> <asset|optimize|frontier|backtest|sensitivity|tvm> [args...]";

fn split_list(arg: &str) -> Vec<String> {
    arg.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn parse_weights(arg: Option<&String>) -> Result<Option<Vec<f64>>, String> {
    arg.map(|a| {
        split_list(a)
            .iter()
            .map(|w| w.parse::<f64>().map_err(|e| format!("bad weight {:?}: {}", w, e)))
            .collect()
    })
    .transpose()
}

fn parse_date(arg: Option<&String>, default: NaiveDate) -> Result<NaiveDate, String> {
    match arg {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("bad date {:?}: {}", s, e)),
        None => Ok(default),
    }
}

fn parse_tvm(args: &[String]) -> Result<TvmRequest, String> {
    let mut req = TvmRequest::default();
    for arg in args {
        if arg == "percent" {
            req.rate_decimal = false;
            continue;
        }
        let (key, value) = arg.split_once('=').ok_or_else(|| format!("expected key=value, got {:?}", arg))?;
        let value: f64 = value.parse().map_err(|e| format!("bad value for {}: {}", key, e))?;
        match key {
            "pv" => req.pv = Some(value),
            "fv" => req.fv = Some(value),
            "rate" => req.rate = Some(value),
            "nper" => req.nper = Some(value),
            "pmt" => req.pmt = value,
            other => return Err(format!("unknown TVM field {:?}", other)),
        }
    }
    Ok(req)
}

fn print<T: Serialize>(result: &ApiResult<T>) -> Result<(), String> {
    let json = serde_json::to_string_pretty(result).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn run(args: &[String]) -> Result<bool, String> {
    if args.len() < 3 {
        return Err(USAGE.to_string());
    }

    let config = AnalyticsConfig::load().map_err(|e| e.to_string())?;
    let provider = ParquetPriceProvider::new(&args[1]);
    let command = args[2].as_str();
    let rest = &args[3..];

    let first = rest.first().ok_or_else(|| USAGE.to_string());
    let dates = || -> Result<(NaiveDate, NaiveDate), String> {
        Ok((
            parse_date(rest.get(1), default_start_date())?,
            parse_date(rest.get(2), default_end_date())?,
        ))
    };

    tracing::info!(command, dir = %provider.dir().display(), "running");

    let ok = match command {
        "asset" => {
            let (start, end) = dates()?;
            let req = AssetAnalysisRequest {
                ticker: first?.clone(),
                start_date: start,
                end_date: end,
            };
            let result = analysis::asset_analysis(&provider, &req, &config);
            print(&result)?;
            result.is_ok()
        }
        "optimize" => {
            let (start, end) = dates()?;
            let req = OptimizationRequest {
                tickers: split_list(first?),
                start_date: start,
                end_date: end,
                risk_free_rate: None,
            };
            let result = analysis::portfolio_optimization(&provider, &req, &config);
            print(&result)?;
            result.is_ok()
        }
        "frontier" => {
            let (start, end) = dates()?;
            let num_points = rest
                .get(3)
                .map(|p| p.parse::<usize>().map_err(|e| format!("bad point count: {}", e)))
                .transpose()?;
            let req = FrontierRequest {
                tickers: split_list(first?),
                start_date: start,
                end_date: end,
                num_points,
                risk_free_rate: None,
            };
            let result = analysis::efficient_frontier(&provider, &req, &config);
            print(&result)?;
            result.is_ok()
        }
        "backtest" => {
            let (start, end) = dates()?;
            let rebalance_freq = match rest.get(3) {
                Some(f) => f.parse::<RebalanceFrequency>().map_err(|e| e.to_string())?,
                None => RebalanceFrequency::default(),
            };
            let req = BacktestRequest {
                portfolios: vec![Portfolio {
                    name: "Portfolio".to_string(),
                    tickers: split_list(first?),
                    weights: parse_weights(rest.get(4))?,
                }],
                start_date: start,
                end_date: end,
                starting_value: default_starting_value(),
                rebalance_freq,
            };
            let result = analysis::run_backtest(&provider, &req, &config);
            print(&result)?;
            result.is_ok()
        }
        "sensitivity" => {
            let (start, end) = dates()?;
            let req = SensitivityRequest {
                tickers: split_list(first?),
                weights: parse_weights(rest.get(3))?,
                start_date: start,
                end_date: end,
                starting_value: default_starting_value(),
            };
            let result = analysis::rebalancing_sensitivity(&provider, &req, &config);
            print(&result)?;
            result.is_ok()
        }
        "tvm" => {
            let req = parse_tvm(rest)?;
            let result = analysis::time_value_of_money(&req);
            print(&result)?;
            result.is_ok()
        }
        other => return Err(format!("unknown command {:?}\n{}", other, USAGE)),
    };
    Ok(ok)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let start = Instant::now();

    match run(&args) {
        Ok(ok) => {
            tracing::info!(elapsed_ms = start.elapsed().as_secs_f64() * 1000.0, "done");
            if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(2)
        }
    }
}
