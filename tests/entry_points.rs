//! Entry points end to end against an in-memory price provider
//!
//! Run with: cargo test --test entry_points

use chrono::{Datelike, NaiveDate, Weekday};
use serde_json::{json, Value};

use portfolio_analytics::*;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Two years of weekday prices for three synthetic assets
fn provider() -> InMemoryPriceProvider {
    let days: Vec<NaiveDate> = d(2020, 1, 1)
        .iter_days()
        .take_while(|day| *day < d(2022, 1, 1))
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .collect();

    let series = |f: &dyn Fn(f64) -> f64| -> Vec<(NaiveDate, f64)> {
        days.iter().enumerate().map(|(i, day)| (*day, f(i as f64))).collect()
    };

    InMemoryPriceProvider::new()
        .with_series("SPY", series(&|t| 300.0 * 1.0004f64.powf(t) * (1.0 + 0.03 * (t / 7.0).sin())))
        .with_series("AGG", series(&|t| 110.0 * 1.0001f64.powf(t) * (1.0 + 0.005 * (t / 11.0).cos())))
        .with_series("GLD", series(&|t| 150.0 * 1.0002f64.powf(t) * (1.0 + 0.02 * (t / 5.0).sin())))
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap()
}

#[test]
fn backtest_envelope() {
    let req: BacktestRequest = serde_json::from_value(json!({
        "portfolios": [
            {"name": "60/40", "tickers": ["spy", "agg"], "weights": [0.6, 0.4]},
            {"name": "Gold", "tickers": ["GLD"]}
        ],
        "start_date": "2020-01-01",
        "end_date": "2022-01-01",
        "starting_value": 10000,
        "rebalance_freq": "quarterly"
    }))
    .unwrap();

    let result = run_backtest(&provider(), &req, &AnalyticsConfig::default());
    let body = to_json(&result);

    assert!(body["error"].is_null());
    let curve = body["equity_curves"]["60/40"].as_array().unwrap();
    assert_eq!(curve[0]["date"], "2020-01-01");
    assert_eq!(curve[0]["value"], 10000.0);

    let metrics = body["metrics"].as_array().unwrap();
    assert_eq!(metrics.len(), 2);
    assert_eq!(metrics[1]["name"], "Gold");
    assert!(metrics[1]["cagr"].as_f64().unwrap() > 0.0);
    assert!(metrics[1]["max_drawdown"].as_f64().unwrap() <= 0.0);
    assert!(metrics[1]["rolling_1y"].is_object());
}

#[test]
fn reversed_dates_yield_only_an_error() {
    let req: BacktestRequest = serde_json::from_value(json!({
        "portfolios": [{"tickers": ["SPY"]}],
        "start_date": "2021-01-01",
        "end_date": "2020-01-01"
    }))
    .unwrap();

    let body = to_json(&run_backtest(&provider(), &req, &AnalyticsConfig::default()));
    assert_eq!(body, json!({"error": "Start date must be before end date."}));

    let req = AssetAnalysisRequest {
        ticker: "SPY".into(),
        start_date: d(2021, 1, 1),
        end_date: d(2021, 1, 1),
    };
    let body = to_json(&asset_analysis(&provider(), &req, &AnalyticsConfig::default()));
    assert_eq!(body, json!({"error": "Start date must be before end date."}));
}

#[test]
fn unknown_frequency_is_rejected() {
    let parsed = serde_json::from_value::<BacktestRequest>(json!({
        "portfolios": [{"tickers": ["SPY"]}],
        "rebalance_freq": "hourly"
    }));
    assert!(parsed.is_err());
}

#[test]
fn daily_rebalanced_single_asset_matches_price_path() {
    let req = BacktestRequest {
        portfolios: vec![Portfolio::new("spy", &["SPY"], Some(vec![1.0]))],
        start_date: d(2020, 1, 1),
        end_date: d(2021, 1, 1),
        starting_value: 1000.0,
        rebalance_freq: RebalanceFrequency::Daily,
    };
    let resp = run_backtest(&provider(), &req, &AnalyticsConfig::default()).ok().unwrap();
    let prices = provider().fetch(&["SPY".to_string()], req.start_date, req.end_date);
    let spy = &prices["SPY"];

    let curve = &resp.equity_curves["spy"];
    assert_eq!(curve.len(), spy.len());
    for (point, (date, price)) in curve.points.iter().zip(spy) {
        assert_eq!(point.date, *date);
        assert!((point.value - 1000.0 * price / spy[0].1).abs() < 1e-9);
    }
}

#[test]
fn sensitivity_covers_all_frequencies() {
    let req: SensitivityRequest = serde_json::from_value(json!({
        "tickers": ["SPY", "AGG", "GLD"],
        "weights": [0.5, 0.3, 0.2],
        "start_date": "2020-01-01",
        "end_date": "2022-01-01"
    }))
    .unwrap();
    let body = to_json(&rebalancing_sensitivity(&provider(), &req, &AnalyticsConfig::default()));

    assert!(body["error"].is_null());
    let freqs: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["rebalance_freq"].as_str().unwrap())
        .collect();
    assert_eq!(freqs, vec!["daily", "weekly", "monthly", "quarterly", "yearly"]);
    assert!(body["equity_curves"]["yearly"].is_array());
}

#[test]
fn optimizer_and_frontier() {
    let req: OptimizationRequest = serde_json::from_value(json!({
        "tickers": ["SPY", "AGG", "GLD"],
        "start_date": "2020-01-01",
        "end_date": "2022-01-01",
        "risk_free_rate": 0.01
    }))
    .unwrap();
    let result = portfolio_optimization(&provider(), &req, &AnalyticsConfig::default())
        .ok()
        .unwrap();
    let total: f64 = result.max_sharpe.weights.iter().map(|w| w.weight).sum();
    assert!((total - 1.0).abs() < 1e-6);
    assert_eq!(result.tickers, vec!["SPY", "AGG", "GLD"]);

    let req: FrontierRequest = serde_json::from_value(json!({
        "tickers": ["SPY", "AGG", "GLD"],
        "num_points": 10
    }))
    .unwrap();
    let body = to_json(&efficient_frontier(&provider(), &req, &AnalyticsConfig::default()));
    assert_eq!(body["frontier"].as_array().unwrap().len(), 11);
    assert!(body["frontier"][0]["return"].is_number());
}

#[test]
fn tvm_solves_each_unknown() {
    let cases = [
        (json!({"fv": 1628.894627, "rate": 0.05, "nper": 10}), "pv", 1000.0),
        (json!({"pv": 1000, "rate": 0.05, "nper": 10}), "fv", 1628.894627),
        (json!({"pv": 1000, "fv": 1628.894627, "nper": 10}), "rate", 0.05),
        (json!({"pv": 1000, "fv": 1628.894627, "rate": 0.05}), "nper", 10.0),
    ];
    for (input, field, expected) in cases {
        let req: TvmRequest = serde_json::from_value(input).unwrap();
        let body = to_json(&time_value_of_money(&req));
        assert_eq!(body["solved"], field);
        let got = body[field].as_f64().unwrap();
        assert!((got - expected).abs() < 1e-4 * expected.abs(), "{}: {}", field, got);
    }

    let req: TvmRequest = serde_json::from_value(json!({"pv": 1000, "rate": 0.05})).unwrap();
    let body = to_json(&time_value_of_money(&req));
    assert_eq!(body, json!({"error": "Exactly one of PV, FV, rate, or nper must be unknown (null)."}));
}
