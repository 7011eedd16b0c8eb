use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use portfolio_analytics::backtest::{
    calculate_metrics, PortfolioSimulator, PriceMatrix, RebalanceFrequency, RebalanceSchedule,
};
use portfolio_analytics::optimize::{sample_frontier, MeanVarianceOptimizer, ReturnStats};
use portfolio_analytics::tvm::solve_rate;
use portfolio_analytics::AnalyticsConfig;

/// Ten years of daily prices for `n` loosely correlated assets
fn price_matrix(n: usize) -> PriceMatrix {
    let start = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
    let dates: Vec<NaiveDate> = start.iter_days().take(2520).collect();
    let columns = (0..n)
        .map(|a| {
            let drift = 1.0 + 0.0001 * (a + 1) as f64;
            let prices = (0..dates.len())
                .map(|i| {
                    let t = i as f64;
                    100.0 * drift.powf(t) * (1.0 + 0.02 * (t / (5.0 + a as f64)).sin())
                })
                .collect();
            (format!("T{}", a), prices)
        })
        .collect();
    PriceMatrix::from_columns(dates, columns).unwrap()
}

fn bench_simulator(c: &mut Criterion) {
    let prices = price_matrix(10);
    let weights = vec![0.1; 10];
    let config = AnalyticsConfig::default();

    for freq in [RebalanceFrequency::Daily, RebalanceFrequency::Monthly] {
        let schedule = RebalanceSchedule::build(freq, prices.dates());
        c.bench_function(&format!("simulate_10x2520_{}", freq), |b| {
            b.iter(|| {
                let sim = PortfolioSimulator::new(black_box(&prices), &weights, 100_000.0).run(&schedule);
                calculate_metrics(&sim.curve.dates(), &sim.curve.values(), &config).unwrap()
            })
        });
    }
}

fn bench_optimizer(c: &mut Criterion) {
    let prices = price_matrix(20);
    let stats = ReturnStats::from_prices(&prices, 252.0).unwrap();

    c.bench_function("return_stats_20x2520", |b| {
        b.iter(|| ReturnStats::from_prices(black_box(&prices), 252.0).unwrap())
    });
    c.bench_function("frontier_20_assets_50_points", |b| {
        b.iter(|| {
            let opt = MeanVarianceOptimizer::new(black_box(&stats), 0.02).unwrap();
            sample_frontier(&opt, 50).unwrap()
        })
    });
}

fn bench_tvm(c: &mut Criterion) {
    c.bench_function("tvm_solve_rate", |b| {
        b.iter(|| solve_rate(black_box(-1000.0), 2500.0, 15.0, -50.0))
    });
}

criterion_group!(benches, bench_simulator, bench_optimizer, bench_tvm);
criterion_main!(benches);
