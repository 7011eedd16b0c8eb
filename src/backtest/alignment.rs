// src/backtest/alignment.rs
// Calendar alignment: dense, gap-filled price matrix from sparse observations

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::error::{AnalyticsError, Result};

/// Raw per-ticker observations as returned by a provider.
/// Series may be sparse, unsorted and contain `NaN` for missing values.
pub type RawPrices = HashMap<String, Vec<(NaiveDate, f64)>>;

// ============================================================================
// Price Matrix
// ============================================================================

/// Prices for several tickers aligned on one ordered date index.
/// Every column has a finite value on every row.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    /// One column per ticker, each `dates.len()` long
    columns: Vec<Vec<f64>>,
}

impl PriceMatrix {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Number of rows (dates)
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.tickers.iter().any(|t| t == ticker)
    }

    pub fn column(&self, ticker: &str) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    /// All prices on one row, in ticker order
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[index]).collect()
    }

    /// Sub-matrix with the given tickers (those present), in the given order.
    /// `None` when none of them are present.
    pub fn select(&self, tickers: &[String]) -> Option<PriceMatrix> {
        let mut selected = Vec::new();
        let mut columns = Vec::new();
        for ticker in tickers {
            if selected.contains(ticker) {
                continue;
            }
            if let Some(col) = self.column(ticker) {
                selected.push(ticker.clone());
                columns.push(col.to_vec());
            }
        }
        if selected.is_empty() {
            return None;
        }
        Some(PriceMatrix {
            dates: self.dates.clone(),
            tickers: selected,
            columns,
        })
    }

    /// Daily percentage changes, one column per ticker. Rows where any
    /// ticker's return is not finite are dropped.
    pub fn returns(&self) -> ReturnMatrix {
        let mut dates = Vec::new();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); self.tickers.len()];

        for i in 1..self.len() {
            let row: Vec<f64> = self
                .columns
                .iter()
                .map(|c| c[i] / c[i - 1] - 1.0)
                .collect();
            if row.iter().all(|r| r.is_finite()) {
                dates.push(self.dates[i]);
                for (col, r) in columns.iter_mut().zip(row) {
                    col.push(r);
                }
            }
        }

        ReturnMatrix {
            dates,
            tickers: self.tickers.clone(),
            columns,
        }
    }
}

/// Daily returns aligned on one date index
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    /// Number of observations (rows)
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn n_assets(&self) -> usize {
        self.tickers.len()
    }
}

// ============================================================================
// Alignment
// ============================================================================

/// Fill gaps in place: forward first, then backward for a leading gap
pub fn fill_forward_backward(values: &mut [f64]) {
    let mut last = f64::NAN;
    for v in values.iter_mut() {
        if v.is_finite() {
            last = *v;
        } else if last.is_finite() {
            *v = last;
        }
    }

    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_finite() {
            next = *v;
        } else {
            *v = next;
        }
    }
}

/// Align raw observations for `tickers` onto the union of their dates.
///
/// Tickers without any finite observation are dropped, rows where every
/// ticker is missing are dropped, and the remaining gaps are filled forward
/// then backward.
pub fn align_prices(raw: &RawPrices, tickers: &[String]) -> Result<PriceMatrix> {
    let present: Vec<&String> = tickers
        .iter()
        .filter(|t| {
            raw.get(t.as_str())
                .map_or(false, |obs| obs.iter().any(|(_, p)| p.is_finite()))
        })
        .collect();

    if present.is_empty() {
        return Err(AnalyticsError::unavailable(
            "Could not load price data for the given tickers and date range.",
        ));
    }

    let all_dates: Vec<NaiveDate> = present
        .iter()
        .flat_map(|t| raw[t.as_str()].iter().map(|(d, _)| *d))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let index: HashMap<NaiveDate, usize> = all_dates
        .iter()
        .enumerate()
        .map(|(i, d)| (*d, i))
        .collect();

    let mut columns: Vec<Vec<f64>> = present
        .iter()
        .map(|t| {
            let mut col = vec![f64::NAN; all_dates.len()];
            for &(date, price) in &raw[t.as_str()] {
                if price.is_finite() {
                    col[index[&date]] = price;
                }
            }
            col
        })
        .collect();

    // Drop rows where every ticker is missing
    let keep: Vec<usize> = (0..all_dates.len())
        .filter(|&i| columns.iter().any(|c| c[i].is_finite()))
        .collect();
    let dates: Vec<NaiveDate> = keep.iter().map(|&i| all_dates[i]).collect();
    for col in columns.iter_mut() {
        *col = keep.iter().map(|&i| col[i]).collect();
        fill_forward_backward(col);
    }

    tracing::debug!(
        tickers = present.len(),
        rows = dates.len(),
        "aligned price matrix"
    );

    if dates.len() < 2 {
        return Err(AnalyticsError::unavailable(
            "Could not load enough price data for the given tickers and date range.",
        ));
    }

    Ok(PriceMatrix {
        dates,
        tickers: present.into_iter().cloned().collect(),
        columns,
    })
}

impl PriceMatrix {
    /// Build a matrix from already dense columns (test and bench helper).
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<PriceMatrix> {
        let mut raw = RawPrices::new();
        let mut tickers = Vec::new();
        for (ticker, values) in columns {
            let series = dates.iter().copied().zip(values).collect();
            tickers.push(ticker.clone());
            raw.insert(ticker, series);
        }
        align_prices(&raw, &tickers)
    }
}
