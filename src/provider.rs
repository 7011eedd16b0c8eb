//! Price data providers
//!
//! A provider turns ticker symbols and a date window into raw, possibly sparse
//! observations. It never fails: tickers that cannot be loaded are simply
//! absent from the result and the problem is logged.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{
    Array, ArrayRef, Date32Array, Float64Array, LargeStringArray, StringArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Days, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::backtest::alignment::RawPrices;

/// Source of historical prices
pub trait PriceDataProvider: Send + Sync {
    /// Observations for each ticker with `start <= date < end`.
    fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> RawPrices;
}

fn in_window(series: &[(NaiveDate, f64)], start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, f64)> {
    series
        .iter()
        .filter(|(d, _)| *d >= start && *d < end)
        .copied()
        .collect()
}

// ============================================================================
// In-memory
// ============================================================================

/// Fixed series held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceProvider {
    series: HashMap<String, Vec<(NaiveDate, f64)>>,
}

impl InMemoryPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, ticker: &str, series: Vec<(NaiveDate, f64)>) -> Self {
        self.insert(ticker, series);
        self
    }

    pub fn insert(&mut self, ticker: &str, series: Vec<(NaiveDate, f64)>) {
        self.series.insert(ticker.to_uppercase(), series);
    }
}

impl PriceDataProvider for InMemoryPriceProvider {
    fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> RawPrices {
        let mut out = RawPrices::new();
        for ticker in tickers {
            match self.series.get(ticker) {
                Some(series) => {
                    let window = in_window(series, start, end);
                    if !window.is_empty() {
                        out.insert(ticker.clone(), window);
                    }
                }
                None => tracing::warn!(%ticker, "no price series for ticker"),
            }
        }
        out
    }
}

// ============================================================================
// Parquet directory
// ============================================================================

/// Reads `<TICKER>.parquet` files from a directory.
///
/// Each file needs a `Date` column (timestamp, date32 or ISO string) and an
/// `Adj Close` column; `Close` is used when `Adj Close` is missing.
#[derive(Debug, Clone)]
pub struct ParquetPriceProvider {
    dir: PathBuf,
}

impl ParquetPriceProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ParquetPriceProvider { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Tickers with a parquet file in the directory, sorted
    pub fn list_tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| {
                        let name = e.file_name().to_string_lossy().to_string();
                        name.strip_suffix(".parquet").map(|t| t.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();
        tickers.sort();
        tickers
    }

    /// File holding `ticker`, or `None` when the symbol could escape the directory
    fn ticker_path(&self, ticker: &str) -> Option<PathBuf> {
        if ticker.is_empty() || ticker.contains(['/', '\\', ':']) || ticker.contains("..") {
            return None;
        }
        Some(self.dir.join(format!("{}.parquet", ticker)))
    }
}

impl PriceDataProvider for ParquetPriceProvider {
    fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> RawPrices {
        let mut out = RawPrices::new();
        for ticker in tickers {
            let Some(path) = self.ticker_path(ticker) else {
                tracing::warn!(%ticker, "rejected ticker symbol");
                continue;
            };
            match read_price_file(&path) {
                Ok(series) => {
                    let window = in_window(&series, start, end);
                    if window.is_empty() {
                        tracing::warn!(%ticker, %start, %end, "no observations in date range");
                    } else {
                        out.insert(ticker.clone(), window);
                    }
                }
                Err(e) => tracing::warn!(%ticker, path = %path.display(), error = %e, "failed to load prices"),
            }
        }
        out
    }
}

/// Read (date, price) pairs from one parquet file
pub fn read_price_file(path: &Path) -> Result<Vec<(NaiveDate, f64)>, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| e.to_string())?;
    let reader = builder.build().map_err(|e| e.to_string())?;

    let mut series = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| e.to_string())?;
        read_batch(&batch, &mut series)?;
    }
    Ok(series)
}

fn read_batch(batch: &RecordBatch, out: &mut Vec<(NaiveDate, f64)>) -> Result<(), String> {
    let date_col = batch
        .column_by_name("Date")
        .ok_or_else(|| "missing Date column".to_string())?;
    let price_col = batch
        .column_by_name("Adj Close")
        .or_else(|| batch.column_by_name("Close"))
        .ok_or_else(|| "missing Adj Close / Close column".to_string())?;
    let prices = price_col
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| format!("price column is {}, expected Float64", price_col.data_type()))?;

    let dates = date_values(date_col)?;
    for (i, date) in dates.into_iter().enumerate() {
        let Some(date) = date else { continue };
        let price = if prices.is_null(i) { f64::NAN } else { prices.value(i) };
        out.push((date, price));
    }
    Ok(())
}

fn date_values(col: &ArrayRef) -> Result<Vec<Option<NaiveDate>>, String> {
    fn from_seconds(secs: i64) -> Option<NaiveDate> {
        DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
    }

    fn collect<A: Array>(arr: &A, f: impl Fn(usize) -> Option<NaiveDate>) -> Vec<Option<NaiveDate>> {
        (0..arr.len())
            .map(|i| if arr.is_null(i) { None } else { f(i) })
            .collect()
    }

    fn downcast<T: 'static>(col: &ArrayRef) -> Result<&T, String> {
        col.as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| format!("unexpected Date column type {}", col.data_type()))
    }

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).ok_or("invalid epoch")?;

    let dates = match col.data_type() {
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            let arr = downcast::<TimestampNanosecondArray>(col)?;
            collect(arr, |i| from_seconds(arr.value(i).div_euclid(1_000_000_000)))
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            let arr = downcast::<TimestampMicrosecondArray>(col)?;
            collect(arr, |i| from_seconds(arr.value(i).div_euclid(1_000_000)))
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            let arr = downcast::<TimestampMillisecondArray>(col)?;
            collect(arr, |i| from_seconds(arr.value(i).div_euclid(1_000)))
        }
        DataType::Date32 => {
            let arr = downcast::<Date32Array>(col)?;
            collect(arr, |i| {
                let days = arr.value(i);
                if days >= 0 {
                    epoch.checked_add_days(Days::new(days as u64))
                } else {
                    epoch.checked_sub_days(Days::new(days.unsigned_abs() as u64))
                }
            })
        }
        DataType::Utf8 => {
            let arr = downcast::<StringArray>(col)?;
            collect(arr, |i| parse_date(arr.value(i)))
        }
        DataType::LargeUtf8 => {
            let arr = downcast::<LargeStringArray>(col)?;
            collect(arr, |i| parse_date(arr.value(i)))
        }
        other => return Err(format!("unsupported Date column type {}", other)),
    };
    Ok(dates)
}

/// `YYYY-MM-DD`, optionally followed by a time part
fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
