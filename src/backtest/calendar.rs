// src/backtest/calendar.rs
// Rebalance calendar: which trading dates trigger a rebalance

use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate};

use crate::backtest::types::RebalanceFrequency;

/// Calendar period-end dates between `start` and `end` (inclusive).
///
/// Weeks end on Sunday, quarters on Mar 31 / Jun 30 / Sep 30 / Dec 31 and
/// years on Dec 31. These are calendar dates, not trading dates.
pub fn period_boundaries(freq: RebalanceFrequency, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return vec![];
    }

    match freq {
        RebalanceFrequency::Daily => start.iter_days().take_while(|d| *d <= end).collect(),
        RebalanceFrequency::Weekly => {
            let offset = (7 - start.weekday().num_days_from_sunday()) % 7;
            let first = start.checked_add_days(Days::new(offset as u64));
            std::iter::successors(first, |d| d.checked_add_days(Days::new(7)))
                .take_while(|d| *d <= end)
                .collect()
        }
        RebalanceFrequency::Monthly => month_ends(start, end, |_| true),
        RebalanceFrequency::Quarterly => month_ends(start, end, |m| m % 3 == 0),
        RebalanceFrequency::Yearly => month_ends(start, end, |m| m == 12),
    }
}

/// Last calendar day of a month
fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (y, m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(y, m, 1)?.pred_opt()
}

fn month_ends(start: NaiveDate, end: NaiveDate, keep_month: impl Fn(u32) -> bool) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());

    while (year, month) <= (end.year(), end.month()) {
        if keep_month(month) {
            if let Some(last) = last_day_of_month(year, month) {
                if last >= start && last <= end {
                    out.push(last);
                }
            }
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    out
}

/// Set of trading dates on which the simulator rebalances
#[derive(Debug, Clone, Default)]
pub struct RebalanceSchedule {
    dates: HashSet<NaiveDate>,
}

impl RebalanceSchedule {
    /// Period boundaries at `freq` that are also trading dates, plus the first
    /// trading date (the initial allocation).
    pub fn build(freq: RebalanceFrequency, trading_dates: &[NaiveDate]) -> Self {
        let (first, last) = match (trading_dates.iter().min(), trading_dates.iter().max()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return RebalanceSchedule::default(),
        };

        let trading: HashSet<NaiveDate> = trading_dates.iter().copied().collect();
        let mut dates: HashSet<NaiveDate> = period_boundaries(freq, first, last)
            .into_iter()
            .filter(|d| trading.contains(d))
            .collect();
        dates.insert(first);

        tracing::debug!(freq = %freq, rebalances = dates.len(), "built rebalance schedule");
        RebalanceSchedule { dates }
    }

    #[inline]
    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.dates.contains(date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Weekdays only, like an exchange calendar without holidays
    fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .collect()
    }

    #[test]
    fn test_month_ends() {
        let b = period_boundaries(RebalanceFrequency::Monthly, ymd(2024, 1, 15), ymd(2024, 4, 30));
        assert_eq!(b, vec![ymd(2024, 1, 31), ymd(2024, 2, 29), ymd(2024, 3, 31), ymd(2024, 4, 30)]);
    }

    #[test]
    fn test_quarter_and_year_ends() {
        let q = period_boundaries(RebalanceFrequency::Quarterly, ymd(2023, 2, 1), ymd(2024, 1, 10));
        assert_eq!(q, vec![ymd(2023, 3, 31), ymd(2023, 6, 30), ymd(2023, 9, 30), ymd(2023, 12, 31)]);

        let y = period_boundaries(RebalanceFrequency::Yearly, ymd(2020, 6, 1), ymd(2023, 12, 31));
        assert_eq!(y, vec![ymd(2020, 12, 31), ymd(2021, 12, 31), ymd(2022, 12, 31), ymd(2023, 12, 31)]);
    }

    #[test]
    fn test_weekly_sundays() {
        // 2024-01-03 is a Wednesday
        let w = period_boundaries(RebalanceFrequency::Weekly, ymd(2024, 1, 3), ymd(2024, 1, 21));
        assert_eq!(w, vec![ymd(2024, 1, 7), ymd(2024, 1, 14), ymd(2024, 1, 21)]);
    }

    #[test]
    fn test_daily_schedule_covers_every_trading_day() {
        let dates = weekdays(ymd(2024, 1, 1), ymd(2024, 1, 31));
        let s = RebalanceSchedule::build(RebalanceFrequency::Daily, &dates);
        assert_eq!(s.len(), dates.len());
        assert!(dates.iter().all(|d| s.contains(d)));
    }

    #[test]
    fn test_first_date_always_included() {
        let dates = weekdays(ymd(2024, 1, 2), ymd(2024, 1, 31));
        let s = RebalanceSchedule::build(RebalanceFrequency::Yearly, &dates);
        assert_eq!(s.len(), 1);
        assert!(s.contains(&ymd(2024, 1, 2)));
    }

    #[test]
    fn test_month_end_on_weekend_is_skipped() {
        // 2024-03-31 is a Sunday, 2024-04-30 a Tuesday
        let dates = weekdays(ymd(2024, 3, 1), ymd(2024, 5, 10));
        let s = RebalanceSchedule::build(RebalanceFrequency::Monthly, &dates);
        assert_eq!(s.len(), 2);
        assert!(s.contains(&ymd(2024, 3, 1)));
        assert!(s.contains(&ymd(2024, 4, 30)));
    }

    #[test]
    fn test_empty_index() {
        let s = RebalanceSchedule::build(RebalanceFrequency::Daily, &[]);
        assert!(s.is_empty());
    }
}
