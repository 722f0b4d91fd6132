//! Calendar arithmetic shared across the analytics core
//!
//! Ages are deliberately lossy: month-granularity uses a 30.44-day month and
//! year-granularity a 365.25-day year. Contract allocation and forecast
//! months advance by wall-clock months, never by adding 30 days.

use chrono::{Datelike, Months, NaiveDate};

/// Average days per month used for age-in-months arithmetic
pub const DAYS_PER_MONTH: f64 = 30.44;

/// Average days per year used for age-in-years arithmetic
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Truncate a date to the first day of its month
pub fn first_of_month(d: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(d.year(), d.month(), 1)
        .expect("first of month is always a valid date")
}

/// Advance a date by whole calendar months (day clamped to month end)
pub fn add_months(d: NaiveDate, months: u32) -> NaiveDate {
    d.checked_add_months(Months::new(months))
        .expect("date arithmetic stays within chrono's supported range")
}

/// Age in whole months between two dates, truncated (negative when `to < from`)
pub fn age_months(from: NaiveDate, to: NaiveDate) -> i64 {
    let days = (to - from).num_days() as f64;
    (days / DAYS_PER_MONTH) as i64
}

/// Age in fractional years between two dates
pub fn age_years(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / DAYS_PER_YEAR
}

/// Fiscal calendar with a configurable year boundary
///
/// The default is the October-September federal fiscal year: a date belongs
/// to the fiscal year in which its October-September window ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalCalendar {
    /// First month of the fiscal year (1-12)
    pub start_month: u32,
}

impl FiscalCalendar {
    pub fn new(start_month: u32) -> Self {
        debug_assert!((1..=12).contains(&start_month));
        Self { start_month }
    }

    /// Fiscal year a date belongs to, indexed by the ending calendar year
    pub fn fiscal_year(&self, d: NaiveDate) -> i32 {
        if self.start_month > 1 && d.month() >= self.start_month {
            d.year() + 1
        } else {
            d.year()
        }
    }

    /// Months remaining in the fiscal year that contains `d`, counting the
    /// month of `d` itself. Used to prorate first-year depreciation.
    pub fn months_in_first_fiscal_year(&self, d: NaiveDate) -> u32 {
        let month = d.month();
        if month >= self.start_month {
            12 - (month - self.start_month)
        } else {
            self.start_month - month
        }
    }
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self { start_month: 10 }
    }
}

/// Round to 2 decimal places (costs)
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Round to 4 decimal places (rates, probabilities)
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_first_of_month() {
        assert_eq!(first_of_month(d(2024, 3, 17)), d(2024, 3, 1));
        assert_eq!(first_of_month(d(2024, 3, 1)), d(2024, 3, 1));
    }

    #[test]
    fn test_add_months_wraps_year() {
        assert_eq!(add_months(d(2024, 11, 1), 1), d(2024, 12, 1));
        assert_eq!(add_months(d(2024, 12, 1), 1), d(2025, 1, 1));
        assert_eq!(add_months(d(2024, 1, 31), 1), d(2024, 2, 29));
    }

    #[test]
    fn test_age_months_truncates() {
        // 61 days / 30.44 = 2.004 months
        assert_eq!(age_months(d(2024, 1, 1), d(2024, 3, 2)), 2);
        assert_eq!(age_months(d(2024, 1, 1), d(2024, 1, 20)), 0);
    }

    #[test]
    fn test_fiscal_year_october_boundary() {
        let cal = FiscalCalendar::default();
        assert_eq!(cal.fiscal_year(d(2023, 9, 30)), 2023);
        assert_eq!(cal.fiscal_year(d(2023, 10, 1)), 2024);
        assert_eq!(cal.fiscal_year(d(2024, 1, 15)), 2024);
    }

    #[test]
    fn test_months_in_first_fiscal_year() {
        let cal = FiscalCalendar::default();
        // January acquisition: Jan through Sep = 9 months
        assert_eq!(cal.months_in_first_fiscal_year(d(2020, 1, 15)), 9);
        // October acquisition: Oct through Sep = 12 months
        assert_eq!(cal.months_in_first_fiscal_year(d(2020, 10, 3)), 12);
        // December acquisition: Dec through Sep = 10 months
        assert_eq!(cal.months_in_first_fiscal_year(d(2020, 12, 3)), 10);
        // September acquisition: just September
        assert_eq!(cal.months_in_first_fiscal_year(d(2020, 9, 3)), 1);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round2(12.3456), 12.35);
        assert_eq!(round4(0.123456), 0.1235);
    }
}
