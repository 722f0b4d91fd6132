//! Straight-line and MACRS depreciation schedules aligned to the fiscal year

use crate::dates::{round2, FiscalCalendar};
use crate::error::AnalyticsError;
use crate::registry::{DepreciationMethod, DepreciationRow, EquipmentId};
use crate::store::EquipmentStore;
use chrono::NaiveDate;
use serde::Serialize;

/// IRS half-year-convention recovery percentages, 5-year property
pub const MACRS_5YR: [f64; 6] = [0.20, 0.32, 0.192, 0.1152, 0.1152, 0.0576];

/// IRS half-year-convention recovery percentages, 7-year property
pub const MACRS_7YR: [f64; 8] = [
    0.1429, 0.2449, 0.1749, 0.1249, 0.0893, 0.0892, 0.0893, 0.0446,
];

/// Useful life assumed when the registry entry does not configure one
const DEFAULT_USEFUL_LIFE_MONTHS: u32 = 120;

/// Salvage fraction assumed for straight-line book value
const DEFAULT_SALVAGE_FRACTION: f64 = 0.05;

/// Residual below which the straight-line schedule stops emitting years
const DEPRECIABLE_RESIDUAL: f64 = 0.01;

/// One fiscal year of a depreciation schedule
#[derive(Debug, Clone, Serialize)]
pub struct DepreciationYear {
    pub fiscal_year: i32,
    pub beginning_book_value: f64,
    pub depreciation_expense: f64,
    pub ending_book_value: f64,
    pub accumulated_depreciation: f64,
}

/// Straight-line schedule with first-year proration to the fiscal year
///
/// The first year's expense is prorated by the months remaining in the
/// acquisition fiscal year; the final year's expense is clamped so the
/// ending book value lands on the salvage value.
pub fn straight_line_schedule(
    acquisition_cost: f64,
    salvage_value: f64,
    useful_life_years: u32,
    acquisition_date: NaiveDate,
    calendar: FiscalCalendar,
) -> Result<Vec<DepreciationYear>, AnalyticsError> {
    if useful_life_years == 0 {
        return Err(AnalyticsError::InvalidArgument(
            "useful life must be at least one year".to_string(),
        ));
    }

    let depreciable = acquisition_cost - salvage_value;
    let annual_expense = depreciable / useful_life_years as f64;

    let start_fy = calendar.fiscal_year(acquisition_date);
    let months_first_year = calendar.months_in_first_fiscal_year(acquisition_date);
    let prorate_first = months_first_year as f64 / 12.0;

    let mut schedule = Vec::new();
    let mut book_value = acquisition_cost;
    let mut accumulated = 0.0;
    let mut remaining = depreciable;

    for i in 0..=useful_life_years {
        if remaining <= DEPRECIABLE_RESIDUAL {
            break;
        }

        let expense = if i == 0 {
            annual_expense * prorate_first
        } else {
            annual_expense
        };
        let expense = expense.min(remaining);

        let beginning = book_value;
        accumulated += expense;
        book_value -= expense;
        remaining -= expense;

        schedule.push(DepreciationYear {
            fiscal_year: start_fy + i as i32,
            beginning_book_value: round2(beginning),
            depreciation_expense: round2(expense),
            ending_book_value: round2(book_value),
            accumulated_depreciation: round2(accumulated),
        });
    }

    Ok(schedule)
}

/// MACRS schedule for a 5- or 7-year recovery period
pub fn macrs_schedule(
    acquisition_cost: f64,
    recovery_period: u32,
    acquisition_date: NaiveDate,
    calendar: FiscalCalendar,
) -> Result<Vec<DepreciationYear>, AnalyticsError> {
    let percentages: &[f64] = match recovery_period {
        5 => &MACRS_5YR,
        7 => &MACRS_7YR,
        other => return Err(AnalyticsError::UnsupportedRecoveryPeriod(other)),
    };

    let start_fy = calendar.fiscal_year(acquisition_date);

    let mut schedule = Vec::with_capacity(percentages.len());
    let mut book_value = acquisition_cost;
    let mut accumulated = 0.0;

    for (i, pct) in percentages.iter().enumerate() {
        let expense = acquisition_cost * pct;
        let beginning = book_value;
        accumulated += expense;
        book_value -= expense;

        schedule.push(DepreciationYear {
            fiscal_year: start_fy + i as i32,
            beginning_book_value: round2(beginning),
            depreciation_expense: round2(expense),
            ending_book_value: round2(book_value.max(0.0)),
            accumulated_depreciation: round2(accumulated),
        });
    }

    Ok(schedule)
}

/// Computes and persists per-asset depreciation schedules
#[derive(Debug, Clone)]
pub struct Depreciator {
    calendar: FiscalCalendar,
    as_of: NaiveDate,
}

impl Depreciator {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            calendar: FiscalCalendar::default(),
            as_of,
        }
    }

    pub fn with_calendar(mut self, calendar: FiscalCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Recompute the (asset, method) schedule, replace the persisted rows,
    /// and return the current book value.
    ///
    /// Straight-line uses the registry's useful life (`// 12` to whole years,
    /// default 120 months) and a 5% salvage; MACRS uses the 7-year table.
    /// The returned book value is the ending value of the latest fiscal year
    /// not after today's, or the full acquisition cost when the acquisition
    /// falls in a future fiscal year.
    pub fn compute_book_value(
        &self,
        store: &mut dyn EquipmentStore,
        equipment_id: EquipmentId,
        method: DepreciationMethod,
    ) -> Result<f64, AnalyticsError> {
        let eq = store
            .equipment(equipment_id)?
            .ok_or_else(|| AnalyticsError::NotFound(format!("id {}", equipment_id)))?;

        let cost = eq.acquisition_cost;
        let useful_months = eq.useful_life_months.unwrap_or(DEFAULT_USEFUL_LIFE_MONTHS);

        let entries = match method {
            DepreciationMethod::Macrs => {
                macrs_schedule(cost, 7, eq.acquisition_date, self.calendar)?
            }
            DepreciationMethod::StraightLine => {
                let salvage = cost * DEFAULT_SALVAGE_FRACTION;
                straight_line_schedule(
                    cost,
                    salvage,
                    useful_months / 12,
                    eq.acquisition_date,
                    self.calendar,
                )?
            }
        };

        store.delete_depreciation_rows(equipment_id, method)?;

        let current_fy = self.calendar.fiscal_year(self.as_of);
        let mut book_value = cost;

        for entry in &entries {
            store.insert_depreciation_row(DepreciationRow {
                id: 0,
                equipment_id,
                fiscal_year: entry.fiscal_year,
                method,
                beginning_book_value: entry.beginning_book_value,
                depreciation_expense: entry.depreciation_expense,
                ending_book_value: entry.ending_book_value,
                accumulated_depreciation: entry.accumulated_depreciation,
            })?;

            if entry.fiscal_year <= current_fy {
                book_value = entry.ending_book_value;
            }
        }

        log::debug!(
            "asset {}: {} book value {:.2} over {} fiscal years",
            equipment_id,
            method.as_str(),
            book_value,
            entries.len()
        );
        Ok(book_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EquipmentRegistry, EquipmentStatus};
    use crate::store::MemoryStore;
    use approx::assert_abs_diff_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_straight_line_reference_case() {
        // $100k cost, $10k salvage, 10-year life, acquired 2020-01-15
        let schedule =
            straight_line_schedule(100_000.0, 10_000.0, 10, d(2020, 1, 15), FiscalCalendar::default())
                .unwrap();

        // January is in FY2020; 9 months remain through September
        assert_eq!(schedule[0].fiscal_year, 2020);
        assert_abs_diff_eq!(schedule[0].depreciation_expense, 6_750.0, epsilon = 0.01);
        assert_abs_diff_eq!(schedule[1].depreciation_expense, 9_000.0, epsilon = 0.01);

        let total: f64 = schedule.iter().map(|y| y.depreciation_expense).sum();
        assert_abs_diff_eq!(total, 90_000.0, epsilon = 1.0);

        let last = schedule.last().unwrap();
        assert_abs_diff_eq!(last.ending_book_value, 10_000.0, epsilon = 1.0);
    }

    #[test]
    fn test_straight_line_book_value_chain() {
        let schedule =
            straight_line_schedule(50_000.0, 2_500.0, 7, d(2021, 11, 3), FiscalCalendar::default())
                .unwrap();

        // November acquisition belongs to FY2022
        assert_eq!(schedule[0].fiscal_year, 2022);

        let mut prev_accumulated = 0.0;
        for pair in schedule.windows(2) {
            assert_abs_diff_eq!(
                pair[0].ending_book_value,
                pair[1].beginning_book_value,
                epsilon = 0.01
            );
        }
        for year in &schedule {
            assert!(year.accumulated_depreciation >= prev_accumulated);
            prev_accumulated = year.accumulated_depreciation;
        }
    }

    #[test]
    fn test_straight_line_rejects_zero_life() {
        let err = straight_line_schedule(10_000.0, 0.0, 0, d(2020, 1, 1), FiscalCalendar::default())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));
    }

    #[test]
    fn test_macrs_percentages_sum_to_one() {
        let sum5: f64 = MACRS_5YR.iter().sum();
        let sum7: f64 = MACRS_7YR.iter().sum();
        assert_abs_diff_eq!(sum5, 1.0, epsilon = 0.001);
        assert_abs_diff_eq!(sum7, 1.0, epsilon = 0.001);
    }

    #[test]
    fn test_macrs_7yr_on_one_million() {
        let schedule =
            macrs_schedule(1_000_000.0, 7, d(2020, 1, 15), FiscalCalendar::default()).unwrap();
        assert_eq!(schedule.len(), 8);

        let expected = [
            142_900.0, 244_900.0, 174_900.0, 124_900.0, 89_300.0, 89_200.0, 89_300.0, 44_600.0,
        ];
        for (year, want) in schedule.iter().zip(expected) {
            assert_abs_diff_eq!(year.depreciation_expense, want, epsilon = 0.01);
        }

        let total: f64 = schedule.iter().map(|y| y.depreciation_expense).sum();
        assert_abs_diff_eq!(total, 1_000_000.0, epsilon = 1.0);
        assert!(schedule.last().unwrap().ending_book_value < 1.0);
    }

    #[test]
    fn test_macrs_5yr_exhausts_cost() {
        let schedule =
            macrs_schedule(250_000.0, 5, d(2022, 10, 1), FiscalCalendar::default()).unwrap();
        assert_eq!(schedule.len(), 6);
        assert_eq!(schedule[0].fiscal_year, 2023);

        let total: f64 = schedule.iter().map(|y| y.depreciation_expense).sum();
        assert_abs_diff_eq!(total, 250_000.0, epsilon = 1.0);
        assert!(schedule.last().unwrap().ending_book_value < 1.0);
    }

    #[test]
    fn test_macrs_rejects_other_periods() {
        let err = macrs_schedule(10_000.0, 10, d(2020, 1, 1), FiscalCalendar::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::UnsupportedRecoveryPeriod(10)));
    }

    fn insert_asset(store: &mut MemoryStore, acq: NaiveDate, cost: f64, life: Option<u32>) -> EquipmentId {
        store
            .insert_equipment(EquipmentRegistry {
                id: 0,
                asset_tag: format!("EQ-{}", acq),
                serial_number: None,
                equipment_class: "mri".to_string(),
                manufacturer: None,
                model_name: None,
                facility_id: "FAC-001".to_string(),
                department: None,
                acquisition_date: acq,
                acquisition_cost: cost,
                installation_date: None,
                warranty_expiration: None,
                useful_life_months: life,
                status: EquipmentStatus::Active,
                disposition_date: None,
                disposition_method: None,
            })
            .unwrap()
    }

    #[test]
    fn test_compute_book_value_persists_and_replaces() {
        let mut store = MemoryStore::new();
        let id = insert_asset(&mut store, d(2018, 1, 15), 100_000.0, Some(120));
        let depreciator = Depreciator::new(d(2026, 2, 26));

        let bv = depreciator
            .compute_book_value(&mut store, id, DepreciationMethod::StraightLine)
            .unwrap();

        let rows = store
            .depreciation_rows(id, DepreciationMethod::StraightLine)
            .unwrap();
        assert!(!rows.is_empty());

        // FY2026 falls mid-schedule; book value sits between salvage and cost
        assert!(bv > 5_000.0 - 1.0);
        assert!(bv < 100_000.0);

        // Re-running replaces rather than appends
        let again = depreciator
            .compute_book_value(&mut store, id, DepreciationMethod::StraightLine)
            .unwrap();
        assert_abs_diff_eq!(bv, again, epsilon = 0.01);
        let rerun_rows = store
            .depreciation_rows(id, DepreciationMethod::StraightLine)
            .unwrap();
        assert_eq!(rows.len(), rerun_rows.len());
    }

    #[test]
    fn test_future_acquisition_returns_cost() {
        let mut store = MemoryStore::new();
        let id = insert_asset(&mut store, d(2030, 1, 15), 75_000.0, Some(60));
        let depreciator = Depreciator::new(d(2026, 2, 26));

        let bv = depreciator
            .compute_book_value(&mut store, id, DepreciationMethod::StraightLine)
            .unwrap();
        assert_abs_diff_eq!(bv, 75_000.0);
    }

    #[test]
    fn test_unknown_asset() {
        let mut store = MemoryStore::new();
        let depreciator = Depreciator::new(d(2026, 2, 26));
        let err = depreciator
            .compute_book_value(&mut store, 42, DepreciationMethod::Macrs)
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::NotFound(_)));
    }
}
