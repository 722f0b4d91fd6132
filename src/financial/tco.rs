//! Total cost of ownership with downtime costing

use crate::config::DEFAULT_DOWNTIME_HOURLY_RATE;
use crate::dates::{round2, round4};
use crate::error::AnalyticsError;
use crate::registry::EquipmentId;
use crate::store::EquipmentStore;
use chrono::NaiveDate;
use serde::Serialize;

/// Floor on the age denominator when annualising, years
const MIN_AGE_YEARS: f64 = 0.5;

/// TCO report for one asset
#[derive(Debug, Clone, Serialize)]
pub struct TcoReport {
    pub equipment_id: EquipmentId,
    pub asset_tag: String,
    pub equipment_class: String,
    pub acquisition_cost: f64,
    pub cumulative_maintenance: f64,
    pub cumulative_contracts: f64,
    pub estimated_downtime_cost: f64,
    pub total_tco: f64,
    pub age_years: f64,
    pub annualized_tco: f64,
    pub maintenance_to_acquisition_ratio: f64,
}

/// Fleet comparison of age-normalised TCO
#[derive(Debug, Clone, Serialize)]
pub struct TcoComparison {
    pub reports: Vec<TcoReport>,
    pub best_performer: String,
    pub worst_performer: String,
    pub fleet_avg_annualized_tco: f64,
}

/// Total-cost-of-ownership calculator
#[derive(Debug, Clone)]
pub struct TcoCalculator {
    downtime_hourly_rate: f64,
    as_of: NaiveDate,
}

impl TcoCalculator {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            downtime_hourly_rate: DEFAULT_DOWNTIME_HOURLY_RATE,
            as_of,
        }
    }

    pub fn with_downtime_hourly_rate(mut self, rate: f64) -> Self {
        self.downtime_hourly_rate = rate;
        self
    }

    /// TCO through `as_of` (the calculator's date when not given):
    /// acquisition plus cumulative maintenance plus downtime cost,
    /// annualised over an age floored at half a year.
    pub fn calculate_tco(
        &self,
        store: &dyn EquipmentStore,
        equipment_id: EquipmentId,
        as_of: Option<NaiveDate>,
    ) -> Result<TcoReport, AnalyticsError> {
        let as_of = as_of.unwrap_or(self.as_of);
        let eq = store
            .equipment(equipment_id)?
            .ok_or_else(|| AnalyticsError::NotFound(format!("id {}", equipment_id)))?;

        let mut cumulative_maintenance = 0.0;
        let mut cumulative_contracts = 0.0;
        let mut downtime_hours = 0.0;
        for rollup in store.rollups(equipment_id)? {
            if rollup.month > as_of {
                continue;
            }
            cumulative_maintenance += rollup.total_cost;
            cumulative_contracts += rollup.contract_cost_allocated;
            downtime_hours += rollup.downtime_hours;
        }

        let downtime_cost = downtime_hours * self.downtime_hourly_rate;
        let total_tco = eq.acquisition_cost + cumulative_maintenance + downtime_cost;

        let age_years = eq.age_years(as_of);
        let annualized = total_tco / age_years.max(MIN_AGE_YEARS);

        let maint_ratio = if eq.acquisition_cost > 0.0 {
            cumulative_maintenance / eq.acquisition_cost
        } else {
            0.0
        };

        Ok(TcoReport {
            equipment_id,
            asset_tag: eq.asset_tag,
            equipment_class: eq.equipment_class,
            acquisition_cost: round2(eq.acquisition_cost),
            cumulative_maintenance: round2(cumulative_maintenance),
            cumulative_contracts: round2(cumulative_contracts),
            estimated_downtime_cost: round2(downtime_cost),
            total_tco: round2(total_tco),
            age_years: (age_years * 10.0).round() / 10.0,
            annualized_tco: round2(annualized),
            maintenance_to_acquisition_ratio: round4(maint_ratio),
        })
    }

    /// Compare age-normalised TCO across at least two assets
    pub fn compare_tco(
        &self,
        store: &dyn EquipmentStore,
        equipment_ids: &[EquipmentId],
    ) -> Result<TcoComparison, AnalyticsError> {
        if equipment_ids.len() < 2 {
            return Err(AnalyticsError::InvalidArgument(format!(
                "TCO comparison needs at least 2 assets, got {}",
                equipment_ids.len()
            )));
        }

        let reports: Vec<TcoReport> = equipment_ids
            .iter()
            .map(|id| self.calculate_tco(store, *id, None))
            .collect::<Result<_, _>>()?;

        let avg = reports.iter().map(|r| r.annualized_tco).sum::<f64>() / reports.len() as f64;

        let best = reports
            .iter()
            .min_by(|a, b| a.annualized_tco.total_cmp(&b.annualized_tco))
            .expect("at least two reports");
        let worst = reports
            .iter()
            .max_by(|a, b| a.annualized_tco.total_cmp(&b.annualized_tco))
            .expect("at least two reports");

        Ok(TcoComparison {
            best_performer: best.asset_tag.clone(),
            worst_performer: worst.asset_tag.clone(),
            fleet_avg_annualized_tco: round2(avg),
            reports,
        })
    }
}
