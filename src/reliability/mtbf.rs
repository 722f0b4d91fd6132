//! Mean-time-between-failure prediction from corrective repair history

use crate::dates::{round2, round4};
use crate::error::AnalyticsError;
use crate::registry::EquipmentId;
use crate::store::EquipmentStore;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use statrs::function::erf::erf;

/// Escalation applied to the recent average repair cost
const REPAIR_COST_ESCALATION: f64 = 1.05;

/// Recent repairs averaged for the cost estimate
const RECENT_REPAIRS: usize = 5;

/// Standard deviation assumed when only a single interval exists,
/// as a fraction of the MTBF
const SINGLE_GAP_SIGMA_FRACTION: f64 = 0.3;

/// Next-failure prediction for one asset
#[derive(Debug, Clone, Serialize)]
pub struct FailurePrediction {
    pub equipment_id: EquipmentId,
    pub mtbf_days: f64,
    pub predicted_next_failure: NaiveDate,
    pub probability_within_90_days: f64,
    pub estimated_repair_cost: f64,
}

/// Standard normal CDF via the error function
fn norm_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// MTBF-based failure predictor
#[derive(Debug, Clone)]
pub struct MtbfPredictor {
    as_of: NaiveDate,
}

impl MtbfPredictor {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    /// Predict the next corrective failure from the time-between-failure
    /// distribution of past repairs.
    ///
    /// Needs at least 2 corrective repairs and at least one positive gap
    /// between them.
    pub fn predict_next_failure(
        &self,
        store: &dyn EquipmentStore,
        equipment_id: EquipmentId,
    ) -> Result<FailurePrediction, AnalyticsError> {
        let repairs = store.corrective_work_orders(equipment_id)?;
        if repairs.len() < 2 {
            return Err(AnalyticsError::InsufficientRepairHistory(repairs.len()));
        }

        let dates: Vec<NaiveDate> = repairs.iter().map(|wo| wo.opened_date).collect();
        let costs: Vec<f64> = repairs
            .iter()
            .map(|wo| wo.total_cost.unwrap_or(0.0))
            .collect();

        // Positive gaps only; same-day duplicates carry no interval signal
        let tbf: Vec<f64> = dates
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_days() as f64)
            .filter(|gap| *gap > 0.0)
            .collect();
        if tbf.is_empty() {
            return Err(AnalyticsError::NoValidIntervals);
        }

        let mtbf = tbf.iter().sum::<f64>() / tbf.len() as f64;
        let sigma = if tbf.len() > 1 {
            (tbf.iter().map(|gap| (gap - mtbf).powi(2)).sum::<f64>() / tbf.len() as f64).sqrt()
        } else {
            mtbf * SINGLE_GAP_SIGMA_FRACTION
        };

        let last_repair = *dates.last().expect("at least two repairs");
        let predicted_next_failure = last_repair + Duration::days(mtbf as i64);

        let days_since_last = (self.as_of - last_repair).num_days() as f64;
        let probability = if sigma > 0.0 {
            norm_cdf((days_since_last + 90.0 - mtbf) / sigma)
        } else if days_since_last + 90.0 >= mtbf {
            1.0
        } else {
            0.0
        };

        let recent = &costs[costs.len().saturating_sub(RECENT_REPAIRS)..];
        let estimated_cost =
            recent.iter().sum::<f64>() / recent.len() as f64 * REPAIR_COST_ESCALATION;

        Ok(FailurePrediction {
            equipment_id,
            mtbf_days: (mtbf * 10.0).round() / 10.0,
            predicted_next_failure,
            probability_within_90_days: round4(probability.clamp(0.0, 1.0)),
            estimated_repair_cost: round2(estimated_cost),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{
        EquipmentRegistry, EquipmentStatus, TechnicianType, WorkOrder, WorkOrderPriority,
        WorkOrderType,
    };
    use crate::store::MemoryStore;
    use approx::assert_abs_diff_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn insert_asset(store: &mut MemoryStore) -> EquipmentId {
        store
            .insert_equipment(EquipmentRegistry {
                id: 0,
                asset_tag: "EQ-1".to_string(),
                serial_number: None,
                equipment_class: "ventilator".to_string(),
                manufacturer: None,
                model_name: None,
                facility_id: "FAC-001".to_string(),
                department: None,
                acquisition_date: d(2019, 1, 1),
                acquisition_cost: 40_000.0,
                installation_date: None,
                warranty_expiration: None,
                useful_life_months: Some(96),
                status: EquipmentStatus::Active,
                disposition_date: None,
                disposition_method: None,
            })
            .unwrap()
    }

    fn insert_repair(store: &mut MemoryStore, id: EquipmentId, number: u32, opened: NaiveDate, cost: f64) {
        store
            .insert_work_order(WorkOrder {
                id: 0,
                equipment_id: id,
                wo_number: format!("WO-{:07}", number),
                wo_type: WorkOrderType::CorrectiveRepair,
                priority: WorkOrderPriority::Urgent,
                opened_date: opened,
                completed_date: Some(opened),
                description: None,
                root_cause: None,
                labor_hours: None,
                labor_cost: Some(cost),
                parts_cost: Some(0.0),
                vendor_service_cost: Some(0.0),
                total_cost: Some(cost),
                downtime_hours: Some(4.0),
                technician_type: TechnicianType::InHouse,
            })
            .unwrap();
    }

    #[test]
    fn test_too_few_repairs() {
        let mut store = MemoryStore::new();
        let id = insert_asset(&mut store);
        insert_repair(&mut store, id, 1, d(2025, 1, 1), 500.0);

        let predictor = MtbfPredictor::new(d(2026, 2, 26));
        let err = predictor.predict_next_failure(&store, id).unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientRepairHistory(1)));
    }

    #[test]
    fn test_same_day_repairs_have_no_intervals() {
        let mut store = MemoryStore::new();
        let id = insert_asset(&mut store);
        insert_repair(&mut store, id, 1, d(2025, 3, 10), 500.0);
        insert_repair(&mut store, id, 2, d(2025, 3, 10), 700.0);

        let predictor = MtbfPredictor::new(d(2026, 2, 26));
        let err = predictor.predict_next_failure(&store, id).unwrap_err();
        assert!(matches!(err, AnalyticsError::NoValidIntervals));
    }

    #[test]
    fn test_regular_interval_prediction() {
        let mut store = MemoryStore::new();
        let id = insert_asset(&mut store);
        // Repairs every 90 days through 2025
        for (i, day) in [d(2025, 1, 1), d(2025, 4, 1), d(2025, 6, 30), d(2025, 9, 28)]
            .iter()
            .enumerate()
        {
            insert_repair(&mut store, id, i as u32 + 1, *day, 800.0 + 100.0 * i as f64);
        }

        let predictor = MtbfPredictor::new(d(2025, 10, 15));
        let prediction = predictor.predict_next_failure(&store, id).unwrap();

        assert_abs_diff_eq!(prediction.mtbf_days, 90.0, epsilon = 0.5);
        assert_eq!(prediction.predicted_next_failure, d(2025, 9, 28) + Duration::days(90));

        // 17 days since last + 90 > mtbf: failure within the window is likely
        assert!(prediction.probability_within_90_days > 0.5);
        assert!(prediction.probability_within_90_days <= 1.0);

        // Mean of all four costs (fewer than 5 repairs) escalated 5%
        assert_abs_diff_eq!(prediction.estimated_repair_cost, 950.0 * 1.05, epsilon = 0.01);
    }

    #[test]
    fn test_cost_uses_last_five_repairs() {
        let mut store = MemoryStore::new();
        let id = insert_asset(&mut store);
        let mut day = d(2023, 1, 1);
        for i in 0..8 {
            insert_repair(&mut store, id, i + 1, day, 100.0 * (i + 1) as f64);
            day += Duration::days(60);
        }

        let predictor = MtbfPredictor::new(d(2024, 2, 26));
        let prediction = predictor.predict_next_failure(&store, id).unwrap();

        // Last five costs: 400..800, mean 600, escalated
        assert_abs_diff_eq!(prediction.estimated_repair_cost, 600.0 * 1.05, epsilon = 0.01);
    }

    #[test]
    fn test_probability_clamped() {
        let mut store = MemoryStore::new();
        let id = insert_asset(&mut store);
        insert_repair(&mut store, id, 1, d(2020, 1, 1), 500.0);
        insert_repair(&mut store, id, 2, d(2020, 3, 1), 500.0);

        // Years overdue: probability saturates at 1
        let predictor = MtbfPredictor::new(d(2026, 2, 26));
        let prediction = predictor.predict_next_failure(&store, id).unwrap();
        assert_abs_diff_eq!(prediction.probability_within_90_days, 1.0);
    }
}
