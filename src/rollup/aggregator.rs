//! Canonicalises raw work orders and amortised contract fees into the
//! per-asset-per-month fact table
//!
//! Rollups are sparse: a month appears only when it has work order activity
//! or an active contract allocation. Each pass fully replaces an asset's
//! rollups (delete-then-insert), so re-running is idempotent.

use crate::dates::{add_months, first_of_month, round2};
use crate::error::AnalyticsError;
use crate::registry::{EquipmentId, EquipmentRegistry, MonthlyRollup};
use crate::store::{EquipmentFilter, EquipmentStore};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
struct MonthAccum {
    pm_cost: f64,
    corrective_cost: f64,
    parts_cost: f64,
    downtime_hours: f64,
    work_order_count: u32,
}

/// Compute monthly rollups for one asset, or for the whole registry when no
/// id is given. Returns the number of rollup rows written.
pub fn compute_monthly_rollups(
    store: &mut dyn EquipmentStore,
    equipment_id: Option<EquipmentId>,
) -> Result<usize, AnalyticsError> {
    let targets: Vec<EquipmentRegistry> = match equipment_id {
        Some(id) => {
            let eq = store
                .equipment(id)?
                .ok_or_else(|| AnalyticsError::NotFound(format!("id {}", id)))?;
            vec![eq]
        }
        None => store.list_equipment(&EquipmentFilter::all())?,
    };

    let mut written = 0;
    for eq in &targets {
        written += rollup_asset(store, eq.id)?;
    }

    log::info!(
        "aggregated {} rollup rows across {} assets",
        written,
        targets.len()
    );
    Ok(written)
}

fn rollup_asset(store: &mut dyn EquipmentStore, id: EquipmentId) -> Result<usize, AnalyticsError> {
    // Group work orders by first-of-month of opened_date
    let mut activity: BTreeMap<NaiveDate, MonthAccum> = BTreeMap::new();
    for wo in store.work_orders(id)? {
        let month = first_of_month(wo.opened_date);
        let accum = activity.entry(month).or_default();

        let cost = wo.total_cost.unwrap_or(0.0);
        if wo.wo_type.is_corrective() {
            accum.corrective_cost += cost;
        } else {
            accum.pm_cost += cost;
        }
        accum.parts_cost += wo.parts_cost.unwrap_or(0.0);
        accum.downtime_hours += wo.downtime_hours.unwrap_or(0.0);
        accum.work_order_count += 1;
    }

    // Amortise each contract's annual cost over its active months
    let mut contract_monthly: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for contract in store.contracts(id)? {
        let (annual, start, end) = match (contract.annual_cost, contract.start_date, contract.end_date) {
            (Some(annual), Some(start), Some(end)) => (annual, start, end),
            _ => continue,
        };
        let monthly_alloc = annual / 12.0;
        let mut current = first_of_month(start);
        while current <= end {
            *contract_monthly.entry(current).or_insert(0.0) += monthly_alloc;
            current = add_months(current, 1);
        }
    }

    // Replace the asset's rollups over the union of active months
    store.delete_rollups(id)?;

    let mut months: Vec<NaiveDate> = activity
        .keys()
        .chain(contract_monthly.keys())
        .copied()
        .collect();
    months.sort();
    months.dedup();

    for month in &months {
        let accum = activity.get(month).cloned().unwrap_or_default();
        let contract_alloc = contract_monthly.get(month).copied().unwrap_or(0.0);
        let total = accum.pm_cost + accum.corrective_cost + contract_alloc;

        store.insert_rollup(MonthlyRollup {
            id: 0,
            equipment_id: id,
            month: *month,
            pm_cost: round2(accum.pm_cost),
            corrective_cost: round2(accum.corrective_cost),
            parts_cost: round2(accum.parts_cost),
            contract_cost_allocated: round2(contract_alloc),
            downtime_hours: round2(accum.downtime_hours),
            work_order_count: accum.work_order_count,
            total_cost: round2(total),
        })?;
    }

    log::debug!("asset {}: {} rollup months", id, months.len());
    Ok(months.len())
}

/// Monthly cost history for an asset, ordered by month ascending
pub fn cost_history(
    store: &dyn EquipmentStore,
    equipment_id: EquipmentId,
) -> Result<Vec<MonthlyRollup>, AnalyticsError> {
    Ok(store.rollups(equipment_id)?)
}

/// Trailing annual cost of one equipment class
#[derive(Debug, Clone, Serialize)]
pub struct ClassCost {
    pub equipment_class: String,
    pub annual_cost: f64,
}

/// Fleet-level cost summary, optionally scoped to one facility
#[derive(Debug, Clone, Serialize)]
pub struct FleetCostSummary {
    pub facility_id: Option<String>,
    pub total_equipment: usize,
    /// Rollup cost over the trailing 12 months
    pub total_annual_cost: f64,
    pub avg_cost_per_asset: f64,
    /// Top 5 classes by trailing annual cost, descending
    pub top_cost_classes: Vec<ClassCost>,
    /// Assets older than their expected useful life
    pub aging_assets_count: usize,
}

/// Summarise trailing-year fleet costs as of a given date
pub fn fleet_cost_summary(
    store: &dyn EquipmentStore,
    facility_id: Option<&str>,
    as_of: NaiveDate,
) -> Result<FleetCostSummary, AnalyticsError> {
    let filter = EquipmentFilter::all().with_facility(facility_id);
    let equipment = store.list_equipment(&filter)?;

    if equipment.is_empty() {
        return Ok(FleetCostSummary {
            facility_id: facility_id.map(str::to_string),
            total_equipment: 0,
            total_annual_cost: 0.0,
            avg_cost_per_asset: 0.0,
            top_cost_classes: Vec::new(),
            aging_assets_count: 0,
        });
    }

    let cutoff = NaiveDate::from_ymd_opt(as_of.year() - 1, as_of.month(), 1)
        .expect("month of an existing date is valid");

    let mut total_annual = 0.0;
    let mut class_costs: BTreeMap<String, f64> = BTreeMap::new();
    let mut aging = 0;

    for eq in &equipment {
        let trailing: f64 = store
            .rollups(eq.id)?
            .iter()
            .filter(|r| r.month >= cutoff)
            .map(|r| r.total_cost)
            .sum();
        total_annual += trailing;
        *class_costs.entry(eq.equipment_class.clone()).or_insert(0.0) += trailing;

        if eq.past_useful_life(as_of) {
            aging += 1;
        }
    }

    let mut top_classes: Vec<ClassCost> = class_costs
        .into_iter()
        .map(|(equipment_class, annual_cost)| ClassCost {
            equipment_class,
            annual_cost: round2(annual_cost),
        })
        .collect();
    top_classes.sort_by(|a, b| b.annual_cost.total_cmp(&a.annual_cost));
    top_classes.truncate(5);

    Ok(FleetCostSummary {
        facility_id: facility_id.map(str::to_string),
        total_equipment: equipment.len(),
        total_annual_cost: round2(total_annual),
        avg_cost_per_asset: round2(total_annual / equipment.len() as f64),
        top_cost_classes: top_classes,
        aging_assets_count: aging,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{
        ContractType, EquipmentStatus, ServiceContract, TechnicianType, WorkOrder,
        WorkOrderPriority, WorkOrderType,
    };
    use crate::store::MemoryStore;
    use approx::assert_abs_diff_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn insert_equipment(store: &mut MemoryStore, tag: &str) -> EquipmentId {
        store
            .insert_equipment(EquipmentRegistry {
                id: 0,
                asset_tag: tag.to_string(),
                serial_number: None,
                equipment_class: "ct_scanner".to_string(),
                manufacturer: None,
                model_name: None,
                facility_id: "FAC-001".to_string(),
                department: None,
                acquisition_date: d(2018, 1, 15),
                acquisition_cost: 900_000.0,
                installation_date: None,
                warranty_expiration: None,
                useful_life_months: Some(120),
                status: EquipmentStatus::Active,
                disposition_date: None,
                disposition_method: None,
            })
            .unwrap()
    }

    fn insert_wo(
        store: &mut MemoryStore,
        id: EquipmentId,
        number: &str,
        wo_type: WorkOrderType,
        opened: NaiveDate,
        total: f64,
        parts: f64,
        downtime: f64,
    ) {
        store
            .insert_work_order(WorkOrder {
                id: 0,
                equipment_id: id,
                wo_number: number.to_string(),
                wo_type,
                priority: WorkOrderPriority::Routine,
                opened_date: opened,
                completed_date: Some(opened),
                description: None,
                root_cause: None,
                labor_hours: None,
                labor_cost: Some(total - parts),
                parts_cost: Some(parts),
                vendor_service_cost: Some(0.0),
                total_cost: Some(total),
                downtime_hours: Some(downtime),
                technician_type: TechnicianType::InHouse,
            })
            .unwrap();
    }

    fn insert_contract(store: &mut MemoryStore, id: EquipmentId, annual: f64, start: NaiveDate, end: NaiveDate) {
        store
            .insert_contract(ServiceContract {
                id: 0,
                equipment_id: id,
                contract_type: ContractType::FullService,
                provider: Some("TRIMEDX".to_string()),
                annual_cost: Some(annual),
                start_date: Some(start),
                end_date: Some(end),
                includes_parts: true,
                includes_labor: true,
                includes_pm: true,
                response_time_hours: Some(4),
                uptime_guarantee_pct: Some(98.0),
            })
            .unwrap();
    }

    #[test]
    fn test_groups_work_orders_by_month_and_type() {
        let mut store = MemoryStore::new();
        let id = insert_equipment(&mut store, "EQ-1");
        insert_wo(&mut store, id, "WO-1", WorkOrderType::CorrectiveRepair, d(2024, 3, 5), 5_000.0, 2_000.0, 24.0);
        insert_wo(&mut store, id, "WO-2", WorkOrderType::CorrectiveRepair, d(2024, 3, 20), 1_000.0, 400.0, 6.0);
        insert_wo(&mut store, id, "WO-3", WorkOrderType::PreventiveMaintenance, d(2024, 3, 12), 800.0, 100.0, 2.0);
        insert_wo(&mut store, id, "WO-4", WorkOrderType::Calibration, d(2024, 5, 2), 300.0, 0.0, 1.0);

        let count = compute_monthly_rollups(&mut store, Some(id)).unwrap();
        assert_eq!(count, 2);

        let rollups = store.rollups(id).unwrap();
        let march = &rollups[0];
        assert_eq!(march.month, d(2024, 3, 1));
        assert_abs_diff_eq!(march.corrective_cost, 6_000.0);
        assert_abs_diff_eq!(march.pm_cost, 800.0);
        assert_abs_diff_eq!(march.parts_cost, 2_500.0);
        assert_abs_diff_eq!(march.downtime_hours, 32.0);
        assert_eq!(march.work_order_count, 3);
        assert_abs_diff_eq!(march.total_cost, 6_800.0);

        let may = &rollups[1];
        assert_eq!(may.month, d(2024, 5, 1));
        assert_abs_diff_eq!(may.pm_cost, 300.0);
        assert_abs_diff_eq!(may.corrective_cost, 0.0);
    }

    #[test]
    fn test_contract_amortised_by_calendar_month() {
        let mut store = MemoryStore::new();
        let id = insert_equipment(&mut store, "EQ-1");
        // 12k/year contract active Feb 15 through May 10: Feb, Mar, Apr, May
        insert_contract(&mut store, id, 12_000.0, d(2024, 2, 15), d(2024, 5, 10));

        let count = compute_monthly_rollups(&mut store, Some(id)).unwrap();
        assert_eq!(count, 4);

        let rollups = store.rollups(id).unwrap();
        assert_eq!(rollups[0].month, d(2024, 2, 1));
        assert_eq!(rollups[3].month, d(2024, 5, 1));
        for r in &rollups {
            assert_abs_diff_eq!(r.contract_cost_allocated, 1_000.0);
            assert_abs_diff_eq!(r.total_cost, 1_000.0);
            assert_eq!(r.work_order_count, 0);
        }
    }

    #[test]
    fn test_overlapping_contracts_sum() {
        let mut store = MemoryStore::new();
        let id = insert_equipment(&mut store, "EQ-1");
        insert_contract(&mut store, id, 12_000.0, d(2024, 1, 1), d(2024, 12, 31));
        insert_contract(&mut store, id, 6_000.0, d(2024, 6, 1), d(2024, 8, 31));

        compute_monthly_rollups(&mut store, Some(id)).unwrap();
        let rollups = store.rollups(id).unwrap();
        assert_eq!(rollups.len(), 12);

        let june = rollups.iter().find(|r| r.month == d(2024, 6, 1)).unwrap();
        assert_abs_diff_eq!(june.contract_cost_allocated, 1_500.0);
        let jan = rollups.iter().find(|r| r.month == d(2024, 1, 1)).unwrap();
        assert_abs_diff_eq!(jan.contract_cost_allocated, 1_000.0);
    }

    #[test]
    fn test_total_cost_identity() {
        let mut store = MemoryStore::new();
        let id = insert_equipment(&mut store, "EQ-1");
        insert_wo(&mut store, id, "WO-1", WorkOrderType::CorrectiveRepair, d(2024, 3, 5), 5_000.0, 2_000.0, 24.0);
        insert_wo(&mut store, id, "WO-2", WorkOrderType::SafetyInspection, d(2024, 3, 9), 450.0, 0.0, 1.0);
        insert_contract(&mut store, id, 24_000.0, d(2024, 1, 1), d(2024, 12, 31));

        compute_monthly_rollups(&mut store, Some(id)).unwrap();
        for r in store.rollups(id).unwrap() {
            assert_abs_diff_eq!(
                r.total_cost,
                r.pm_cost + r.corrective_cost + r.contract_cost_allocated,
                epsilon = 0.011
            );
        }
    }

    #[test]
    fn test_idempotent_rerun() {
        let mut store = MemoryStore::new();
        let id = insert_equipment(&mut store, "EQ-1");
        insert_wo(&mut store, id, "WO-1", WorkOrderType::CorrectiveRepair, d(2024, 3, 5), 5_000.0, 2_000.0, 24.0);
        insert_contract(&mut store, id, 12_000.0, d(2024, 1, 1), d(2024, 6, 30));

        let first = compute_monthly_rollups(&mut store, Some(id)).unwrap();
        let snapshot: Vec<_> = store
            .rollups(id)
            .unwrap()
            .iter()
            .map(|r| (r.month, r.total_cost, r.work_order_count))
            .collect();

        let second = compute_monthly_rollups(&mut store, Some(id)).unwrap();
        let resnapshot: Vec<_> = store
            .rollups(id)
            .unwrap()
            .iter()
            .map(|r| (r.month, r.total_cost, r.work_order_count))
            .collect();

        assert_eq!(first, second);
        assert_eq!(snapshot, resnapshot);
    }

    #[test]
    fn test_unknown_equipment_id() {
        let mut store = MemoryStore::new();
        let err = compute_monthly_rollups(&mut store, Some(99)).unwrap_err();
        assert!(matches!(err, AnalyticsError::NotFound(_)));
    }

    #[test]
    fn test_fleet_summary() {
        let mut store = MemoryStore::new();
        let a = insert_equipment(&mut store, "EQ-1");
        let b = insert_equipment(&mut store, "EQ-2");
        insert_wo(&mut store, a, "WO-1", WorkOrderType::CorrectiveRepair, d(2025, 11, 5), 4_000.0, 1_000.0, 8.0);
        insert_wo(&mut store, b, "WO-2", WorkOrderType::CorrectiveRepair, d(2019, 2, 5), 9_000.0, 1_000.0, 8.0);
        compute_monthly_rollups(&mut store, None).unwrap();

        let summary = fleet_cost_summary(&store, None, d(2026, 2, 26)).unwrap();
        assert_eq!(summary.total_equipment, 2);
        // Only the 2025-11 rollup falls in the trailing year
        assert_abs_diff_eq!(summary.total_annual_cost, 4_000.0);
        assert_abs_diff_eq!(summary.avg_cost_per_asset, 2_000.0);
        assert_eq!(summary.top_cost_classes.len(), 1);
        // Acquired 2018-01, useful life 120 months: not yet past at 2026-02
        assert_eq!(summary.aging_assets_count, 0);

        let empty = fleet_cost_summary(&store, Some("FAC-404"), d(2026, 2, 26)).unwrap();
        assert_eq!(empty.total_equipment, 0);
    }
}
